use chrono::NaiveDate;
use sqlx::types::Json;

use crate::{
    errors::AppError,
    pricing::{round_cents, LineItem, Totals},
    status::{InvoiceStatus, QuoteStatus},
    structs::{Invoice, Quote},
    AppState,
};

const SELECT_INVOICE: &str = "SELECT i.*, c.name AS client_name FROM invoices i \
     LEFT JOIN clients c ON c.id = i.client_id";

#[derive(Debug, Clone)]
pub struct InvoiceInput {
    pub client_id: i64,
    pub title: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

pub async fn get_invoices(state: &AppState, user_id: i64) -> Result<Vec<Invoice>, AppError> {
    let pool = state.db_pool.clone();
    // Rows without an issue date sort last.
    let sql = format!(
        "{} WHERE i.user_id = $1 \
         ORDER BY i.issue_date IS NULL, i.issue_date DESC, i.created_at DESC, i.id DESC",
        SELECT_INVOICE
    );
    let invoices = sqlx::query_as::<_, Invoice>(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;
    Ok(invoices)
}

pub async fn get_invoice(state: &AppState, user_id: i64, id: i64) -> Result<Invoice, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!("{} WHERE i.id = $1 AND i.user_id = $2", SELECT_INVOICE);
    sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Invoice"))
}

pub async fn create_invoice(
    state: &AppState,
    user_id: i64,
    input: &InvoiceInput,
) -> Result<i64, AppError> {
    let totals = Totals::from_items(&input.items, true);
    let pool = state.db_pool.clone();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO invoices (user_id, client_id, title, status, issue_date, due_date, items, subtotal, gst, total, notes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
    )
    .bind(user_id)
    .bind(input.client_id)
    .bind(&input.title)
    .bind(input.status.as_str())
    .bind(input.issue_date)
    .bind(input.due_date)
    .bind(Json(&input.items))
    .bind(totals.subtotal)
    .bind(totals.gst)
    .bind(totals.total)
    .bind(&input.notes)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    log::info!("Invoice {} created for user {}", id, user_id);
    Ok(id)
}

/// Bill a quote: the invoice copies its client, items and totals and starts out sent.
pub async fn create_invoice_from_quote(state: &AppState, quote: &Quote) -> Result<i64, AppError> {
    let client_id = quote
        .client_id
        .ok_or_else(|| AppError::validation("This quote is missing a client."))?;

    let pool = state.db_pool.clone();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO invoices (user_id, client_id, quote_id, title, status, issue_date, items, subtotal, gst, total, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
    )
    .bind(quote.user_id)
    .bind(client_id)
    .bind(quote.id)
    .bind(&quote.title)
    .bind(InvoiceStatus::Sent.as_str())
    .bind(chrono::Local::now().date_naive())
    .bind(Json(&quote.items.0))
    .bind(quote.subtotal)
    .bind(quote.gst)
    .bind(quote.total)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    log::info!("Invoice {} created from quote {}", id, quote.id);
    Ok(id)
}

/// Set an invoice's status. Paying an invoice also marks its source quote paid.
pub async fn update_invoice_status(
    state: &AppState,
    user_id: i64,
    id: i64,
    status: InvoiceStatus,
) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    let quote_id = sqlx::query_scalar::<_, Option<i64>>(
        "UPDATE invoices SET status = $1 WHERE id = $2 AND user_id = $3 RETURNING quote_id",
    )
    .bind(status.as_str())
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Invoice"))?;

    if status == InvoiceStatus::Paid {
        if let Some(quote_id) = quote_id {
            sqlx::query("UPDATE quotes SET status = $1, updated_at = $2 WHERE id = $3 AND user_id = $4")
                .bind(QuoteStatus::Paid.as_str())
                .bind(chrono::Utc::now())
                .bind(quote_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    log::info!("Invoice {} marked {}", id, status);
    Ok(())
}

/// Add a payment to the invoice; it becomes paid once nothing is owing.
pub async fn record_payment(
    state: &AppState,
    user_id: i64,
    id: i64,
    amount: f64,
) -> Result<Invoice, AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::validation("Payment amount must be greater than zero."));
    }

    let invoice = get_invoice(state, user_id, id).await?;
    let amount_paid = round_cents(invoice.amount_paid + amount);

    let pool = state.db_pool.clone();
    sqlx::query("UPDATE invoices SET amount_paid = $1 WHERE id = $2 AND user_id = $3")
        .bind(amount_paid)
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;
    log::info!("Payment of {:.2} recorded on invoice {}", amount, id);

    if amount_paid >= invoice.total && invoice.status() != InvoiceStatus::Paid {
        update_invoice_status(state, user_id, id, InvoiceStatus::Paid).await?;
    }

    get_invoice(state, user_id, id).await
}

pub async fn delete_invoice(state: &AppState, user_id: i64, id: i64) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Invoice"));
    }
    log::info!("Invoice with id {} deleted", id);
    Ok(())
}
