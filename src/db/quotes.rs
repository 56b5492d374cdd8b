use sqlx::types::Json;

use crate::{
    db::{insert_job, JobInput},
    errors::AppError,
    pricing::{LineItem, Totals},
    status::{JobStatus, QuoteStatus},
    structs::{Job, Quote},
    AppState,
};

const SELECT_QUOTE: &str = "SELECT q.*, c.name AS client_name FROM quotes q \
     LEFT JOIN clients c ON c.id = q.client_id";

#[derive(Debug, Clone)]
pub struct QuoteInput {
    pub client_id: i64,
    pub title: Option<String>,
    pub status: QuoteStatus,
    pub items: Vec<LineItem>,
    pub apply_gst: bool,
    pub notes: Option<String>,
}

pub async fn get_quotes(state: &AppState, user_id: i64) -> Result<Vec<Quote>, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!(
        "{} WHERE q.user_id = $1 ORDER BY q.created_at DESC, q.id DESC",
        SELECT_QUOTE
    );
    let quotes = sqlx::query_as::<_, Quote>(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;
    Ok(quotes)
}

pub async fn get_quotes_for_client(
    state: &AppState,
    user_id: i64,
    client_id: i64,
) -> Result<Vec<Quote>, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!(
        "{} WHERE q.user_id = $1 AND q.client_id = $2 ORDER BY q.created_at DESC, q.id DESC",
        SELECT_QUOTE
    );
    let quotes = sqlx::query_as::<_, Quote>(&sql)
        .bind(user_id)
        .bind(client_id)
        .fetch_all(&pool)
        .await?;
    Ok(quotes)
}

pub async fn get_quote(state: &AppState, user_id: i64, id: i64) -> Result<Quote, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!("{} WHERE q.id = $1 AND q.user_id = $2", SELECT_QUOTE);
    sqlx::query_as::<_, Quote>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quote"))
}

pub async fn create_quote(
    state: &AppState,
    user_id: i64,
    input: &QuoteInput,
) -> Result<i64, AppError> {
    let totals = Totals::from_items(&input.items, input.apply_gst);
    let now = chrono::Utc::now();
    let pool = state.db_pool.clone();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO quotes (user_id, client_id, title, status, items, subtotal, gst, total, notes, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) RETURNING id",
    )
    .bind(user_id)
    .bind(input.client_id)
    .bind(&input.title)
    .bind(input.status.as_str())
    .bind(Json(&input.items))
    .bind(totals.subtotal)
    .bind(totals.gst)
    .bind(totals.total)
    .bind(&input.notes)
    .bind(now)
    .fetch_one(&pool)
    .await?;
    log::info!("Quote {} created for user {}", id, user_id);
    Ok(id)
}

pub async fn update_quote(
    state: &AppState,
    user_id: i64,
    id: i64,
    input: &QuoteInput,
) -> Result<(), AppError> {
    let totals = Totals::from_items(&input.items, input.apply_gst);
    let pool = state.db_pool.clone();
    let result = sqlx::query(
        "UPDATE quotes SET client_id = $1, title = $2, status = $3, items = $4, subtotal = $5, \
         gst = $6, total = $7, notes = $8, updated_at = $9 WHERE id = $10 AND user_id = $11",
    )
    .bind(input.client_id)
    .bind(&input.title)
    .bind(input.status.as_str())
    .bind(Json(&input.items))
    .bind(totals.subtotal)
    .bind(totals.gst)
    .bind(totals.total)
    .bind(&input.notes)
    .bind(chrono::Utc::now())
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quote"));
    }
    log::info!("Quote {} updated", id);
    Ok(())
}

/// Set a quote's status. Accepting a quote makes sure a job exists for it;
/// the job created by this call, if any, is returned.
pub async fn update_quote_status(
    state: &AppState,
    user_id: i64,
    id: i64,
    status: QuoteStatus,
) -> Result<Option<Job>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let sql = format!("{} WHERE q.id = $1 AND q.user_id = $2", SELECT_QUOTE);
    let quote = sqlx::query_as::<_, Quote>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Quote"))?;

    sqlx::query("UPDATE quotes SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(chrono::Utc::now())
        .bind(quote.id)
        .execute(&mut *tx)
        .await?;

    let mut created = None;
    if status == QuoteStatus::Accepted {
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM jobs WHERE quote_id = $1 LIMIT 1")
            .bind(quote.id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_none() {
            let job = insert_job(
                &mut tx,
                user_id,
                &JobInput {
                    client_id: quote.client_id,
                    quote_id: Some(quote.id),
                    title: quote.job_title(),
                    status: JobStatus::Pending,
                    ..Default::default()
                },
            )
            .await?;
            log::info!("Job {} created from accepted quote {}", job.id, quote.id);
            created = Some(job);
        }
    }

    tx.commit().await?;
    log::info!("Quote {} marked {}", id, status);
    Ok(created)
}

/// Append a line item (e.g. from a barcode scan) and recompute the totals.
pub async fn append_quote_item(
    state: &AppState,
    user_id: i64,
    id: i64,
    item: LineItem,
) -> Result<(), AppError> {
    let quote = get_quote(state, user_id, id).await?;
    let apply_gst = quote.gst != 0.0 || quote.subtotal == 0.0;

    let mut items = quote.items.0;
    items.push(item);
    let totals = Totals::from_items(&items, apply_gst);

    let pool = state.db_pool.clone();
    sqlx::query(
        "UPDATE quotes SET items = $1, subtotal = $2, gst = $3, total = $4, updated_at = $5 \
         WHERE id = $6 AND user_id = $7",
    )
    .bind(Json(&items))
    .bind(totals.subtotal)
    .bind(totals.gst)
    .bind(totals.total)
    .bind(chrono::Utc::now())
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    Ok(())
}

pub async fn delete_quote(state: &AppState, user_id: i64, id: i64) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM quotes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quote"));
    }
    log::info!("Quote with id {} deleted", id);
    Ok(())
}
