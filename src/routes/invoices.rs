use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use chrono::{Duration, Local};
use serde::Deserialize;

use super::{page, parse_date, parse_id, parse_required_status, parse_status, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, InvoiceInput},
    errors::AppError,
    metrics::ListFilter,
    pricing::parse_line_items,
    status::InvoiceStatus,
    utils::non_blank,
    AppState,
};

/// Days between the default issue date and due date.
const PAYMENT_TERMS_DAYS: i64 = 7;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(invoices_handler)
        .service(new_invoice_handler)
        .service(new_invoice_form_handler)
        .service(invoice_handler)
        .service(invoice_status_handler)
        .service(invoice_payment_handler)
        .service(delete_invoice_handler);
}

#[derive(Deserialize)]
pub struct NewInvoiceQuery {
    client: Option<String>,
}

#[derive(Deserialize)]
pub struct InvoiceForm {
    client_id: Option<String>,
    title: Option<String>,
    issue_date: Option<String>,
    due_date: Option<String>,
    status: Option<String>,
    items: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusForm {
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentForm {
    amount: Option<String>,
}

fn parse_amount(value: &Option<String>) -> Result<f64, AppError> {
    let cleaned: String = non_blank(value)
        .unwrap_or_default()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::validation("Payment amount must be a number."))
}

#[get("/invoices")]
pub async fn invoices_handler(
    filter: web::Query<ListFilter>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let invoices = db::get_invoices(&state, user.id).await?;
    let invoices = filter.apply_to_invoices(invoices);

    let mut context = page("Invoices");
    context.insert("label", filter.invoice_label());
    context.insert("invoices", &invoices);
    render("invoices.html", &context)
}

#[get("/invoices/new")]
pub async fn new_invoice_handler(
    query: web::Query<NewInvoiceQuery>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let clients = db::get_clients_by_name(&state, user.id).await?;
    let today = Local::now().date_naive();

    let mut context = page("New invoice");
    context.insert("clients", &clients);
    context.insert("selected_client", &parse_id(&query.client));
    context.insert("issue_date", &today);
    context.insert("due_date", &(today + Duration::days(PAYMENT_TERMS_DAYS)));
    context.insert("statuses", InvoiceStatus::ALL);
    render("invoice_new.html", &context)
}

#[post("/invoices/new")]
pub async fn new_invoice_form_handler(
    web::Form(form): web::Form<InvoiceForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client_id =
        parse_id(&form.client_id).ok_or_else(|| AppError::validation("Please select a client."))?;
    let client = db::get_client(&state, user.id, client_id).await?;

    let today = Local::now().date_naive();
    let issue_date = parse_date(&form.issue_date)?.unwrap_or(today);
    let due_date =
        parse_date(&form.due_date)?.unwrap_or(issue_date + Duration::days(PAYMENT_TERMS_DAYS));
    let items = parse_line_items(form.items.as_deref().unwrap_or_default())
        .map_err(AppError::Validation)?;

    let input = InvoiceInput {
        client_id: client.id,
        title: non_blank(&form.title),
        issue_date: Some(issue_date),
        due_date: Some(due_date),
        status: parse_status(&form.status)?,
        items,
        notes: non_blank(&form.notes),
    };
    let id = db::create_invoice(&state, user.id, &input).await?;
    Ok(redirect(&format!("/invoices/{}", id)))
}

#[get("/invoices/{id}")]
pub async fn invoice_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let invoice = db::get_invoice(&state, user.id, path.into_inner()).await?;
    let client = match invoice.client_id {
        Some(client_id) => Some(db::get_client(&state, user.id, client_id).await?),
        None => None,
    };

    let mut context = page(invoice.title.as_deref().unwrap_or("Invoice"));
    context.insert("status", &invoice.status());
    context.insert("balance", &invoice.balance());
    context.insert("invoice", &invoice);
    context.insert("client", &client);
    context.insert("statuses", InvoiceStatus::ALL);
    render("invoice.html", &context)
}

#[post("/invoices/{id}/status")]
pub async fn invoice_status_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<StatusForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status: InvoiceStatus = parse_required_status(&form.status)?;
    db::update_invoice_status(&state, user.id, id, status).await?;
    Ok(redirect(&format!("/invoices/{}", id)))
}

#[post("/invoices/{id}/payment")]
pub async fn invoice_payment_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<PaymentForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::record_payment(&state, user.id, id, parse_amount(&form.amount)?).await?;
    Ok(redirect(&format!("/invoices/{}", id)))
}

#[post("/invoices/{id}/delete")]
pub async fn delete_invoice_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    db::delete_invoice(&state, user.id, path.into_inner()).await?;
    Ok(redirect("/invoices"))
}
