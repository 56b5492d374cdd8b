use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;

use super::{is_checked, page, parse_id, parse_required_status, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, QuoteInput},
    errors::AppError,
    metrics::ListFilter,
    pricing::{format_line_items, parse_line_items, LineItem},
    status::QuoteStatus,
    utils::non_blank,
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(quotes_handler)
        .service(new_quote_handler)
        .service(new_quote_form_handler)
        .service(quote_handler)
        .service(edit_quote_handler)
        .service(edit_quote_form_handler)
        .service(quote_status_handler)
        .service(quote_invoice_handler)
        .service(quote_scan_handler)
        .service(delete_quote_handler);
}

#[derive(Deserialize)]
pub struct NewQuoteQuery {
    client: Option<String>,
}

#[derive(Deserialize)]
pub struct QuoteForm {
    client_id: Option<String>,
    title: Option<String>,
    status: Option<String>,
    items: Option<String>,
    apply_gst: Option<String>,
    notes: Option<String>,
    barcodes: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusForm {
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct ScanForm {
    barcode: Option<String>,
}

/// Resolve the chosen client, making sure it belongs to the user.
async fn owned_client_id(
    state: &AppState,
    user_id: i64,
    value: &Option<String>,
) -> Result<i64, AppError> {
    let id = parse_id(value).ok_or_else(|| AppError::validation("Please select a client."))?;
    Ok(db::get_client(state, user_id, id).await?.id)
}

fn parse_items(text: &Option<String>) -> Result<Vec<LineItem>, AppError> {
    parse_line_items(text.as_deref().unwrap_or_default()).map_err(AppError::Validation)
}

/// Barcodes may be separated by whitespace or commas.
fn split_barcodes(text: &Option<String>) -> Vec<&str> {
    text.as_deref()
        .unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|code| !code.is_empty())
        .collect()
}

#[get("/quotes")]
pub async fn quotes_handler(
    filter: web::Query<ListFilter>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let quotes = db::get_quotes(&state, user.id).await?;
    let quotes = filter.apply_to_quotes(quotes, chrono::Utc::now());

    let mut context = page("Quotes");
    context.insert("label", filter.quote_label());
    context.insert("quotes", &quotes);
    render("quotes.html", &context)
}

#[get("/quotes/new")]
pub async fn new_quote_handler(
    query: web::Query<NewQuoteQuery>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let clients = db::get_clients_by_name(&state, user.id).await?;

    let mut context = page("New quote");
    context.insert("clients", &clients);
    context.insert("selected_client", &parse_id(&query.client));
    render("quote_new.html", &context)
}

#[post("/quotes/new")]
pub async fn new_quote_form_handler(
    web::Form(form): web::Form<QuoteForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client_id = owned_client_id(&state, user.id, &form.client_id).await?;
    let mut items = parse_items(&form.items)?;
    for code in split_barcodes(&form.barcodes) {
        items.push(db::lookup_barcode(&state, user.id, code).await?);
    }

    let input = QuoteInput {
        client_id,
        title: non_blank(&form.title),
        status: QuoteStatus::Draft,
        items,
        apply_gst: is_checked(&form.apply_gst),
        notes: non_blank(&form.notes),
    };
    let id = db::create_quote(&state, user.id, &input).await?;
    Ok(redirect(&format!("/quotes/{}", id)))
}

#[get("/quotes/{id}")]
pub async fn quote_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let quote = db::get_quote(&state, user.id, path.into_inner()).await?;
    let client = match quote.client_id {
        Some(client_id) => Some(db::get_client(&state, user.id, client_id).await?),
        None => None,
    };

    let mut context = page(quote.title.as_deref().unwrap_or("Quote"));
    context.insert("status", &quote.status());
    context.insert("totals", &quote.totals());
    context.insert("quote", &quote);
    context.insert("client", &client);
    context.insert("statuses", QuoteStatus::ALL);
    render("quote.html", &context)
}

#[get("/quotes/{id}/edit")]
pub async fn edit_quote_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let quote = db::get_quote(&state, user.id, path.into_inner()).await?;
    let clients = db::get_clients_by_name(&state, user.id).await?;

    let mut context = page("Edit quote");
    context.insert("items_text", &format_line_items(&quote.items));
    context.insert("status", &quote.status());
    context.insert("quote", &quote);
    context.insert("clients", &clients);
    context.insert("statuses", QuoteStatus::ALL);
    render("quote_edit.html", &context)
}

#[post("/quotes/{id}/edit")]
pub async fn edit_quote_form_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<QuoteForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = QuoteInput {
        client_id: owned_client_id(&state, user.id, &form.client_id).await?,
        title: non_blank(&form.title),
        status: parse_required_status(&form.status)?,
        items: parse_items(&form.items)?,
        apply_gst: true,
        notes: non_blank(&form.notes),
    };
    db::update_quote(&state, user.id, id, &input).await?;
    Ok(redirect(&format!("/quotes/{}", id)))
}

#[post("/quotes/{id}/status")]
pub async fn quote_status_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<StatusForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status: QuoteStatus = parse_required_status(&form.status)?;
    db::update_quote_status(&state, user.id, id, status).await?;
    Ok(redirect(&format!("/quotes/{}", id)))
}

#[post("/quotes/{id}/invoice")]
pub async fn quote_invoice_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let quote = db::get_quote(&state, user.id, path.into_inner()).await?;
    let invoice_id = db::create_invoice_from_quote(&state, &quote).await?;
    Ok(redirect(&format!("/invoices/{}", invoice_id)))
}

#[post("/quotes/{id}/scan")]
pub async fn quote_scan_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<ScanForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let barcode =
        non_blank(&form.barcode).ok_or_else(|| AppError::validation("Scan or enter a barcode."))?;
    let item = db::lookup_barcode(&state, user.id, &barcode).await?;
    db::append_quote_item(&state, user.id, id, item).await?;
    Ok(redirect(&format!("/quotes/{}", id)))
}

#[post("/quotes/{id}/delete")]
pub async fn delete_quote_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    db::delete_quote(&state, user.id, path.into_inner()).await?;
    Ok(redirect("/quotes"))
}
