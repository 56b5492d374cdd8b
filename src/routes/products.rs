use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{page, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, ProductInput},
    errors::AppError,
    utils::non_blank,
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(products_handler)
        .service(add_product_handler)
        .service(lookup_product_handler);
}

#[derive(Deserialize)]
pub struct ProductForm {
    barcode: Option<String>,
    name: Option<String>,
    unit: Option<String>,
    rate: Option<String>,
}

impl ProductForm {
    fn into_input(self) -> Result<ProductInput, AppError> {
        let rate = non_blank(&self.rate)
            .and_then(|r| r.trim_start_matches('$').parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r != 0.0);

        match (non_blank(&self.barcode), non_blank(&self.name), rate) {
            (Some(barcode), Some(name), Some(rate)) => Ok(ProductInput {
                barcode,
                name,
                unit: non_blank(&self.unit),
                rate,
            }),
            _ => Err(AppError::validation("Barcode, name and rate are required.")),
        }
    }
}

#[get("/products")]
pub async fn products_handler(user: AuthUser, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let products: Vec<_> = db::get_user_products(&state, user.id)
        .await?
        .into_iter()
        .map(|p| {
            let rate = p.rate();
            json!({
                "barcode": p.barcode,
                "name": p.name,
                "unit": p.unit,
                "rate": rate,
            })
        })
        .collect();

    let mut context = page("Products");
    context.insert("products", &products);
    render("products.html", &context)
}

#[post("/products")]
pub async fn add_product_handler(
    web::Form(form): web::Form<ProductForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    db::save_product(&state, user.id, &form.into_input()?).await?;
    Ok(redirect("/products"))
}

/// Barcode lookup for the scanner on the quote pages.
#[get("/api/products/{barcode}")]
pub async fn lookup_product_handler(
    path: web::Path<String>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match db::lookup_barcode(&state, user.id, &path).await {
        Ok(item) => Ok(HttpResponse::Ok().json(json!({
            "barcode": path.trim(),
            "description": item.description,
            "rate": item.rate,
        }))),
        Err(AppError::Validation(message)) => {
            Ok(HttpResponse::NotFound().json(json!({ "error": message })))
        }
        Err(e) => Err(e),
    }
}
