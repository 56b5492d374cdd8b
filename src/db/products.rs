use crate::{
    errors::AppError,
    pricing::LineItem,
    structs::{CatalogProduct, UserProduct},
    AppState,
};

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub barcode: String,
    pub name: String,
    pub unit: Option<String>,
    pub rate: f64,
}

pub async fn get_user_products(state: &AppState, user_id: i64) -> Result<Vec<UserProduct>, AppError> {
    let pool = state.db_pool.clone();
    let products = sqlx::query_as::<_, UserProduct>(
        "SELECT up.id, up.catalog_id, pc.barcode, pc.name, pc.unit, pc.default_rate, up.custom_rate \
         FROM user_products up JOIN product_catalog pc ON pc.id = up.catalog_id \
         WHERE up.user_id = $1 AND up.active = 1 ORDER BY up.id ASC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(products)
}

/// Save a product to the shared catalogue (keyed by barcode) and link it to
/// the user with their own rate.
pub async fn save_product(
    state: &AppState,
    user_id: i64,
    input: &ProductInput,
) -> Result<CatalogProduct, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let catalog = sqlx::query_as::<_, CatalogProduct>(
        "INSERT INTO product_catalog (barcode, name, unit, default_rate, created_by_user_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (barcode) DO UPDATE SET name = excluded.name, unit = excluded.unit, \
         default_rate = excluded.default_rate \
         RETURNING *",
    )
    .bind(&input.barcode)
    .bind(&input.name)
    .bind(&input.unit)
    .bind(input.rate)
    .bind(user_id)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO user_products (user_id, catalog_id, custom_rate, active) VALUES ($1, $2, $3, 1) \
         ON CONFLICT (user_id, catalog_id) DO UPDATE SET custom_rate = excluded.custom_rate, active = 1",
    )
    .bind(user_id)
    .bind(catalog.id)
    .bind(input.rate)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("Product {} saved for user {}", catalog.barcode, user_id);
    Ok(catalog)
}

/// Resolve a scanned barcode into a one-unit line item, preferring the
/// user's own rate over the catalogue default.
pub async fn lookup_barcode(
    state: &AppState,
    user_id: i64,
    barcode: &str,
) -> Result<LineItem, AppError> {
    let barcode = barcode.trim();
    let pool = state.db_pool.clone();

    let catalog = sqlx::query_as::<_, CatalogProduct>("SELECT * FROM product_catalog WHERE barcode = $1")
        .bind(barcode)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| {
            AppError::validation(format!(
                "No product found for barcode {}. Add it under Products, then scan again.",
                barcode
            ))
        })?;

    let custom_rate = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT custom_rate FROM user_products WHERE user_id = $1 AND catalog_id = $2",
    )
    .bind(user_id)
    .bind(catalog.id)
    .fetch_optional(&pool)
    .await?
    .flatten();

    Ok(LineItem::new(
        catalog.name,
        1.0,
        custom_rate.unwrap_or(catalog.default_rate),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    fn input(barcode: &str, rate: f64) -> ProductInput {
        ProductInput {
            barcode: barcode.into(),
            name: "H4 pine sleeper 200x75x2.4m".into(),
            unit: Some("per length".into()),
            rate,
        }
    }

    #[actix_web::test]
    async fn saving_twice_updates_instead_of_duplicating() {
        let state = testing::state().await;
        let user = testing::user(&state, "sam@example.com").await;

        save_product(&state, user.id, &input("9300001", 18.5)).await.unwrap();
        save_product(&state, user.id, &input("9300001", 19.0)).await.unwrap();

        let products = get_user_products(&state, user.id).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].rate(), 19.0);
    }

    #[actix_web::test]
    async fn lookup_prefers_the_users_rate() {
        let state = testing::state().await;
        let first = testing::user(&state, "sam@example.com").await;
        let second = testing::user(&state, "kim@example.com").await;

        save_product(&state, first.id, &input("9300001", 18.5)).await.unwrap();
        save_product(&state, second.id, &input("9300001", 21.0)).await.unwrap();

        let mine = lookup_barcode(&state, first.id, "9300001").await.unwrap();
        assert_eq!(mine.rate, 18.5);
        assert_eq!(mine.qty, 1.0);

        let third = testing::user(&state, "lee@example.com").await;
        let theirs = lookup_barcode(&state, third.id, " 9300001 ").await.unwrap();
        assert_eq!(theirs.rate, 21.0);
    }

    #[actix_web::test]
    async fn unknown_barcode_explains_what_to_do() {
        let state = testing::state().await;
        let user = testing::user(&state, "sam@example.com").await;

        let err = lookup_barcode(&state, user.id, "0000").await.unwrap_err();
        assert!(err.user_message().contains("No product found for barcode 0000"));
    }
}
