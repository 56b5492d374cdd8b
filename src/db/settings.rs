use crate::{
    errors::AppError,
    structs::{CompanyProfile, Subscription},
    AppState,
};

pub const DEFAULT_PLAN: &str = "Starter";

#[derive(Debug, Clone, Default)]
pub struct CompanyProfileInput {
    pub business_name: Option<String>,
    pub logo_url: Option<String>,
    pub abn: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Fetch the user's company profile, creating an empty one on first visit.
pub async fn get_or_create_company_profile(
    state: &AppState,
    user_id: i64,
) -> Result<CompanyProfile, AppError> {
    let pool = state.db_pool.clone();
    sqlx::query("INSERT INTO company_profiles (user_id, updated_at) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await?;

    let profile = sqlx::query_as::<_, CompanyProfile>("SELECT * FROM company_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;
    Ok(profile)
}

pub async fn update_company_profile(
    state: &AppState,
    user_id: i64,
    input: &CompanyProfileInput,
) -> Result<CompanyProfile, AppError> {
    let pool = state.db_pool.clone();
    let profile = sqlx::query_as::<_, CompanyProfile>(
        "INSERT INTO company_profiles (user_id, business_name, logo_url, abn, address, email, phone, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (user_id) DO UPDATE SET business_name = excluded.business_name, \
         logo_url = excluded.logo_url, abn = excluded.abn, address = excluded.address, \
         email = excluded.email, phone = excluded.phone, updated_at = excluded.updated_at \
         RETURNING *",
    )
    .bind(user_id)
    .bind(&input.business_name)
    .bind(&input.logo_url)
    .bind(&input.abn)
    .bind(&input.address)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    log::info!("Company profile updated for user {}", user_id);
    Ok(profile)
}

pub async fn get_active_subscription(
    state: &AppState,
    user_id: i64,
) -> Result<Option<Subscription>, AppError> {
    let pool = state.db_pool.clone();
    let subscription = sqlx::query_as::<_, Subscription>(
        "SELECT * FROM subscriptions WHERE user_id = $1 AND lower(status) = 'active' \
         ORDER BY started_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;
    Ok(subscription)
}

/// Display name of the user's plan; users without an active subscription
/// are on the free tier.
pub async fn get_current_plan(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let tier = get_active_subscription(state, user_id)
        .await?
        .and_then(|s| s.plan_tier)
        .filter(|t| !t.trim().is_empty());

    Ok(match tier {
        Some(tier) => capitalize(tier.trim()),
        None => DEFAULT_PLAN.to_owned(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
