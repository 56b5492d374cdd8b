use crate::{errors::AppError, structs::User, utils, AppState};

pub async fn get_user_by_id(state: &AppState, id: i64) -> Result<User, AppError> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

pub async fn create_user(state: &AppState, email: String, password: String) -> Result<User, AppError> {
    let now = chrono::Utc::now();
    let pwd_hash = utils::hash_password(&password)?;
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, pwd_hash, created_at, updated_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(email.to_lowercase())
    .bind(pwd_hash)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await?;
    log::info!("User created: {}", user.id);
    Ok(user)
}

pub async fn update_password(state: &AppState, id: i64, password: &str) -> Result<(), AppError> {
    let pwd_hash = utils::hash_password(password)?;
    let pool = state.db_pool.clone();
    sqlx::query("UPDATE users SET pwd_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(pwd_hash)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&pool)
        .await?;
    log::info!("Password changed for user {}", id);
    Ok(())
}
