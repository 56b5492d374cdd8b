use crate::{errors::AppError, structs::Client, AppState};

/// Editable client fields, already trimmed.
#[derive(Debug, Clone, Default)]
pub struct ClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub async fn get_clients(state: &AppState, user_id: i64) -> Result<Vec<Client>, AppError> {
    let pool = state.db_pool.clone();
    let clients = sqlx::query_as::<_, Client>(
        "SELECT * FROM clients WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(clients)
}

/// Clients in name order, for pickers.
pub async fn get_clients_by_name(state: &AppState, user_id: i64) -> Result<Vec<Client>, AppError> {
    let pool = state.db_pool.clone();
    let clients = sqlx::query_as::<_, Client>(
        "SELECT * FROM clients WHERE user_id = $1 ORDER BY name COLLATE NOCASE ASC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(clients)
}

pub async fn get_client(state: &AppState, user_id: i64, id: i64) -> Result<Client, AppError> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Client"))
}

pub async fn create_client(
    state: &AppState,
    user_id: i64,
    input: &ClientInput,
) -> Result<Client, AppError> {
    let pool = state.db_pool.clone();
    let client = sqlx::query_as::<_, Client>(
        "INSERT INTO clients (user_id, name, email, phone, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    log::info!("Client {} created for user {}", client.id, user_id);
    Ok(client)
}

pub async fn update_client(
    state: &AppState,
    user_id: i64,
    id: i64,
    input: &ClientInput,
) -> Result<Client, AppError> {
    let pool = state.db_pool.clone();
    let client = sqlx::query_as::<_, Client>(
        "UPDATE clients SET name = $1, email = $2, phone = $3 WHERE id = $4 AND user_id = $5 RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Client"))?;
    log::info!("Client {} updated", client.id);
    Ok(client)
}
