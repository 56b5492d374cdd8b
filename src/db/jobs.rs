use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::{
    errors::AppError,
    status::{AttachmentKind, JobStatus, NoteKind},
    structs::{Job, JobAttachment, JobNote},
    AppState,
};

const SELECT_JOB: &str = "SELECT j.*, c.name AS client_name FROM jobs j \
     LEFT JOIN clients c ON c.id = j.client_id";

#[derive(Debug, Clone, Default)]
pub struct JobInput {
    pub client_id: Option<i64>,
    pub quote_id: Option<i64>,
    pub title: String,
    pub address: Option<String>,
    pub status: JobStatus,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttachmentInput {
    pub kind: AttachmentKind,
    pub file_name: String,
    pub file_url: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// Insert a job on an existing connection so it can join a caller's transaction.
pub(crate) async fn insert_job(
    conn: &mut SqliteConnection,
    user_id: i64,
    input: &JobInput,
) -> Result<Job, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO jobs (user_id, client_id, quote_id, title, address, status, start_date, due_date, notes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(user_id)
    .bind(input.client_id)
    .bind(input.quote_id)
    .bind(&input.title)
    .bind(&input.address)
    .bind(input.status.as_str())
    .bind(input.start_date)
    .bind(input.due_date)
    .bind(&input.notes)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    let sql = format!("{} WHERE j.id = $1", SELECT_JOB);
    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(job)
}

pub async fn get_jobs(state: &AppState, user_id: i64) -> Result<Vec<Job>, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!(
        "{} WHERE j.user_id = $1 ORDER BY j.created_at DESC, j.id DESC",
        SELECT_JOB
    );
    let jobs = sqlx::query_as::<_, Job>(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;
    Ok(jobs)
}

pub async fn get_jobs_for_client(
    state: &AppState,
    user_id: i64,
    client_id: i64,
) -> Result<Vec<Job>, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!(
        "{} WHERE j.user_id = $1 AND j.client_id = $2 ORDER BY j.created_at DESC, j.id DESC",
        SELECT_JOB
    );
    let jobs = sqlx::query_as::<_, Job>(&sql)
        .bind(user_id)
        .bind(client_id)
        .fetch_all(&pool)
        .await?;
    Ok(jobs)
}

pub async fn get_job(state: &AppState, user_id: i64, id: i64) -> Result<Job, AppError> {
    let pool = state.db_pool.clone();
    let sql = format!("{} WHERE j.id = $1 AND j.user_id = $2", SELECT_JOB);
    sqlx::query_as::<_, Job>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Job"))
}

pub async fn create_job(state: &AppState, user_id: i64, input: &JobInput) -> Result<Job, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    let job = insert_job(&mut conn, user_id, input).await?;
    log::info!("Job {} created for user {}", job.id, user_id);
    Ok(job)
}

pub async fn update_job(
    state: &AppState,
    user_id: i64,
    id: i64,
    input: &JobInput,
) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query(
        "UPDATE jobs SET client_id = $1, title = $2, address = $3, status = $4, start_date = $5, \
         due_date = $6, notes = $7 WHERE id = $8 AND user_id = $9",
    )
    .bind(input.client_id)
    .bind(&input.title)
    .bind(&input.address)
    .bind(input.status.as_str())
    .bind(input.start_date)
    .bind(input.due_date)
    .bind(&input.notes)
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job"));
    }
    log::info!("Job {} updated", id);
    Ok(())
}

/// The inline "job details" card: address and dates only.
pub async fn update_job_details(
    state: &AppState,
    user_id: i64,
    id: i64,
    address: Option<String>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query(
        "UPDATE jobs SET address = $1, start_date = $2, due_date = $3 WHERE id = $4 AND user_id = $5",
    )
    .bind(address)
    .bind(start_date)
    .bind(due_date)
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job"));
    }
    Ok(())
}

pub async fn update_job_status(
    state: &AppState,
    user_id: i64,
    id: i64,
    status: JobStatus,
) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("UPDATE jobs SET status = $1 WHERE id = $2 AND user_id = $3")
        .bind(status.as_str())
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job"));
    }
    log::info!("Job {} marked {}", id, status);
    Ok(())
}

pub async fn delete_job(state: &AppState, user_id: i64, id: i64) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job"));
    }
    log::info!("Job with id {} deleted", id);
    Ok(())
}

// Notes

pub async fn get_job_notes(
    state: &AppState,
    user_id: i64,
    job_id: i64,
) -> Result<Vec<JobNote>, AppError> {
    let pool = state.db_pool.clone();
    let notes = sqlx::query_as::<_, JobNote>(
        "SELECT * FROM job_notes WHERE job_id = $1 AND user_id = $2 ORDER BY created_at DESC, id DESC",
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(notes)
}

/// Blank content is ignored and yields `None`.
pub async fn add_job_note(
    state: &AppState,
    user_id: i64,
    job_id: i64,
    content: &str,
    kind: NoteKind,
) -> Result<Option<JobNote>, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    let job = get_job(state, user_id, job_id).await?;

    let pool = state.db_pool.clone();
    let note = sqlx::query_as::<_, JobNote>(
        "INSERT INTO job_notes (job_id, user_id, content, kind, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(job.id)
    .bind(user_id)
    .bind(content)
    .bind(kind.as_str())
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    Ok(Some(note))
}

/// Blank content leaves the note unchanged.
pub async fn update_job_note(
    state: &AppState,
    user_id: i64,
    job_id: i64,
    note_id: i64,
    content: &str,
) -> Result<(), AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(());
    }
    let pool = state.db_pool.clone();
    let result = sqlx::query(
        "UPDATE job_notes SET content = $1 WHERE id = $2 AND job_id = $3 AND user_id = $4",
    )
    .bind(content)
    .bind(note_id)
    .bind(job_id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Note"));
    }
    Ok(())
}

// Attachments

pub async fn get_job_attachments(
    state: &AppState,
    user_id: i64,
    job_id: i64,
) -> Result<Vec<JobAttachment>, AppError> {
    let pool = state.db_pool.clone();
    let attachments = sqlx::query_as::<_, JobAttachment>(
        "SELECT * FROM job_attachments WHERE job_id = $1 AND user_id = $2 ORDER BY created_at DESC, id DESC",
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(attachments)
}

pub async fn add_job_attachment(
    state: &AppState,
    user_id: i64,
    job_id: i64,
    input: &AttachmentInput,
) -> Result<JobAttachment, AppError> {
    let job = get_job(state, user_id, job_id).await?;

    let pool = state.db_pool.clone();
    let attachment = sqlx::query_as::<_, JobAttachment>(
        "INSERT INTO job_attachments (job_id, user_id, kind, file_name, file_url, mime_type, size_bytes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(job.id)
    .bind(user_id)
    .bind(input.kind.as_str())
    .bind(&input.file_name)
    .bind(&input.file_url)
    .bind(&input.mime_type)
    .bind(input.size_bytes)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await?;
    log::info!("Attachment {} added to job {}", attachment.id, job.id);
    Ok(attachment)
}
