use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sqlx::Error as SqlxError;
use std::env::VarError;
use tera::Context;
use thiserror::Error;

use crate::TEMPLATES;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not logged in")]
    Unauthorized,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// The string shown to the user. Internal failures never leak their cause.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized | AppError::NotFound(_) | AppError::Validation(_) => {
                self.to_string()
            }
            _ => "Something went wrong. Please try again.".to_owned(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::SEE_OTHER,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_)
            | AppError::MigrateError(_)
            | AppError::TemplateError(_)
            | AppError::PasswordError(_)
            | AppError::IdentityError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_)
            | AppError::JsonError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Unauthorized = self {
            return HttpResponse::SeeOther()
                .append_header(("Location", "/login"))
                .finish();
        }

        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }

        let mut context = Context::new();
        context.insert("title", "Error");
        context.insert("message", &self.user_message());

        match TEMPLATES.render("error.html", &context) {
            Ok(body) => HttpResponse::build(status)
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                log::error!("Failed to render error page: {}", e);
                HttpResponse::build(status).body(self.user_message())
            }
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
