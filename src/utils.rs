use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, NaiveDate, Utc};
use tera::{Tera, Value};

use crate::{errors::AppError, pricing::to_cents};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::PasswordError(e.to_string())
        })
}

pub fn verify_password(provided: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| AppError::PasswordError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok())
}

/// Password rules applied at registration and password change.
pub fn check_password_strength(password: &str) -> Result<(), &'static str> {
    if password.len() < 12 {
        return Err("Password must be at least 12 characters long");
    }
    if password.len() > 128 {
        return Err("Password must be at most 128 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_digit())
        || !password.chars().any(|c| c.is_alphabetic())
        || !password
            .chars()
            .any(|c| "!@#$%^&*()_+-=[]{}|;':\",.<>?/".contains(c))
    {
        return Err(
            "Password must contain at least one number, one letter and one special character",
        );
    }
    Ok(())
}

/// Australian-dollar formatting, e.g. `$1,234.50` or `-$5.00`.
pub fn format_currency(value: f64) -> String {
    let cents = to_cents(value.abs()).unsigned_abs();
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// `05 Mar 2025` style dates. Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn format_date(value: &str) -> Option<String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.format("%d %b %Y").to_string());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%d %b %Y").to_string())
}

fn currency_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let amount = value.as_f64().unwrap_or(0.0);
    Ok(Value::String(format_currency(amount)))
}

fn au_date_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let formatted = value
        .as_str()
        .and_then(format_date)
        .unwrap_or_else(|| "-".to_owned());
    Ok(Value::String(formatted))
}

pub fn register_filters(tera: &mut Tera) {
    tera.register_filter("currency", currency_filter);
    tera.register_filter("au_date", au_date_filter);
}

/// Trimmed form input, with blank mapped to `None`.
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse 1!").unwrap();
        assert!(verify_password("correct horse 1!", &hash).unwrap());
        assert!(!verify_password("wrong horse 1!", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "plain-text").is_err());
    }

    #[test]
    fn password_strength_rules() {
        assert!(check_password_strength("short1!").is_err());
        assert!(check_password_strength("longenoughbutplain").is_err());
        assert!(check_password_strength("longenough123!").is_ok());
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(27.5), "$27.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-5.0), "-$5.00");
        assert_eq!(format_currency(0.145), "$0.15");
    }

    #[test]
    fn dates_in_australian_order() {
        assert_eq!(format_date("2025-03-05").as_deref(), Some("05 Mar 2025"));
        assert_eq!(
            format_date("2025-12-01T09:30:00Z").as_deref(),
            Some("01 Dec 2025")
        );
        assert_eq!(format_date("not a date"), None);
    }

    #[test]
    fn blank_form_values_become_none() {
        assert_eq!(non_blank(&Some("  ".into())), None);
        assert_eq!(non_blank(&Some(" 0412 ".into())).as_deref(), Some("0412"));
        assert_eq!(non_blank(&None), None);
    }
}
