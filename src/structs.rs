use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

use crate::pricing::{LineItem, Totals};
use crate::status::{AttachmentKind, InvoiceStatus, JobStatus, NoteKind, QuoteStatus};

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Client {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Quote {
    pub id: i64,
    pub user_id: i64,
    pub client_id: Option<i64>,
    pub title: Option<String>,
    pub status: String,
    pub items: Json<Vec<LineItem>>,
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub client_name: Option<String>,
}

impl Quote {
    pub fn status(&self) -> QuoteStatus {
        QuoteStatus::from_stored(&self.status)
    }

    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            gst: self.gst,
            total: self.total,
        }
    }

    /// Title for a job created when this quote is accepted.
    pub fn job_title(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_owned();
        }
        match self.client_name.as_deref() {
            Some(name) => format!("Job for {}", name),
            None => format!("Job for quote #{}", self.id),
        }
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Job {
    pub id: i64,
    pub user_id: i64,
    pub client_id: Option<i64>,
    pub quote_id: Option<i64>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub client_name: Option<String>,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        JobStatus::from_stored(&self.status)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct JobNote {
    pub id: i64,
    pub job_id: i64,
    pub user_id: i64,
    pub content: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl JobNote {
    pub fn kind(&self) -> NoteKind {
        NoteKind::from_stored(&self.kind)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct JobAttachment {
    pub id: i64,
    pub job_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub file_name: String,
    pub file_url: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl JobAttachment {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_stored(&self.kind)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub user_id: i64,
    pub client_id: Option<i64>,
    pub quote_id: Option<i64>,
    pub title: Option<String>,
    pub status: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub items: Json<Vec<LineItem>>,
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub client_name: Option<String>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_stored(&self.status)
    }

    /// Amount still owed on this invoice.
    pub fn balance(&self) -> f64 {
        crate::pricing::round_cents(self.total - self.amount_paid)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct CatalogProduct {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    pub unit: Option<String>,
    pub default_rate: f64,
    pub created_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A user's link to a catalogue product, joined with the catalogue row.
#[derive(Serialize, Debug, Clone, FromRow)]
pub struct UserProduct {
    pub id: i64,
    pub catalog_id: i64,
    pub barcode: String,
    pub name: String,
    pub unit: Option<String>,
    pub default_rate: f64,
    pub custom_rate: Option<f64>,
}

impl UserProduct {
    pub fn rate(&self) -> f64 {
        self.custom_rate.unwrap_or(self.default_rate)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct CompanyProfile {
    pub id: i64,
    pub user_id: i64,
    pub business_name: Option<String>,
    pub logo_url: Option<String>,
    pub abn: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub email: Option<String>,
    pub status: String,
    pub plan_tier: Option<String>,
    pub plan_amount: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(title: Option<&str>, client_name: Option<&str>) -> Quote {
        Quote {
            id: 42,
            user_id: 1,
            client_id: None,
            title: title.map(str::to_owned),
            status: "Accepted".into(),
            items: Json(vec![]),
            subtotal: 0.0,
            gst: 0.0,
            total: 0.0,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            client_name: client_name.map(str::to_owned),
        }
    }

    #[test]
    fn job_title_prefers_quote_title() {
        assert_eq!(quote(Some("Deck"), Some("Ann")).job_title(), "Deck");
    }

    #[test]
    fn job_title_falls_back_to_client_then_id() {
        assert_eq!(quote(Some("  "), Some("Ann")).job_title(), "Job for Ann");
        assert_eq!(quote(None, None).job_title(), "Job for quote #42");
    }

    #[test]
    fn stored_status_is_case_insensitive() {
        assert_eq!(quote(None, None).status(), QuoteStatus::Accepted);
    }

    #[test]
    fn custom_rate_overrides_default() {
        let mut product = UserProduct {
            id: 1,
            catalog_id: 1,
            barcode: "930".into(),
            name: "Sleeper".into(),
            unit: None,
            default_rate: 18.5,
            custom_rate: None,
        };
        assert_eq!(product.rate(), 18.5);
        product.custom_rate = Some(16.0);
        assert_eq!(product.rate(), 16.0);
    }
}
