//! Dashboard figures and list filters, computed from rows already fetched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::round_cents;
use crate::status::{InvoiceStatus, JobStatus, QuoteStatus};
use crate::structs::{Invoice, Job, Quote};

/// Accepted quotes older than this count as overdue.
pub const QUOTE_OVERDUE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DashboardMetrics {
    pub money_received: f64,
    pub money_owing: f64,
    pub money_overdue: f64,
    pub jobs_total: usize,
    pub jobs_pending: usize,
    pub jobs_active: usize,
    pub jobs_completed: usize,
}

impl DashboardMetrics {
    pub fn compute(invoices: &[Invoice], jobs: &[Job]) -> Self {
        let mut m = DashboardMetrics::default();

        for inv in invoices {
            match inv.status() {
                InvoiceStatus::Paid => {
                    m.money_received += if inv.amount_paid > 0.0 {
                        inv.amount_paid
                    } else {
                        inv.total
                    };
                }
                InvoiceStatus::Sent => m.money_owing += inv.total - inv.amount_paid,
                InvoiceStatus::Overdue => {
                    let outstanding = inv.total - inv.amount_paid;
                    m.money_owing += outstanding;
                    m.money_overdue += outstanding;
                }
                InvoiceStatus::Draft | InvoiceStatus::Cancelled => {}
            }
        }
        m.money_received = round_cents(m.money_received);
        m.money_owing = round_cents(m.money_owing);
        m.money_overdue = round_cents(m.money_overdue);

        m.jobs_total = jobs.len();
        for job in jobs {
            match job.status() {
                JobStatus::Pending => m.jobs_pending += 1,
                JobStatus::Active => m.jobs_active += 1,
                JobStatus::Completed => m.jobs_completed += 1,
                JobStatus::Cancelled => {}
            }
        }

        m
    }
}

/// Query-string filters shared by the quote and invoice lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub status: Option<String>,
    pub owing: Option<String>,
    pub overdue: Option<String>,
}

impl ListFilter {
    fn wanted_statuses(&self) -> Vec<String> {
        self.status
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn flag(value: &Option<String>) -> bool {
        value.as_deref() == Some("true")
    }

    pub fn owing(&self) -> bool {
        Self::flag(&self.owing)
    }

    pub fn overdue(&self) -> bool {
        Self::flag(&self.overdue)
    }

    pub fn quote_label(&self) -> &'static str {
        match self.status.as_deref() {
            Some("accepted") => "Accepted quotes",
            Some("paid") => "Paid quotes",
            _ if self.owing() => "Money owing",
            _ if self.overdue() => "Overdue quotes",
            _ => "All quotes",
        }
    }

    pub fn invoice_label(&self) -> &'static str {
        match self.status.as_deref() {
            Some("paid") => "Paid invoices",
            Some("overdue") => "Overdue invoices",
            _ if self.owing() => "Money owing",
            _ => "All invoices",
        }
    }

    pub fn apply_to_quotes(&self, quotes: Vec<Quote>, now: DateTime<Utc>) -> Vec<Quote> {
        let wanted = self.wanted_statuses();
        let cutoff = now - Duration::days(QUOTE_OVERDUE_DAYS);

        quotes
            .into_iter()
            .filter(|q| wanted.is_empty() || wanted.contains(&q.status.to_lowercase()))
            .filter(|q| !self.owing() || q.status().is_owing())
            .filter(|q| {
                !self.overdue() || (q.status() == QuoteStatus::Accepted && q.created_at < cutoff)
            })
            .collect()
    }

    pub fn apply_to_invoices(&self, invoices: Vec<Invoice>) -> Vec<Invoice> {
        let wanted = self.wanted_statuses();

        invoices
            .into_iter()
            .filter(|inv| wanted.is_empty() || wanted.contains(&inv.status.to_lowercase()))
            .filter(|inv| !self.owing() || (inv.status().is_owing() && inv.balance() > 0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn invoice(status: &str, total: f64, amount_paid: f64) -> Invoice {
        Invoice {
            id: 1,
            user_id: 1,
            client_id: None,
            quote_id: None,
            title: None,
            status: status.into(),
            issue_date: None,
            due_date: None,
            items: Json(vec![]),
            subtotal: 0.0,
            gst: 0.0,
            total,
            amount_paid,
            notes: None,
            created_at: Utc::now(),
            client_name: None,
        }
    }

    fn job(status: &str) -> Job {
        Job {
            id: 1,
            user_id: 1,
            client_id: None,
            quote_id: None,
            title: None,
            address: None,
            status: status.into(),
            start_date: None,
            due_date: None,
            notes: None,
            created_at: Utc::now(),
            client_name: None,
        }
    }

    fn quote(status: &str, age_days: i64) -> Quote {
        let created = Utc::now() - Duration::days(age_days);
        Quote {
            id: 1,
            user_id: 1,
            client_id: None,
            title: None,
            status: status.into(),
            items: Json(vec![]),
            subtotal: 0.0,
            gst: 0.0,
            total: 0.0,
            notes: None,
            created_at: created,
            updated_at: created,
            client_name: None,
        }
    }

    #[test]
    fn money_figures() {
        let invoices = vec![
            invoice("paid", 110.0, 0.0),
            invoice("PAID", 200.0, 150.0),
            invoice("sent", 100.0, 40.0),
            invoice("overdue", 50.0, 0.0),
            invoice("draft", 999.0, 0.0),
        ];
        let m = DashboardMetrics::compute(&invoices, &[]);
        assert_eq!(m.money_received, 260.0);
        assert_eq!(m.money_owing, 110.0);
        assert_eq!(m.money_overdue, 50.0);
    }

    #[test]
    fn job_counts() {
        let jobs = vec![job("pending"), job("Active"), job("completed"), job("cancelled")];
        let m = DashboardMetrics::compute(&[], &jobs);
        assert_eq!(m.jobs_total, 4);
        assert_eq!(m.jobs_pending, 1);
        assert_eq!(m.jobs_active, 1);
        assert_eq!(m.jobs_completed, 1);
    }

    #[test]
    fn quote_status_list_filter() {
        let filter = ListFilter {
            status: Some("Accepted, paid".into()),
            ..Default::default()
        };
        let quotes = vec![quote("accepted", 1), quote("paid", 1), quote("draft", 1)];
        assert_eq!(filter.apply_to_quotes(quotes, Utc::now()).len(), 2);
    }

    #[test]
    fn quote_owing_filter() {
        let filter = ListFilter {
            owing: Some("true".into()),
            ..Default::default()
        };
        let quotes = vec![quote("sent", 1), quote("accepted", 1), quote("declined", 1)];
        assert_eq!(filter.apply_to_quotes(quotes, Utc::now()).len(), 2);
        assert_eq!(filter.quote_label(), "Money owing");
    }

    #[test]
    fn quote_overdue_filter_needs_thirty_days() {
        let filter = ListFilter {
            overdue: Some("true".into()),
            ..Default::default()
        };
        let quotes = vec![quote("accepted", 31), quote("accepted", 5), quote("sent", 60)];
        let kept = filter.apply_to_quotes(quotes, Utc::now());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].status, "accepted");
    }

    #[test]
    fn invoice_owing_skips_settled_rows() {
        let filter = ListFilter {
            owing: Some("true".into()),
            ..Default::default()
        };
        let invoices = vec![
            invoice("sent", 100.0, 100.0),
            invoice("sent", 100.0, 0.0),
            invoice("overdue", 10.0, 0.0),
            invoice("paid", 10.0, 0.0),
        ];
        assert_eq!(filter.apply_to_invoices(invoices).len(), 2);
    }

    #[test]
    fn labels_default_to_all() {
        let filter = ListFilter::default();
        assert_eq!(filter.quote_label(), "All quotes");
        assert_eq!(filter.invoice_label(), "All invoices");
    }
}
