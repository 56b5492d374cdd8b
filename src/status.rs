//! Status vocabularies for quotes, jobs and invoices, plus the note and
//! attachment kinds.
//!
//! Values are stored lower-case. Parsing ignores case and surrounding
//! whitespace; rows holding a value outside the vocabulary read back as the
//! vocabulary's initial status.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

macro_rules! vocabulary {
    ($name:ident, $initial:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Interpret a stored value, falling back to the initial status.
            pub fn from_stored(value: &str) -> Self {
                value.parse().unwrap_or($name::$initial)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$initial
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_lowercase();
                match lowered.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), s.trim())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary!(QuoteStatus, Draft, {
    Draft => "draft",
    Sent => "sent",
    Accepted => "accepted",
    Declined => "declined",
    Paid => "paid",
});

vocabulary!(JobStatus, Pending, {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

vocabulary!(InvoiceStatus, Draft, {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

vocabulary!(NoteKind, Note, {
    Note => "note",
    Progress => "progress",
});

vocabulary!(AttachmentKind, Document, {
    Photo => "photo",
    Document => "document",
});

impl QuoteStatus {
    /// Quotes the client still owes money on.
    pub fn is_owing(&self) -> bool {
        matches!(self, QuoteStatus::Sent | QuoteStatus::Accepted)
    }
}

impl InvoiceStatus {
    pub fn is_owing(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_case_and_whitespace() {
        assert_eq!(" Accepted ".parse::<QuoteStatus>(), Ok(QuoteStatus::Accepted));
        assert_eq!("PAID".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
        assert_eq!("Active".parse::<JobStatus>(), Ok(JobStatus::Active));
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!("archived".parse::<JobStatus>().is_err());
        assert!("".parse::<QuoteStatus>().is_err());
    }

    #[test]
    fn stored_values_fall_back_to_initial_status() {
        assert_eq!(QuoteStatus::from_stored(""), QuoteStatus::Draft);
        assert_eq!(JobStatus::from_stored("weird"), JobStatus::Pending);
        assert_eq!(InvoiceStatus::from_stored("Overdue"), InvoiceStatus::Overdue);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(QuoteStatus::Declined.to_string(), "declined");
        assert_eq!(AttachmentKind::Photo.as_str(), "photo");
        assert_eq!(NoteKind::default(), NoteKind::Note);
    }

    #[test]
    fn owing_statuses() {
        assert!(QuoteStatus::Sent.is_owing());
        assert!(QuoteStatus::Accepted.is_owing());
        assert!(!QuoteStatus::Paid.is_owing());
        assert!(InvoiceStatus::Overdue.is_owing());
        assert!(!InvoiceStatus::Draft.is_owing());
    }
}
