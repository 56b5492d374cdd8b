//! Line items and the arithmetic behind quote and invoice totals.

use serde::{Deserialize, Serialize};

/// Goods and Services Tax, applied as a flat surcharge on the subtotal.
pub const GST_RATE: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "quantity")]
    pub qty: f64,
    #[serde(default, alias = "unit_price")]
    pub rate: f64,
    #[serde(default)]
    pub line_total: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, qty: f64, rate: f64) -> Self {
        LineItem {
            description: description.into(),
            qty,
            rate,
            line_total: round_cents(qty * rate),
        }
    }

    /// Stored rows may lack `line_total`; derive it from qty and rate.
    pub fn effective_total(&self) -> f64 {
        if self.line_total != 0.0 {
            self.line_total
        } else {
            round_cents(self.qty * self.rate)
        }
    }

    fn is_blank(&self) -> bool {
        self.description.trim().is_empty() && self.qty * self.rate == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
}

impl Totals {
    pub fn from_items(items: &[LineItem], apply_gst: bool) -> Self {
        let subtotal = round_cents(items.iter().map(LineItem::effective_total).sum());
        let gst = if apply_gst {
            round_cents(subtotal * GST_RATE)
        } else {
            0.0
        };
        Totals {
            subtotal,
            gst,
            total: round_cents(subtotal + gst),
        }
    }
}

/// Round to whole cents, halves away from zero.
pub fn round_cents(value: f64) -> f64 {
    to_cents(value) as f64 / 100.0
}

/// Whole cents in `value`. Binary noise below a millionth of a cent is
/// snapped off first so that 0.145 rounds to 15 cents rather than 14.
pub fn to_cents(value: f64) -> i64 {
    let cents = (value * 100.0 * 1e6).round() / 1e6;
    cents.round() as i64
}

/// Parse the line-item text area: one item per line, `description | qty | rate`.
///
/// Missing qty defaults to 1 and missing rate to 0. Blank lines and items with
/// neither a description nor an amount are skipped.
pub fn parse_line_items(text: &str) -> Result<Vec<LineItem>, String> {
    let mut items = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split('|').map(str::trim);
        let description = parts.next().unwrap_or_default();
        let qty = parse_amount(parts.next(), 1.0)
            .map_err(|_| format!("Line {}: quantity must be a number", index + 1))?;
        let rate = parse_amount(parts.next(), 0.0)
            .map_err(|_| format!("Line {}: rate must be a number", index + 1))?;
        if parts.next().is_some() {
            return Err(format!(
                "Line {}: expected `description | qty | rate`",
                index + 1
            ));
        }

        let item = LineItem::new(description, qty, rate);
        if !item.is_blank() {
            items.push(item);
        }
    }

    Ok(items)
}

/// Render items back into the text-area format accepted by `parse_line_items`.
pub fn format_line_items(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} | {} | {}", item.description, item.qty, item.rate))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_amount(field: Option<&str>, default: f64) -> Result<f64, std::num::ParseFloatError> {
    match field {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            let value = cleaned.parse::<f64>()?;
            Ok(if value.is_finite() { value } else { default })
        }
    }
}
