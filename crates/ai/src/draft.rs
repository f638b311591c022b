use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One drafted invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub amount: f64,
}

/// A structured invoice draft produced from free-form prompt text.
///
/// This is input material for invoice creation, not an invoice: it still goes
/// through the normal validation boundary before anything is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub client_name: String,
    pub client_email: String,
    pub client_address: Option<String>,
    pub items: Vec<DraftItem>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub due_date: DateTime<Utc>,
}

impl InvoiceDraft {
    /// Deterministic placeholder draft used whenever generation fails.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            client_name: "Gemini Generated Client".to_string(),
            client_email: "client@example.com".to_string(),
            client_address: None,
            items: vec![DraftItem {
                description: "Service as described in prompt".to_string(),
                quantity: 1,
                unit_price: 100.0,
                amount: 100.0,
            }],
            notes: None,
            terms: None,
            due_date: now + Duration::days(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    /// No generation backend is configured.
    #[error("drafter not configured")]
    NotConfigured,

    /// The upstream model call failed.
    #[error("generation request failed: {0}")]
    Upstream(String),

    /// The model answered, but not with a usable structured invoice.
    #[error("malformed generation response: {0}")]
    Malformed(String),
}
