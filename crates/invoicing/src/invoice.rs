use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chainvoice_core::{DomainError, DomainResult, FieldError, InvoiceId, ItemId, OwnerId};

/// Invoice status lifecycle.
///
/// The set is closed and serializes as lower-case strings on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Every status, in display order. Read-side breakdowns must emit one
    /// entry per status even when its count is zero.
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Capitalized display label ("Pending", "Paid", ...).
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(DomainError::field(
                "status",
                "status must be one of: draft, pending, paid, overdue, cancelled",
            )),
        }
    }
}

/// Invoice line item, owned exclusively by its invoice.
///
/// `amount` is submitted by the client and trusted as-is; validation checks
/// ranges, not `quantity * unit_price` consistency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: ItemId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub amount: f64,
}

/// Invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_address: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub status: InvoiceStatus,
    pub total_amount: f64,
    pub payment_address: Option<String>,
    pub payment_token_type: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub transaction_hash: Option<String>,
    pub owner_id: OwnerId,
}

impl Invoice {
    /// Generic status transition.
    ///
    /// Deliberately permissive: no transition is rejected based on the current
    /// state. Entering `Paid` through this path sets `paid_at` but never
    /// touches `transaction_hash` — that is what `mark_paid` is for.
    pub fn set_status(&mut self, status: InvoiceStatus, now: DateTime<Utc>) {
        if status == InvoiceStatus::Paid {
            self.paid_at = Some(now);
        }
        self.status = status;
    }

    /// Settle the invoice against a claimed transaction hash.
    pub fn mark_paid(&mut self, transaction_hash: impl Into<String>, now: DateTime<Utc>) {
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
        self.transaction_hash = Some(transaction_hash.into());
    }

    /// Whether the invoice is awaiting payment past its due date.
    ///
    /// Overdue detection is caller-driven; nothing flips the status on a
    /// schedule.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date < now
    }
}

/// Typed input for a new invoice line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub amount: f64,
}

/// Typed input for creating an invoice, validated exactly once via
/// [`NewInvoice::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_address: Option<String>,
    pub items: Vec<NewInvoiceItem>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub payment_address: Option<String>,
    #[serde(default)]
    pub payment_token_type: Option<String>,
    /// Explicitly create the invoice in draft instead of the default pending.
    #[serde(default)]
    pub draft: bool,
}

impl NewInvoice {
    /// Validate the input, producing proof-of-validation on success and the
    /// full list of field errors otherwise.
    pub fn validate(self) -> DomainResult<ValidInvoice> {
        let mut errors = Vec::new();

        if self.client_name.trim().is_empty() {
            errors.push(FieldError::new("client_name", "Client name is required"));
        }
        if !is_email(&self.client_email) {
            errors.push(FieldError::new("client_email", "Invalid email address"));
        }
        if self.items.is_empty() {
            errors.push(FieldError::new("items", "At least one item is required"));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("items[{i}].description"),
                    "Description is required",
                ));
            }
            if item.quantity < 1 {
                errors.push(FieldError::new(
                    format!("items[{i}].quantity"),
                    "Quantity must be at least 1",
                ));
            }
            if !(item.unit_price >= 0.0) {
                errors.push(FieldError::new(
                    format!("items[{i}].unit_price"),
                    "Unit price must be at least 0",
                ));
            }
            if !(item.amount >= 0.0) {
                errors.push(FieldError::new(
                    format!("items[{i}].amount"),
                    "Amount must be at least 0",
                ));
            }
        }

        if errors.is_empty() {
            Ok(ValidInvoice(self))
        } else {
            Err(DomainError::validation(errors))
        }
    }
}

/// A [`NewInvoice`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidInvoice(NewInvoice);

impl ValidInvoice {
    pub fn as_input(&self) -> &NewInvoice {
        &self.0
    }

    /// Derived invoice total: the sum of item amounts.
    pub fn total_amount(&self) -> f64 {
        self.0.items.iter().map(|i| i.amount).sum()
    }

    /// Materialize the invoice document, assigning identity, number,
    /// creation time, derived total, and the initial status.
    pub fn into_invoice(self, owner_id: OwnerId, now: DateTime<Utc>) -> Invoice {
        let total_amount = self.total_amount();
        let input = self.0;
        let status = if input.draft {
            InvoiceStatus::Draft
        } else {
            InvoiceStatus::Pending
        };

        Invoice {
            id: InvoiceId::new(),
            number: generate_number(now),
            created_at: now,
            due_date: input.due_date,
            client_name: input.client_name,
            client_email: input.client_email,
            client_address: input.client_address,
            items: input
                .items
                .into_iter()
                .map(|i| InvoiceItem {
                    id: ItemId::new(),
                    description: i.description,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    amount: i.amount,
                })
                .collect(),
            notes: input.notes,
            terms: input.terms,
            status,
            total_amount,
            payment_address: input.payment_address,
            payment_token_type: input.payment_token_type,
            paid_at: None,
            transaction_hash: None,
            owner_id,
        }
    }
}

/// Generate a human-readable invoice number: `INV-<6 digits>-<3 digits>`.
///
/// The first group is the tail of the creation timestamp in milliseconds, the
/// second is random. Practically unique, not guaranteed globally unique.
pub fn generate_number(now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp_millis().unsigned_abs() % 1_000_000;
    let random = (Uuid::new_v4().as_u128() % 1_000) as u32;
    format!("INV-{timestamp:06}-{random:03}")
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}
