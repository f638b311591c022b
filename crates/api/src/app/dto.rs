use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use chainvoice_core::InvoiceId;
use chainvoice_invoicing::{Invoice, NewInvoice, NewInvoiceItem};
use chainvoice_payments::{NewTransaction, PaymentClaim, Transaction, TransactionStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct InvoiceItemRequest {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_address: Option<String>,
    pub items: Vec<InvoiceItemRequest>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    /// RFC3339
    pub due_date: String,
    #[serde(default)]
    pub payment_address: Option<String>,
    #[serde(default)]
    pub payment_token_type: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

impl CreateInvoiceRequest {
    pub fn into_new_invoice(self) -> Result<NewInvoice, axum::response::Response> {
        let due_date = parse_rfc3339(&self.due_date, "due_date")?;
        Ok(NewInvoice {
            client_name: self.client_name,
            client_email: self.client_email,
            client_address: self.client_address,
            items: self
                .items
                .into_iter()
                .map(|i| NewInvoiceItem {
                    description: i.description,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    amount: i.amount,
                })
                .collect(),
            notes: self.notes,
            terms: self.terms,
            due_date,
            payment_address: self.payment_address,
            payment_token_type: self.payment_token_type,
            draft: self.draft,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    pub transaction_hash: String,
}

fn default_email_type() -> String {
    "invoice".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub sender_name: String,
    pub sender_email: String,
    /// "invoice" or "payment"
    #[serde(default = "default_email_type")]
    pub email_type: String,
    #[serde(default = "default_true")]
    pub attach_document: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: f64,
    pub token_type: String,
    pub from_address: String,
    pub to_address: String,
    pub hash: String,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub network_id: u64,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateTransactionRequest {
    pub fn into_new_transaction(self) -> Result<NewTransaction, axum::response::Response> {
        let invoice_id = self
            .invoice_id
            .as_deref()
            .map(|s| parse_invoice_id(s))
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| {
                s.parse::<TransactionStatus>()
                    .map_err(|e| errors::domain_error_to_response(e))
            })
            .transpose()?;

        Ok(NewTransaction {
            amount: self.amount,
            token_type: self.token_type,
            from_address: self.from_address,
            to_address: self.to_address,
            hash: self.hash,
            invoice_id,
            description: self.description,
            network_id: self.network_id,
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackTransactionRequest {
    pub hash: String,
    pub network_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub invoice_id: String,
    pub from_address: String,
    pub hash: String,
    pub network_id: u64,
}

impl InitiatePaymentRequest {
    pub fn into_claim(self) -> Result<PaymentClaim, axum::response::Response> {
        Ok(PaymentClaim {
            invoice_id: parse_invoice_id(&self.invoice_id)?,
            from_address: self.from_address,
            hash: self.hash,
            network_id: self.network_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidatePaymentRequest {
    pub invoice_id: String,
    pub transaction_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftInvoiceRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyRevenueQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

fn default_months() -> u32 {
    6
}

#[derive(Debug, Deserialize)]
pub struct TopClientsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_invoice_id(s: &str) -> Result<InvoiceId, axum::response::Response> {
    s.parse::<InvoiceId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid invoice id"))
}

fn parse_rfc3339(s: &str, field: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, format!("{field} must be RFC3339")))
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn invoice_to_json(invoice: &Invoice) -> serde_json::Value {
    serde_json::json!({
        "id": invoice.id.to_string(),
        "number": invoice.number,
        "created_at": invoice.created_at.to_rfc3339(),
        "due_date": invoice.due_date.to_rfc3339(),
        "client_name": invoice.client_name,
        "client_email": invoice.client_email,
        "client_address": invoice.client_address,
        "items": invoice.items.iter().map(|i| serde_json::json!({
            "id": i.id.to_string(),
            "description": i.description,
            "quantity": i.quantity,
            "unit_price": i.unit_price,
            "amount": i.amount,
        })).collect::<Vec<_>>(),
        "notes": invoice.notes,
        "terms": invoice.terms,
        "status": invoice.status.as_str(),
        "total_amount": invoice.total_amount,
        "payment_address": invoice.payment_address,
        "payment_token_type": invoice.payment_token_type,
        "paid_at": invoice.paid_at.map(|d| d.to_rfc3339()),
        "transaction_hash": invoice.transaction_hash,
    })
}

pub fn transaction_to_json(transaction: &Transaction) -> serde_json::Value {
    serde_json::json!({
        "id": transaction.id.to_string(),
        "created_at": transaction.created_at.to_rfc3339(),
        "amount": transaction.amount,
        "token_type": transaction.token_type,
        "from_address": transaction.from_address,
        "to_address": transaction.to_address,
        "hash": transaction.hash,
        "status": transaction.status.as_str(),
        "block_number": transaction.block_number,
        "invoice_id": transaction.invoice_id.map(|i| i.to_string()),
        "description": transaction.description,
        "network_id": transaction.network_id,
        "network_name": chainvoice_core::chain_name(transaction.network_id),
    })
}
