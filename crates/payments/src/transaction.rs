use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use chainvoice_core::{DomainError, DomainResult, FieldError, InvoiceId, OwnerId, TransactionId};

/// Transaction status. Closed set, lower-case on the wire.
///
/// In the happy path a transaction is created already confirmed; there is no
/// pending → confirmed polling anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Pending,
        TransactionStatus::Confirmed,
        TransactionStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Failed => "Failed",
        }
    }
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "confirmed" => Ok(TransactionStatus::Confirmed),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(DomainError::field(
                "status",
                "status must be one of: pending, confirmed, failed",
            )),
        }
    }
}

/// Recorded transaction document.
///
/// `invoice_id` is a non-owning back-reference: it drives the invoice-paid
/// transition and display lookups, and it can dangle if the invoice is later
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub amount: f64,
    pub token_type: String,
    pub from_address: String,
    pub to_address: String,
    pub hash: String,
    pub status: TransactionStatus,
    pub block_number: Option<u64>,
    pub invoice_id: Option<InvoiceId>,
    pub description: Option<String>,
    pub network_id: u64,
    pub owner_id: OwnerId,
}

/// Typed input for recording a transaction, validated exactly once via
/// [`NewTransaction::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    pub token_type: String,
    pub from_address: String,
    pub to_address: String,
    pub hash: String,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub description: Option<String>,
    pub network_id: u64,
    /// Recorded payments are confirmed on creation unless stated otherwise.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

impl NewTransaction {
    pub fn validate(self) -> DomainResult<ValidTransaction> {
        let mut errors = Vec::new();

        if !(self.amount >= 0.0) {
            errors.push(FieldError::new("amount", "Amount must be at least 0"));
        }
        if self.token_type.trim().is_empty() {
            errors.push(FieldError::new("token_type", "Token type is required"));
        }
        if self.from_address.trim().is_empty() {
            errors.push(FieldError::new("from_address", "From address is required"));
        }
        if self.to_address.trim().is_empty() {
            errors.push(FieldError::new("to_address", "To address is required"));
        }
        if self.hash.trim().is_empty() {
            errors.push(FieldError::new("hash", "Transaction hash is required"));
        }

        if errors.is_empty() {
            Ok(ValidTransaction(self))
        } else {
            Err(DomainError::validation(errors))
        }
    }
}

/// A [`NewTransaction`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTransaction(NewTransaction);

impl ValidTransaction {
    pub fn as_input(&self) -> &NewTransaction {
        &self.0
    }

    /// Materialize the transaction record, assigning identity and creation
    /// time. Status defaults to confirmed.
    pub fn into_transaction(self, owner_id: OwnerId, now: DateTime<Utc>) -> Transaction {
        let input = self.0;
        Transaction {
            id: TransactionId::new(),
            created_at: now,
            amount: input.amount,
            token_type: input.token_type,
            from_address: input.from_address,
            to_address: input.to_address,
            hash: input.hash,
            status: input.status.unwrap_or(TransactionStatus::Confirmed),
            block_number: None,
            invoice_id: input.invoice_id,
            description: input.description,
            network_id: input.network_id,
            owner_id,
        }
    }
}

/// A user-submitted payment claim for an invoice.
///
/// The hash is trusted as submitted; no on-chain verification happens
/// anywhere in the reconciliation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentClaim {
    pub invoice_id: InvoiceId,
    pub from_address: String,
    pub hash: String,
    pub network_id: u64,
}

impl PaymentClaim {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = Vec::new();

        if self.from_address.trim().is_empty() {
            errors.push(FieldError::new("from_address", "From address is required"));
        }
        if self.hash.trim().is_empty() {
            errors.push(FieldError::new("hash", "Transaction hash is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(errors))
        }
    }
}
