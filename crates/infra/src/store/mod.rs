//! Owner-scoped document storage abstractions.
//!
//! The stores expose the handful of primitives the application needs (insert,
//! list-sorted, get-by-id, targeted updates, delete, one filtered lookup) so
//! any document-oriented backend can sit behind them. The in-memory
//! implementation is the default; a Postgres implementation is available
//! behind the `postgres` feature.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use chainvoice_core::{InvoiceId, OwnerId, TransactionId};
use chainvoice_invoicing::{Invoice, InvoiceStatus, ValidInvoice};
use chainvoice_payments::{Transaction, TransactionStatus, ValidTransaction};

pub use memory::{InMemoryInvoiceStore, InMemoryTransactionStore};

#[cfg(feature = "postgres")]
pub use postgres::{ensure_schema, PgInvoiceStore, PgTransactionStore};

/// Storage-level error.
///
/// `NotFound` is the only deterministic variant; everything else is a backend
/// failure the caller cannot reason about beyond retrying.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Persistence operations over invoice documents.
///
/// Every operation is scoped to an explicit owner; an id that exists under a
/// different owner is `NotFound` here.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a validated invoice input, materializing the document
    /// (id, number, created_at, derived total, initial status).
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidInvoice,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError>;

    /// All invoices for the owner, newest first.
    async fn list(&self, owner: OwnerId) -> Result<Vec<Invoice>, StoreError>;

    async fn get(&self, owner: OwnerId, id: InvoiceId) -> Result<Invoice, StoreError>;

    /// Generic status transition; sets `paid_at` when the status becomes
    /// paid, never touches `transaction_hash`.
    async fn update_status(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError>;

    /// Settle the invoice against a claimed transaction hash.
    async fn mark_paid(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError>;

    /// Permanent removal; there is no soft delete.
    async fn delete(&self, owner: OwnerId, id: InvoiceId) -> Result<(), StoreError>;
}

/// Persistence operations over transaction documents.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, StoreError>;

    /// All transactions for the owner, newest first.
    async fn list(&self, owner: OwnerId) -> Result<Vec<Transaction>, StoreError>;

    async fn get(&self, owner: OwnerId, id: TransactionId) -> Result<Transaction, StoreError>;

    async fn update_status(
        &self,
        owner: OwnerId,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, StoreError>;

    /// Lookup used to detect an already-tracked transaction before recording
    /// a duplicate.
    async fn find_by_hash_and_network(
        &self,
        owner: OwnerId,
        hash: &str,
        network_id: u64,
    ) -> Result<Option<Transaction>, StoreError>;
}
