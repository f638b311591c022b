//! Infrastructure layer: storage, payment reconciliation, and the analytics
//! read side.

pub mod analytics;
pub mod reconcile;
pub mod store;


pub use analytics::{Analytics, AnalyticsError};
pub use reconcile::{PaymentReconciler, ReconcileError, TrackedTransaction};
pub use store::{InMemoryInvoiceStore, InMemoryTransactionStore, InvoiceStore, StoreError, TransactionStore};
