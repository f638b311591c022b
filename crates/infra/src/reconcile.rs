//! Payment reconciliation (application-level orchestration).
//!
//! Turns a user-submitted payment claim into a confirmed transaction and a
//! paid invoice:
//!
//! ```text
//! Claim
//!   ↓
//! 1. Validate inputs (typed claim, field-level errors)
//!   ↓
//! 2. Load the invoice (abort with no writes when missing)
//!   ↓
//! 3. Build the transaction from the invoice (amount, token, addresses)
//!   ↓
//! 4. Persist the transaction (confirmed)
//!   ↓
//! 5. Mark the invoice paid with the claimed hash
//! ```
//!
//! Steps 4 and 5 are two independent writes with no atomicity between them.
//! A failure after step 4 leaves a confirmed transaction whose invoice is not
//! paid; [`PaymentReconciler::sweep_unreconciled`] is the recovery action for
//! that window. The claimed hash is trusted as submitted — nothing here talks
//! to a chain.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use chainvoice_core::{DomainError, FieldError, InvoiceId, OwnerId, TransactionId};
use chainvoice_invoicing::InvoiceStatus;
use chainvoice_payments::{NewTransaction, PaymentClaim, Transaction, TransactionStatus};

use crate::store::{InvoiceStore, StoreError, TransactionStore};

pub const DEFAULT_TOKEN_TYPE: &str = "ETH";

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The claim (or the transaction derived from it) failed validation;
    /// nothing was written.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// The referenced invoice does not exist; nothing was written.
    #[error("invoice not found")]
    InvoiceNotFound,

    /// Persisting the transaction failed; the invoice was not touched.
    #[error("failed to create transaction record")]
    TransactionWrite(#[source] StoreError),

    /// The transaction was written but the invoice-paid transition failed.
    /// This is the known partial-failure state; the sweep repairs it.
    #[error("failed to record payment")]
    InvoiceUpdateFailed {
        transaction_id: TransactionId,
        #[source]
        source: StoreError,
    },

    /// A read failed before any write happened.
    #[error("storage failure")]
    Store(#[source] StoreError),
}

impl From<DomainError> for ReconcileError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(fields) => ReconcileError::Validation(fields),
            DomainError::NotFound => ReconcileError::InvoiceNotFound,
            DomainError::InvalidId(msg) => {
                ReconcileError::Validation(vec![FieldError::new("id", msg)])
            }
            DomainError::InvariantViolation(msg) => {
                ReconcileError::Validation(vec![FieldError::new("claim", msg)])
            }
        }
    }
}

/// Result of [`PaymentReconciler::track_wallet_transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTransaction {
    pub transaction: Transaction,
    /// Whether the (hash, network) pair was already on record.
    pub already_tracked: bool,
}

/// Orchestrates the claim → transaction → paid-invoice pipeline over the two
/// injected stores.
#[derive(Clone)]
pub struct PaymentReconciler {
    invoices: Arc<dyn InvoiceStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl PaymentReconciler {
    pub fn new(invoices: Arc<dyn InvoiceStore>, transactions: Arc<dyn TransactionStore>) -> Self {
        Self {
            invoices,
            transactions,
        }
    }

    /// Record a payment claim against an invoice.
    ///
    /// Deliberately no dedup: submitting the same hash twice records two
    /// transactions (current behavior, covered by tests).
    pub async fn initiate_payment(
        &self,
        owner: OwnerId,
        claim: PaymentClaim,
        now: DateTime<Utc>,
    ) -> Result<Transaction, ReconcileError> {
        claim.validate()?;

        let invoice = match self.invoices.get(owner, claim.invoice_id).await {
            Ok(invoice) => invoice,
            Err(StoreError::NotFound) => return Err(ReconcileError::InvoiceNotFound),
            Err(e) => return Err(ReconcileError::Store(e)),
        };

        let input = NewTransaction {
            amount: invoice.total_amount,
            token_type: invoice
                .payment_token_type
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            from_address: claim.from_address,
            to_address: invoice.payment_address.clone().unwrap_or_default(),
            hash: claim.hash.clone(),
            invoice_id: Some(invoice.id),
            description: Some(format!("Payment for invoice {}", invoice.number)),
            network_id: claim.network_id,
            status: None,
        };

        // An invoice without a payment address yields an empty to_address,
        // which fails transaction validation before anything is written.
        let valid = input.validate()?;

        let transaction = self
            .transactions
            .create(owner, valid, now)
            .await
            .map_err(ReconcileError::TransactionWrite)?;

        if let Err(e) = self
            .invoices
            .mark_paid(owner, invoice.id, &transaction.hash, now)
            .await
        {
            tracing::warn!(
                invoice_id = %invoice.id,
                transaction_id = %transaction.id,
                "transaction recorded but invoice-paid transition failed: {e}"
            );
            return Err(ReconcileError::InvoiceUpdateFailed {
                transaction_id: transaction.id,
                source: e,
            });
        }

        tracing::info!(
            invoice_id = %invoice.id,
            transaction_id = %transaction.id,
            "payment reconciled"
        );
        Ok(transaction)
    }

    /// Simulated payment verification: confirms the invoice exists and takes
    /// the hash at its word. A deliberate stand-in for real chain
    /// verification.
    pub async fn validate_payment(
        &self,
        owner: OwnerId,
        invoice_id: InvoiceId,
        _transaction_hash: &str,
    ) -> Result<bool, ReconcileError> {
        match self.invoices.get(owner, invoice_id).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Err(ReconcileError::InvoiceNotFound),
            Err(e) => Err(ReconcileError::Store(e)),
        }
    }

    /// Track a wallet transaction by hash, without creating a duplicate for
    /// an already-recorded (hash, network) pair.
    ///
    /// Unknown hashes are recorded from placeholder chain data; a real chain
    /// lookup would slot in where the placeholder is built.
    pub async fn track_wallet_transaction(
        &self,
        owner: OwnerId,
        hash: &str,
        network_id: u64,
        now: DateTime<Utc>,
    ) -> Result<TrackedTransaction, ReconcileError> {
        if let Some(existing) = self
            .transactions
            .find_by_hash_and_network(owner, hash, network_id)
            .await
            .map_err(ReconcileError::Store)?
        {
            return Ok(TrackedTransaction {
                transaction: existing,
                already_tracked: true,
            });
        }

        let input = NewTransaction {
            amount: 0.1,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            from_address: format!("0x{}", "1".repeat(40)),
            to_address: format!("0x{}", "2".repeat(40)),
            hash: hash.to_string(),
            invoice_id: None,
            description: None,
            network_id,
            status: Some(TransactionStatus::Confirmed),
        };
        let valid = input.validate()?;

        let transaction = self
            .transactions
            .create(owner, valid, now)
            .await
            .map_err(ReconcileError::TransactionWrite)?;

        Ok(TrackedTransaction {
            transaction,
            already_tracked: false,
        })
    }

    /// Recovery action for the partial-failure window: find confirmed
    /// transactions that reference an invoice which never became paid, and
    /// re-apply the paid transition. Returns the repaired invoice ids.
    ///
    /// Individual repair failures are logged and skipped so one bad record
    /// cannot stall the rest of the sweep.
    pub async fn sweep_unreconciled(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<InvoiceId>, ReconcileError> {
        let transactions = self
            .transactions
            .list(owner)
            .await
            .map_err(ReconcileError::Store)?;

        let mut repaired = Vec::new();
        for tx in transactions {
            if tx.status != TransactionStatus::Confirmed {
                continue;
            }
            let Some(invoice_id) = tx.invoice_id else {
                continue;
            };

            let invoice = match self.invoices.get(owner, invoice_id).await {
                Ok(invoice) => invoice,
                Err(StoreError::NotFound) => {
                    // Orphaned back-reference (invoice deleted after the
                    // transaction was recorded); nothing to repair.
                    continue;
                }
                Err(e) => {
                    tracing::warn!(invoice_id = %invoice_id, "sweep read failed: {e}");
                    continue;
                }
            };

            if invoice.status == InvoiceStatus::Paid {
                continue;
            }

            match self.invoices.mark_paid(owner, invoice_id, &tx.hash, now).await {
                Ok(_) => {
                    tracing::info!(invoice_id = %invoice_id, "sweep repaired unreconciled payment");
                    repaired.push(invoice_id);
                }
                Err(e) => {
                    tracing::warn!(invoice_id = %invoice_id, "sweep repair failed: {e}");
                }
            }
        }

        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryInvoiceStore, InMemoryTransactionStore};
    use async_trait::async_trait;
    use chainvoice_invoicing::{Invoice, NewInvoice, NewInvoiceItem, ValidInvoice};
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn invoice_input(payment_address: Option<String>) -> ValidInvoice {
        NewInvoice {
            client_name: "Acme Corp".to_string(),
            client_email: "billing@acme.example".to_string(),
            client_address: None,
            items: vec![NewInvoiceItem {
                description: "Design".to_string(),
                quantity: 2,
                unit_price: 50.0,
                amount: 100.0,
            }],
            notes: None,
            terms: None,
            due_date: Utc::now() + Duration::days(30),
            payment_address,
            payment_token_type: None,
            draft: false,
        }
        .validate()
        .unwrap()
    }

    fn claim(invoice_id: InvoiceId) -> PaymentClaim {
        PaymentClaim {
            invoice_id,
            from_address: format!("0x{}", "a".repeat(40)),
            hash: format!("0x{}", "d".repeat(64)),
            network_id: 1,
        }
    }

    fn reconciler() -> (
        PaymentReconciler,
        Arc<InMemoryInvoiceStore>,
        Arc<InMemoryTransactionStore>,
    ) {
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let reconciler = PaymentReconciler::new(invoices.clone(), transactions.clone());
        (reconciler, invoices, transactions)
    }

    #[tokio::test]
    async fn happy_path_records_transaction_and_pays_invoice() {
        let (reconciler, invoices, transactions) = reconciler();
        let owner = OwnerId::new();
        let now = Utc::now();

        let invoice = invoices
            .create(
                owner,
                invoice_input(Some(format!("0x{}", "b".repeat(40)))),
                now,
            )
            .await
            .unwrap();
        assert_eq!(invoice.total_amount, 100.0);
        assert_eq!(invoice.status, InvoiceStatus::Pending);

        let tx = reconciler
            .initiate_payment(owner, claim(invoice.id), now)
            .await
            .unwrap();

        assert_eq!(tx.amount, 100.0);
        assert_eq!(tx.token_type, "ETH");
        assert_eq!(tx.network_id, 1);
        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert_eq!(tx.invoice_id, Some(invoice.id));
        assert_eq!(
            tx.description.as_deref(),
            Some(format!("Payment for invoice {}", invoice.number).as_str())
        );

        let paid = invoices.get(owner, invoice.id).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.transaction_hash.as_deref(), Some(tx.hash.as_str()));

        assert_eq!(transactions.list(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_invoice_writes_nothing() {
        let (reconciler, _invoices, transactions) = reconciler();
        let owner = OwnerId::new();

        let err = reconciler
            .initiate_payment(owner, claim(InvoiceId::new()), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvoiceNotFound));
        assert!(transactions.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_claim_fields_fail_validation() {
        let (reconciler, invoices, transactions) = reconciler();
        let owner = OwnerId::new();
        let invoice = invoices
            .create(owner, invoice_input(Some(format!("0x{}", "b".repeat(40)))), Utc::now())
            .await
            .unwrap();

        let err = reconciler
            .initiate_payment(
                owner,
                PaymentClaim {
                    invoice_id: invoice.id,
                    from_address: String::new(),
                    hash: String::new(),
                    network_id: 1,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Validation(_)));
        assert!(transactions.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invoice_without_payment_address_rejects_the_claim() {
        let (reconciler, invoices, transactions) = reconciler();
        let owner = OwnerId::new();
        let invoice = invoices
            .create(owner, invoice_input(None), Utc::now())
            .await
            .unwrap();

        let err = reconciler
            .initiate_payment(owner, claim(invoice.id), Utc::now())
            .await
            .unwrap_err();

        // to_address ends up empty and fails transaction validation, so the
        // invoice is untouched.
        match err {
            ReconcileError::Validation(fields) => {
                assert!(fields.iter().any(|f| f.field == "to_address"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(transactions.list(owner).await.unwrap().is_empty());
        assert_eq!(
            invoices.get(owner, invoice.id).await.unwrap().status,
            InvoiceStatus::Pending
        );
    }

    #[tokio::test]
    async fn duplicate_claims_record_two_transactions() {
        let (reconciler, invoices, transactions) = reconciler();
        let owner = OwnerId::new();
        let invoice = invoices
            .create(owner, invoice_input(Some(format!("0x{}", "b".repeat(40)))), Utc::now())
            .await
            .unwrap();

        reconciler
            .initiate_payment(owner, claim(invoice.id), Utc::now())
            .await
            .unwrap();
        reconciler
            .initiate_payment(owner, claim(invoice.id), Utc::now())
            .await
            .unwrap();

        // No dedup on the claim path: both submissions persist.
        let recorded = transactions.list(owner).await.unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].hash, recorded[1].hash);
    }

    /// Invoice store whose mark_paid fails on demand (partial-failure
    /// window).
    struct FlakyInvoiceStore {
        inner: InMemoryInvoiceStore,
        fail_mark_paid: AtomicBool,
    }

    impl FlakyInvoiceStore {
        fn new() -> Self {
            Self {
                inner: InMemoryInvoiceStore::new(),
                fail_mark_paid: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl InvoiceStore for FlakyInvoiceStore {
        async fn create(
            &self,
            owner: OwnerId,
            input: ValidInvoice,
            now: DateTime<Utc>,
        ) -> Result<Invoice, StoreError> {
            self.inner.create(owner, input, now).await
        }

        async fn list(&self, owner: OwnerId) -> Result<Vec<Invoice>, StoreError> {
            self.inner.list(owner).await
        }

        async fn get(&self, owner: OwnerId, id: InvoiceId) -> Result<Invoice, StoreError> {
            self.inner.get(owner, id).await
        }

        async fn update_status(
            &self,
            owner: OwnerId,
            id: InvoiceId,
            status: InvoiceStatus,
            now: DateTime<Utc>,
        ) -> Result<Invoice, StoreError> {
            self.inner.update_status(owner, id, status, now).await
        }

        async fn mark_paid(
            &self,
            owner: OwnerId,
            id: InvoiceId,
            transaction_hash: &str,
            now: DateTime<Utc>,
        ) -> Result<Invoice, StoreError> {
            if self.fail_mark_paid.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("simulated outage".to_string()));
            }
            self.inner.mark_paid(owner, id, transaction_hash, now).await
        }

        async fn delete(&self, owner: OwnerId, id: InvoiceId) -> Result<(), StoreError> {
            self.inner.delete(owner, id).await
        }
    }

    #[tokio::test]
    async fn sweep_repairs_a_partially_failed_reconciliation() {
        let invoices = Arc::new(FlakyInvoiceStore::new());
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let reconciler = PaymentReconciler::new(invoices.clone(), transactions.clone());
        let owner = OwnerId::new();
        let now = Utc::now();

        let invoice = invoices
            .create(owner, invoice_input(Some(format!("0x{}", "b".repeat(40)))), now)
            .await
            .unwrap();

        // First write succeeds, the paid transition does not.
        invoices.fail_mark_paid.store(true, Ordering::SeqCst);
        let err = reconciler
            .initiate_payment(owner, claim(invoice.id), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvoiceUpdateFailed { .. }));

        // The partial state is observable: transaction exists, invoice pending.
        assert_eq!(transactions.list(owner).await.unwrap().len(), 1);
        assert_eq!(
            invoices.get(owner, invoice.id).await.unwrap().status,
            InvoiceStatus::Pending
        );

        // Recovery sweep closes the window.
        invoices.fail_mark_paid.store(false, Ordering::SeqCst);
        let repaired = reconciler.sweep_unreconciled(owner, now).await.unwrap();
        assert_eq!(repaired, vec![invoice.id]);

        let healed = invoices.get(owner, invoice.id).await.unwrap();
        assert_eq!(healed.status, InvoiceStatus::Paid);
        assert!(healed.transaction_hash.is_some());

        // A second sweep finds nothing left to do.
        assert!(reconciler.sweep_unreconciled(owner, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_skips_orphaned_invoice_references() {
        let (reconciler, invoices, _transactions) = reconciler();
        let owner = OwnerId::new();
        let now = Utc::now();

        let invoice = invoices
            .create(owner, invoice_input(Some(format!("0x{}", "b".repeat(40)))), now)
            .await
            .unwrap();
        reconciler
            .initiate_payment(owner, claim(invoice.id), now)
            .await
            .unwrap();

        // Deleting the invoice orphans the transaction's back-reference.
        invoices.delete(owner, invoice.id).await.unwrap();

        let repaired = reconciler.sweep_unreconciled(owner, now).await.unwrap();
        assert!(repaired.is_empty());
    }

    #[tokio::test]
    async fn track_wallet_transaction_dedups_by_hash_and_network() {
        let (reconciler, _invoices, transactions) = reconciler();
        let owner = OwnerId::new();
        let hash = format!("0x{}", "7".repeat(64));

        let first = reconciler
            .track_wallet_transaction(owner, &hash, 1, Utc::now())
            .await
            .unwrap();
        assert!(!first.already_tracked);

        let second = reconciler
            .track_wallet_transaction(owner, &hash, 1, Utc::now())
            .await
            .unwrap();
        assert!(second.already_tracked);
        assert_eq!(second.transaction.id, first.transaction.id);

        // Same hash on another network is a distinct record.
        let other_network = reconciler
            .track_wallet_transaction(owner, &hash, 137, Utc::now())
            .await
            .unwrap();
        assert!(!other_network.already_tracked);

        assert_eq!(transactions.list(owner).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn validate_payment_requires_an_existing_invoice() {
        let (reconciler, invoices, _transactions) = reconciler();
        let owner = OwnerId::new();
        let invoice = invoices
            .create(owner, invoice_input(None), Utc::now())
            .await
            .unwrap();

        let verified = reconciler
            .validate_payment(owner, invoice.id, "0xwhatever")
            .await
            .unwrap();
        assert!(verified);

        let err = reconciler
            .validate_payment(owner, InvoiceId::new(), "0xwhatever")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvoiceNotFound));
    }
}
