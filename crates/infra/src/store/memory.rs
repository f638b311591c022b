//! In-memory owner-scoped stores (dev/tests).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chainvoice_core::{InvoiceId, OwnerId, TransactionId};
use chainvoice_invoicing::{Invoice, InvoiceStatus, ValidInvoice};
use chainvoice_payments::{Transaction, TransactionStatus, ValidTransaction};

use super::{InvoiceStore, StoreError, TransactionStore};

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

/// In-memory invoice store keyed by `(owner, invoice id)`.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    inner: RwLock<HashMap<(OwnerId, InvoiceId), Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidInvoice,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let invoice = input.into_invoice(owner, now);
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert((owner, invoice.id), invoice.clone());
        Ok(invoice)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Invoice>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut invoices: Vec<Invoice> = map
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|(_, v)| v.clone())
            .collect();
        // Newest first; ids are time-ordered, which breaks created_at ties.
        invoices.sort_by(|a, b| (b.created_at, b.id.as_uuid()).cmp(&(a.created_at, a.id.as_uuid())));
        Ok(invoices)
    }

    async fn get(&self, owner: OwnerId, id: InvoiceId) -> Result<Invoice, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(&(owner, id)).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_status(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let invoice = map.get_mut(&(owner, id)).ok_or(StoreError::NotFound)?;
        invoice.set_status(status, now);
        Ok(invoice.clone())
    }

    async fn mark_paid(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let invoice = map.get_mut(&(owner, id)).ok_or(StoreError::NotFound)?;
        invoice.mark_paid(transaction_hash, now);
        Ok(invoice.clone())
    }

    async fn delete(&self, owner: OwnerId, id: InvoiceId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&(owner, id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// In-memory transaction store keyed by `(owner, transaction id)`.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    inner: RwLock<HashMap<(OwnerId, TransactionId), Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, StoreError> {
        let transaction = input.into_transaction(owner, now);
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert((owner, transaction.id), transaction.clone());
        Ok(transaction)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Transaction>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut transactions: Vec<Transaction> = map
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|(_, v)| v.clone())
            .collect();
        transactions
            .sort_by(|a, b| (b.created_at, b.id.as_uuid()).cmp(&(a.created_at, a.id.as_uuid())));
        Ok(transactions)
    }

    async fn get(&self, owner: OwnerId, id: TransactionId) -> Result<Transaction, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(&(owner, id)).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_status(
        &self,
        owner: OwnerId,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let transaction = map.get_mut(&(owner, id)).ok_or(StoreError::NotFound)?;
        transaction.status = status;
        Ok(transaction.clone())
    }

    async fn find_by_hash_and_network(
        &self,
        owner: OwnerId,
        hash: &str,
        network_id: u64,
    ) -> Result<Option<Transaction>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .find(|((o, _), t)| *o == owner && t.hash == hash && t.network_id == network_id)
            .map(|(_, t)| t.clone()))
    }
}
