//! Postgres-backed document stores (behind the `postgres` feature).
//!
//! Runtime `sqlx::query` + manual row mapping, so compilation never needs a
//! live database. Items are stored as JSONB on the invoice row; every query
//! carries `owner_id` in its WHERE clause, which makes cross-owner access
//! impossible at the query layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

use chainvoice_core::{InvoiceId, OwnerId, TransactionId};
use chainvoice_invoicing::{Invoice, InvoiceItem, InvoiceStatus, ValidInvoice};
use chainvoice_payments::{Transaction, TransactionStatus, ValidTransaction};

use super::{InvoiceStore, StoreError, TransactionStore};

fn backend(context: &str, e: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{context}: {e}"))
}

/// Create the two document tables when they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            number TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            due_date TIMESTAMPTZ NOT NULL,
            client_name TEXT NOT NULL,
            client_email TEXT NOT NULL,
            client_address TEXT,
            items JSONB NOT NULL,
            notes TEXT,
            terms TEXT,
            status TEXT NOT NULL,
            total_amount DOUBLE PRECISION NOT NULL,
            payment_address TEXT,
            payment_token_type TEXT,
            paid_at TIMESTAMPTZ,
            transaction_hash TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| backend("create invoices table", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            amount DOUBLE PRECISION NOT NULL,
            token_type TEXT NOT NULL,
            from_address TEXT NOT NULL,
            to_address TEXT NOT NULL,
            hash TEXT NOT NULL,
            status TEXT NOT NULL,
            block_number BIGINT,
            invoice_id UUID,
            description TEXT,
            network_id BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| backend("create transactions table", e))?;

    Ok(())
}

fn row_to_invoice(row: &PgRow) -> Result<Invoice, StoreError> {
    let items_json: serde_json::Value = row
        .try_get("items")
        .map_err(|e| backend("read invoice items", e))?;
    let items: Vec<InvoiceItem> = serde_json::from_value(items_json)
        .map_err(|e| backend("decode invoice items", e))?;

    let status: String = row
        .try_get("status")
        .map_err(|e| backend("read invoice status", e))?;
    let status: InvoiceStatus = status
        .parse()
        .map_err(|e| backend("decode invoice status", e))?;

    Ok(Invoice {
        id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("id").map_err(|e| backend("read invoice id", e))?),
        owner_id: OwnerId::from_uuid(
            row.try_get::<Uuid, _>("owner_id")
                .map_err(|e| backend("read invoice owner", e))?,
        ),
        number: row.try_get("number").map_err(|e| backend("read invoice number", e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| backend("read invoice created_at", e))?,
        due_date: row
            .try_get("due_date")
            .map_err(|e| backend("read invoice due_date", e))?,
        client_name: row
            .try_get("client_name")
            .map_err(|e| backend("read invoice client_name", e))?,
        client_email: row
            .try_get("client_email")
            .map_err(|e| backend("read invoice client_email", e))?,
        client_address: row
            .try_get("client_address")
            .map_err(|e| backend("read invoice client_address", e))?,
        items,
        notes: row.try_get("notes").map_err(|e| backend("read invoice notes", e))?,
        terms: row.try_get("terms").map_err(|e| backend("read invoice terms", e))?,
        status,
        total_amount: row
            .try_get("total_amount")
            .map_err(|e| backend("read invoice total_amount", e))?,
        payment_address: row
            .try_get("payment_address")
            .map_err(|e| backend("read invoice payment_address", e))?,
        payment_token_type: row
            .try_get("payment_token_type")
            .map_err(|e| backend("read invoice payment_token_type", e))?,
        paid_at: row.try_get("paid_at").map_err(|e| backend("read invoice paid_at", e))?,
        transaction_hash: row
            .try_get("transaction_hash")
            .map_err(|e| backend("read invoice transaction_hash", e))?,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| backend("read transaction status", e))?;
    let status: TransactionStatus = status
        .parse()
        .map_err(|e| backend("decode transaction status", e))?;

    Ok(Transaction {
        id: TransactionId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| backend("read transaction id", e))?,
        ),
        owner_id: OwnerId::from_uuid(
            row.try_get::<Uuid, _>("owner_id")
                .map_err(|e| backend("read transaction owner", e))?,
        ),
        created_at: row
            .try_get("created_at")
            .map_err(|e| backend("read transaction created_at", e))?,
        amount: row.try_get("amount").map_err(|e| backend("read transaction amount", e))?,
        token_type: row
            .try_get("token_type")
            .map_err(|e| backend("read transaction token_type", e))?,
        from_address: row
            .try_get("from_address")
            .map_err(|e| backend("read transaction from_address", e))?,
        to_address: row
            .try_get("to_address")
            .map_err(|e| backend("read transaction to_address", e))?,
        hash: row.try_get("hash").map_err(|e| backend("read transaction hash", e))?,
        status,
        block_number: row
            .try_get::<Option<i64>, _>("block_number")
            .map_err(|e| backend("read transaction block_number", e))?
            .map(|n| n as u64),
        invoice_id: row
            .try_get::<Option<Uuid>, _>("invoice_id")
            .map_err(|e| backend("read transaction invoice_id", e))?
            .map(InvoiceId::from_uuid),
        description: row
            .try_get("description")
            .map_err(|e| backend("read transaction description", e))?,
        network_id: row
            .try_get::<i64, _>("network_id")
            .map_err(|e| backend("read transaction network_id", e))? as u64,
    })
}

/// Postgres invoice store.
#[derive(Debug, Clone)]
pub struct PgInvoiceStore {
    pool: Arc<PgPool>,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidInvoice,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let invoice = input.into_invoice(owner, now);
        let items = serde_json::to_value(&invoice.items)
            .map_err(|e| backend("encode invoice items", e))?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, owner_id, number, created_at, due_date, client_name,
                client_email, client_address, items, notes, terms, status,
                total_amount, payment_address, payment_token_type, paid_at,
                transaction_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.owner_id.as_uuid())
        .bind(&invoice.number)
        .bind(invoice.created_at)
        .bind(invoice.due_date)
        .bind(&invoice.client_name)
        .bind(&invoice.client_email)
        .bind(&invoice.client_address)
        .bind(items)
        .bind(&invoice.notes)
        .bind(&invoice.terms)
        .bind(invoice.status.as_str())
        .bind(invoice.total_amount)
        .bind(&invoice.payment_address)
        .bind(&invoice.payment_token_type)
        .bind(invoice.paid_at)
        .bind(&invoice.transaction_hash)
        .execute(&*self.pool)
        .await
        .map_err(|e| backend("insert invoice", e))?;

        Ok(invoice)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM invoices WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend("list invoices", e))?;

        rows.iter().map(row_to_invoice).collect()
    }

    async fn get(&self, owner: OwnerId, id: InvoiceId) -> Result<Invoice, StoreError> {
        let row = sqlx::query("SELECT * FROM invoices WHERE owner_id = $1 AND id = $2")
            .bind(owner.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| backend("get invoice", e))?
            .ok_or(StoreError::NotFound)?;

        row_to_invoice(&row)
    }

    async fn update_status(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $3,
                paid_at = CASE WHEN $3 = 'paid' THEN $4 ELSE paid_at END
            WHERE owner_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(owner.as_uuid())
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("update invoice status", e))?
        .ok_or(StoreError::NotFound)?;

        row_to_invoice(&row)
    }

    async fn mark_paid(
        &self,
        owner: OwnerId,
        id: InvoiceId,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'paid', paid_at = $3, transaction_hash = $4
            WHERE owner_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(owner.as_uuid())
        .bind(id.as_uuid())
        .bind(now)
        .bind(transaction_hash)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("mark invoice paid", e))?
        .ok_or(StoreError::NotFound)?;

        row_to_invoice(&row)
    }

    async fn delete(&self, owner: OwnerId, id: InvoiceId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM invoices WHERE owner_id = $1 AND id = $2")
            .bind(owner.as_uuid())
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| backend("delete invoice", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Postgres transaction store.
#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    pool: Arc<PgPool>,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(
        &self,
        owner: OwnerId,
        input: ValidTransaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction, StoreError> {
        let transaction = input.into_transaction(owner, now);

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, owner_id, created_at, amount, token_type, from_address,
                to_address, hash, status, block_number, invoice_id,
                description, network_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.owner_id.as_uuid())
        .bind(transaction.created_at)
        .bind(transaction.amount)
        .bind(&transaction.token_type)
        .bind(&transaction.from_address)
        .bind(&transaction.to_address)
        .bind(&transaction.hash)
        .bind(transaction.status.as_str())
        .bind(transaction.block_number.map(|n| n as i64))
        .bind(transaction.invoice_id.map(|i| *i.as_uuid()))
        .bind(&transaction.description)
        .bind(transaction.network_id as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| backend("insert transaction", e))?;

        Ok(transaction)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend("list transactions", e))?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn get(&self, owner: OwnerId, id: TransactionId) -> Result<Transaction, StoreError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE owner_id = $1 AND id = $2")
            .bind(owner.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| backend("get transaction", e))?
            .ok_or(StoreError::NotFound)?;

        row_to_transaction(&row)
    }

    async fn update_status(
        &self,
        owner: OwnerId,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE transactions SET status = $3
            WHERE owner_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(owner.as_uuid())
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("update transaction status", e))?
        .ok_or(StoreError::NotFound)?;

        row_to_transaction(&row)
    }

    async fn find_by_hash_and_network(
        &self,
        owner: OwnerId,
        hash: &str,
        network_id: u64,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM transactions WHERE owner_id = $1 AND hash = $2 AND network_id = $3",
        )
        .bind(owner.as_uuid())
        .bind(hash)
        .bind(network_id as i64)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("find transaction by hash", e))?;

        row.as_ref().map(row_to_transaction).transpose()
    }
}
