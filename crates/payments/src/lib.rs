//! `chainvoice-payments` — transaction domain model.
//!
//! A transaction records a user-claimed on-chain payment. The hash is an
//! opaque claim string; nothing here talks to a chain.

pub mod transaction;

pub use transaction::{
    NewTransaction, PaymentClaim, Transaction, TransactionStatus, ValidTransaction,
};
