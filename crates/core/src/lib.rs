//! `chainvoice-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the error taxonomy shared by every layer, and the static
//! chain registry used to render network information.

pub mod chain;
pub mod error;
pub mod id;

pub use chain::{chain_name, explorer_url, is_address, is_tx_hash};
pub use error::{DomainError, DomainResult, FieldError};
pub use id::{InvoiceId, ItemId, OwnerId, TransactionId};
