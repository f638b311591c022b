//! `chainvoice-ai`
//!
//! **Responsibility:** Optional AI invoice-drafting boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on the invoice/transaction documents.
//! - It must not mutate domain state.
//! - It emits **drafts** the caller turns into real invoice input.
//!
//! Drafting never fails toward the caller: any upstream error is replaced by
//! a deterministic placeholder draft.

pub mod draft;
pub mod drafter;
pub mod gemini;

pub use draft::{DraftError, DraftItem, InvoiceDraft};
pub use drafter::{draft_or_fallback, InvoiceDrafter, ScriptedDrafter};
pub use gemini::GeminiDrafter;
