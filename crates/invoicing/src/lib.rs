//! `chainvoice-invoicing` — invoice domain model.
//!
//! Invoices are owner-scoped documents: validated once at the boundary,
//! persisted whole, and mutated through a small set of lifecycle transitions.

pub mod invoice;

pub use invoice::{
    generate_number, Invoice, InvoiceItem, InvoiceStatus, NewInvoice, NewInvoiceItem, ValidInvoice,
};
