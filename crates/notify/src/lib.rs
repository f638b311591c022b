//! `chainvoice-notify` — outbound collaborator boundary.
//!
//! Email, Telegram, and document rendering are consumed through small traits;
//! the [`Notifier`] facade fans invoice/transaction events out to them on a
//! strictly fire-and-forget basis (failures are logged and reported as
//! `false`, never propagated to the write that triggered them).

pub mod email;
pub mod format;
pub mod notifier;
pub mod render;
pub mod telegram;

pub use email::{
    invoice_email, payment_confirmation_email, DisabledEmailTransport, EmailAttachment,
    EmailError, EmailMessage, EmailReceipt, EmailTransport,
};
pub use notifier::Notifier;
pub use render::{DocumentRenderer, HtmlDocumentRenderer};
pub use telegram::{BotApiTransport, TelegramError, TelegramTransport, TelegramUpdate};
