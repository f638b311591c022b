//! Fire-and-forget notification fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use chainvoice_invoicing::Invoice;
use chainvoice_payments::Transaction;

use crate::telegram::{
    invoice_created_message, invoice_overdue_message, invoice_paid_message, transaction_message,
    TelegramTransport,
};

/// Sends dashboard notifications without ever failing the operation that
/// triggered them: every method logs failures and reports a bool.
#[derive(Clone)]
pub struct Notifier {
    telegram: Option<Arc<dyn TelegramTransport>>,
    chat_id: Option<String>,
}

impl Notifier {
    pub fn new(telegram: Option<Arc<dyn TelegramTransport>>, chat_id: Option<String>) -> Self {
        Self { telegram, chat_id }
    }

    /// Notifier with no configured transports (every send is a logged no-op).
    pub fn disabled() -> Self {
        Self {
            telegram: None,
            chat_id: None,
        }
    }

    /// Chat configured to receive notifications, used by `/status` replies.
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub async fn invoice_created(&self, invoice: &Invoice) -> bool {
        self.send(invoice_created_message(invoice)).await
    }

    pub async fn invoice_paid(&self, invoice: &Invoice) -> bool {
        self.send(invoice_paid_message(invoice)).await
    }

    pub async fn invoice_overdue(&self, invoice: &Invoice, now: DateTime<Utc>) -> bool {
        self.send(invoice_overdue_message(invoice, now)).await
    }

    pub async fn transaction_recorded(&self, transaction: &Transaction) -> bool {
        self.send(transaction_message(transaction)).await
    }

    async fn send(&self, text: String) -> bool {
        let (Some(telegram), Some(chat_id)) = (self.telegram.as_ref(), self.chat_id.as_deref())
        else {
            tracing::warn!("telegram bot token or chat id not configured");
            return false;
        };

        match telegram.send_message(chat_id, &text, true).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("telegram notification failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::TelegramError;
    use async_trait::async_trait;
    use chainvoice_core::OwnerId;
    use chainvoice_invoicing::{NewInvoice, NewInvoiceItem};
    use chrono::Duration;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl TelegramTransport for RecordingTransport {
        async fn send_message(
            &self,
            chat_id: &str,
            text: &str,
            _markdown: bool,
        ) -> Result<(), TelegramError> {
            if self.fail {
                return Err(TelegramError::Api("chat not found".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn invoice() -> Invoice {
        let now = Utc::now();
        NewInvoice {
            client_name: "Acme Corp".to_string(),
            client_email: "billing@acme.example".to_string(),
            client_address: None,
            items: vec![NewInvoiceItem {
                description: "Design".to_string(),
                quantity: 1,
                unit_price: 100.0,
                amount: 100.0,
            }],
            notes: None,
            terms: None,
            due_date: now + Duration::days(30),
            payment_address: None,
            payment_token_type: None,
            draft: false,
        }
        .validate()
        .unwrap()
        .into_invoice(OwnerId::new(), now)
    }

    #[tokio::test]
    async fn configured_notifier_delivers_to_the_chat() {
        let transport = Arc::new(RecordingTransport::new(false));
        let notifier = Notifier::new(Some(transport.clone()), Some("42".to_string()));

        assert!(notifier.invoice_created(&invoice()).await);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "42");
        assert!(sent[0].1.contains("New Invoice Created"));
    }

    #[tokio::test]
    async fn unconfigured_notifier_reports_false_without_erroring() {
        let notifier = Notifier::disabled();
        assert!(!notifier.invoice_created(&invoice()).await);
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let transport = Arc::new(RecordingTransport::new(true));
        let notifier = Notifier::new(Some(transport), Some("42".to_string()));

        // The failure is logged and reported as false; it never propagates.
        assert!(!notifier.invoice_paid(&invoice()).await);
    }
}
