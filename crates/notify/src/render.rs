//! Invoice document rendering boundary.
//!
//! Consumed by both the email attachment path and the direct-download route.
//! The default implementation renders a standalone HTML document; a PDF
//! backend slots in behind the same trait.

use chrono::{DateTime, Utc};

use chainvoice_invoicing::Invoice;

use crate::email::invoice_email;

pub trait DocumentRenderer: Send + Sync {
    /// Render the invoice to a byte buffer.
    fn render(&self, invoice: &Invoice, now: DateTime<Utc>) -> Vec<u8>;

    fn content_type(&self) -> &'static str;

    fn filename(&self, invoice: &Invoice) -> String;
}

/// Renders the invoice as a self-contained HTML document.
#[derive(Debug, Default)]
pub struct HtmlDocumentRenderer;

impl DocumentRenderer for HtmlDocumentRenderer {
    fn render(&self, invoice: &Invoice, now: DateTime<Utc>) -> Vec<u8> {
        // The email body builder already lays out the full invoice; wrap it
        // into a standalone page.
        let body = invoice_email(invoice, "Chainvoice", "no-reply@chainvoice.local", None, now).html;
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
             <title>Invoice {}</title></head><body>{}</body></html>",
            invoice.number, body
        )
        .into_bytes()
    }

    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn filename(&self, invoice: &Invoice) -> String {
        format!("invoice-{}.html", invoice.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvoice_core::OwnerId;
    use chainvoice_invoicing::{NewInvoice, NewInvoiceItem};
    use chrono::Duration;

    #[test]
    fn rendered_document_is_standalone_html() {
        let now = Utc::now();
        let invoice = NewInvoice {
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
        .into_invoice(OwnerId::new(), now);

        let renderer = HtmlDocumentRenderer;
        let bytes = renderer.render(&invoice, now);
        let html = String::from_utf8(bytes).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(&invoice.number));
        assert_eq!(renderer.filename(&invoice), format!("invoice-{}.html", invoice.number));
    }
}
