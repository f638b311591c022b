//! Email transport boundary and message builders.
//!
//! The transport is a trait so the API layer can run without a configured
//! mail provider; the builders produce the full HTML bodies for the invoice
//! and payment-confirmation emails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use chainvoice_invoicing::Invoice;

use crate::format::format_currency;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailReceipt {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email transport not configured")]
    NotConfigured,

    #[error("email send failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError>;
}

/// Transport used when no mail provider is configured: warns and refuses.
#[derive(Debug, Default)]
pub struct DisabledEmailTransport;

#[async_trait]
impl EmailTransport for DisabledEmailTransport {
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        tracing::warn!(to = %message.to, "email transport not configured, dropping message");
        Err(EmailError::NotConfigured)
    }
}

fn long_date(date: DateTime<Utc>) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Build the invoice email sent to the client, optionally with the rendered
/// invoice document attached.
pub fn invoice_email(
    invoice: &Invoice,
    sender_name: &str,
    sender_email: &str,
    attachment: Option<EmailAttachment>,
    now: DateTime<Utc>,
) -> EmailMessage {
    let mut rows = String::new();
    for item in &invoice.items {
        rows.push_str(&format!(
            "<tr>\
             <td style=\"border: 1px solid #ddd; padding: 10px;\">{}</td>\
             <td style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">{}</td>\
             <td style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">{:.2}</td>\
             <td style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">{:.2}</td>\
             </tr>",
            item.description, item.quantity, item.unit_price, item.amount
        ));
    }

    let client_address = invoice
        .client_address
        .as_deref()
        .map(|a| format!("<p style=\"margin: 0;\">{a}</p>"))
        .unwrap_or_default();

    let notes = invoice
        .notes
        .as_deref()
        .map(|n| {
            format!(
                "<div style=\"margin-bottom: 20px;\">\
                 <p style=\"font-weight: bold; margin-bottom: 5px;\">Notes:</p>\
                 <p style=\"margin: 0;\">{n}</p></div>"
            )
        })
        .unwrap_or_default();

    let terms = invoice
        .terms
        .as_deref()
        .map(|t| {
            format!(
                "<div style=\"margin-bottom: 20px;\">\
                 <p style=\"font-weight: bold; margin-bottom: 5px;\">Terms and Conditions:</p>\
                 <p style=\"margin: 0;\">{t}</p></div>"
            )
        })
        .unwrap_or_default();

    let payment_info = invoice
        .payment_address
        .as_deref()
        .map(|addr| {
            let token = invoice
                .payment_token_type
                .as_deref()
                .map(|t| format!("<p style=\"margin: 0;\">Token: {t}</p>"))
                .unwrap_or_default();
            format!(
                "<div style=\"margin-bottom: 20px; padding: 15px; background-color: #f9f9f9; border-radius: 5px;\">\
                 <p style=\"font-weight: bold; margin-bottom: 5px;\">Payment Information:</p>\
                 <p style=\"margin: 0;\">Payment Address: {addr}</p>{token}</div>"
            )
        })
        .unwrap_or_default();

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <div style=\"text-align: right; padding-bottom: 20px;\">\
         <h2 style=\"color: #333; margin: 0;\">Chainvoice</h2>\
         <p style=\"color: #666; margin: 0;\">Blockchain-Powered Invoicing</p></div>\
         <div style=\"text-align: center; margin-bottom: 30px;\">\
         <h1 style=\"font-size: 24px; color: #333;\">INVOICE</h1></div>\
         <div style=\"margin-bottom: 30px;\">\
         <p style=\"font-weight: bold; margin-bottom: 5px;\">Bill To:</p>\
         <p style=\"margin: 0;\">{client_name}</p>\
         <p style=\"margin: 0;\">{client_email}</p>{client_address}</div>\
         <table style=\"text-align: right; margin-bottom: 30px;\">\
         <tr><td style=\"font-weight: bold; padding-right: 10px;\">Invoice Number:</td><td>{number}</td></tr>\
         <tr><td style=\"font-weight: bold; padding-right: 10px;\">Invoice Date:</td><td>{invoice_date}</td></tr>\
         <tr><td style=\"font-weight: bold; padding-right: 10px;\">Due Date:</td><td>{due_date}</td></tr>\
         <tr><td style=\"font-weight: bold; padding-right: 10px;\">Status:</td><td>{status}</td></tr>\
         </table>\
         <table style=\"width: 100%; border-collapse: collapse; margin-bottom: 30px;\">\
         <thead><tr style=\"background-color: #f2f2f2;\">\
         <th style=\"border: 1px solid #ddd; padding: 10px; text-align: left;\">Description</th>\
         <th style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">Quantity</th>\
         <th style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">Unit Price</th>\
         <th style=\"border: 1px solid #ddd; padding: 10px; text-align: right;\">Amount</th>\
         </tr></thead>\
         <tbody>{rows}</tbody>\
         <tfoot><tr>\
         <td colspan=\"3\" style=\"border: 1px solid #ddd; padding: 10px; text-align: right; font-weight: bold;\">Total:</td>\
         <td style=\"border: 1px solid #ddd; padding: 10px; text-align: right; font-weight: bold;\">{total:.2}</td>\
         </tr></tfoot></table>\
         {notes}{terms}{payment_info}\
         <div style=\"margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; text-align: center; color: #666; font-size: 12px;\">\
         <p>This is an automatically generated email. Please do not reply to this email.</p>\
         <p>Generated by Chainvoice on {generated_on}</p></div></div>",
        client_name = invoice.client_name,
        client_email = invoice.client_email,
        number = invoice.number,
        invoice_date = long_date(invoice.created_at),
        due_date = long_date(invoice.due_date),
        status = invoice.status.label().to_uppercase(),
        total = invoice.total_amount,
        generated_on = long_date(now),
    );

    EmailMessage {
        to: invoice.client_email.clone(),
        from_name: sender_name.to_string(),
        from_email: sender_email.to_string(),
        subject: format!("Invoice #{} from {}", invoice.number, sender_name),
        html,
        attachments: attachment.into_iter().collect(),
    }
}

/// Build the payment-confirmation email for a paid invoice.
pub fn payment_confirmation_email(
    invoice: &Invoice,
    sender_name: &str,
    sender_email: &str,
    now: DateTime<Utc>,
) -> EmailMessage {
    let payment_date = long_date(invoice.paid_at.unwrap_or(now));
    let hash_row = invoice
        .transaction_hash
        .as_deref()
        .map(|h| {
            format!(
                "<tr><td style=\"padding: 8px 0; font-weight: bold;\">Transaction Hash:</td>\
                 <td style=\"padding: 8px 0; word-break: break-all;\">{h}</td></tr>"
            )
        })
        .unwrap_or_default();

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <div style=\"text-align: right; padding-bottom: 20px;\">\
         <h2 style=\"color: #333; margin: 0;\">Chainvoice</h2>\
         <p style=\"color: #666; margin: 0;\">Blockchain-Powered Invoicing</p></div>\
         <div style=\"text-align: center; margin-bottom: 30px;\">\
         <h1 style=\"font-size: 24px; color: #333;\">PAYMENT CONFIRMATION</h1></div>\
         <div style=\"padding: 20px; background-color: #f0f8f0; border-radius: 5px; margin-bottom: 30px;\">\
         <p style=\"font-size: 16px; margin: 0;\">Thank you for your payment! \
         We've received your payment for Invoice #{number}.</p></div>\
         <div style=\"margin-bottom: 30px;\">\
         <h2 style=\"font-size: 18px; margin-bottom: 15px;\">Payment Details</h2>\
         <table style=\"width: 100%;\">\
         <tr><td style=\"padding: 8px 0; font-weight: bold;\">Invoice Number:</td><td style=\"padding: 8px 0;\">{number}</td></tr>\
         <tr><td style=\"padding: 8px 0; font-weight: bold;\">Amount Paid:</td><td style=\"padding: 8px 0;\">{amount}</td></tr>\
         <tr><td style=\"padding: 8px 0; font-weight: bold;\">Payment Date:</td><td style=\"padding: 8px 0;\">{payment_date}</td></tr>\
         {hash_row}</table></div>\
         <div style=\"margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; text-align: center; color: #666; font-size: 12px;\">\
         <p>This is an automatically generated email. Please do not reply to this email.</p>\
         <p>Generated by Chainvoice on {generated_on}</p></div></div>",
        number = invoice.number,
        amount = format_currency(invoice.total_amount),
        payment_date = payment_date,
        generated_on = long_date(now),
    );

    EmailMessage {
        to: invoice.client_email.clone(),
        from_name: sender_name.to_string(),
        from_email: sender_email.to_string(),
        subject: format!("Payment Confirmation for Invoice #{}", invoice.number),
        html,
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvoice_core::OwnerId;
    use chainvoice_invoicing::{NewInvoice, NewInvoiceItem};
    use chrono::Duration;

    fn paid_invoice() -> Invoice {
        let now = Utc::now();
        let mut invoice = NewInvoice {
            client_name: "Acme Corp".to_string(),
            client_email: "billing@acme.example".to_string(),
            client_address: Some("1 Infinite Loop".to_string()),
            items: vec![NewInvoiceItem {
                description: "Design".to_string(),
                quantity: 2,
                unit_price: 50.0,
                amount: 100.0,
            }],
            notes: Some("Thanks!".to_string()),
            terms: Some("Net 30".to_string()),
            due_date: now + Duration::days(30),
            payment_address: Some(format!("0x{}", "c".repeat(40))),
            payment_token_type: Some("ETH".to_string()),
            draft: false,
        }
        .validate()
        .unwrap()
        .into_invoice(OwnerId::new(), now);
        invoice.mark_paid(format!("0x{}", "d".repeat(64)), now);
        invoice
    }

    #[test]
    fn invoice_email_carries_items_and_payment_info() {
        let invoice = paid_invoice();
        let message = invoice_email(&invoice, "Studio", "studio@example.com", None, Utc::now());

        assert_eq!(message.to, invoice.client_email);
        assert!(message.subject.contains(&invoice.number));
        assert!(message.html.contains("Design"));
        assert!(message.html.contains("Payment Address"));
        assert!(message.html.contains("1 Infinite Loop"));
        assert!(message.html.contains("Net 30"));
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn invoice_email_can_attach_a_document() {
        let invoice = paid_invoice();
        let attachment = EmailAttachment {
            filename: format!("invoice-{}.html", invoice.number),
            content_type: "text/html".to_string(),
            content: b"<html></html>".to_vec(),
        };
        let message = invoice_email(
            &invoice,
            "Studio",
            "studio@example.com",
            Some(attachment),
            Utc::now(),
        );
        assert_eq!(message.attachments.len(), 1);
    }

    #[test]
    fn payment_confirmation_includes_hash_and_amount() {
        let invoice = paid_invoice();
        let message =
            payment_confirmation_email(&invoice, "Studio", "studio@example.com", Utc::now());

        assert!(message.subject.contains("Payment Confirmation"));
        assert!(message.html.contains(invoice.transaction_hash.as_deref().unwrap()));
        assert!(message.html.contains("$100.00"));
    }

    #[tokio::test]
    async fn disabled_transport_refuses_without_panicking() {
        let invoice = paid_invoice();
        let message = invoice_email(&invoice, "Studio", "studio@example.com", None, Utc::now());

        let result = DisabledEmailTransport.send(message).await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
