//! Telegram transport, message builders, and webhook command handling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use chainvoice_core::chain_name;
use chainvoice_invoicing::Invoice;
use chainvoice_payments::Transaction;

use crate::format::{format_currency, truncate_address};

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Request(String),

    #[error("telegram api rejected the message: {0}")]
    Api(String),
}

#[async_trait]
pub trait TelegramTransport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
    ) -> Result<(), TelegramError>;
}

/// Telegram Bot API transport (webhook mode; this client only sends).
pub struct BotApiTransport {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl BotApiTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: "https://api.telegram.org".to_string(),
        }
    }

    /// Override the endpoint (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl TelegramTransport for BotApiTransport {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
    ) -> Result<(), TelegramError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if markdown {
            body["parse_mode"] = json!("Markdown");
        }

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.to_string()))?;

        let status = response.status();
        let parsed: BotApiResponse = response
            .json()
            .await
            .map_err(|e| TelegramError::Request(format!("{status}: {e}")))?;

        if !parsed.ok {
            return Err(TelegramError::Api(
                parsed.description.unwrap_or_else(|| status.to_string()),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message builders (Markdown bodies)
// ---------------------------------------------------------------------------

pub fn invoice_created_message(invoice: &Invoice) -> String {
    format!(
        "🧾 *New Invoice Created*\n\n\
         *Invoice:* {}\n\
         *Client:* {}\n\
         *Amount:* {}\n\
         *Due Date:* {}\n\
         *Status:* {}",
        invoice.number,
        invoice.client_name,
        format_currency(invoice.total_amount),
        invoice.due_date.format("%Y-%m-%d"),
        invoice.status.as_str().to_uppercase(),
    )
}

pub fn invoice_paid_message(invoice: &Invoice) -> String {
    let mut message = format!(
        "💰 *Invoice Paid*\n\n\
         *Invoice:* {}\n\
         *Client:* {}\n\
         *Amount:* {}\n\
         *Paid on:* {}\n",
        invoice.number,
        invoice.client_name,
        format_currency(invoice.total_amount),
        invoice
            .paid_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
    );
    if let Some(hash) = invoice.transaction_hash.as_deref() {
        message.push_str(&format!("*Transaction:* {}\n", truncate_address(hash)));
    }
    message
}

pub fn transaction_message(transaction: &Transaction) -> String {
    let mut message = format!(
        "💸 *New Transaction*\n\n\
         *Amount:* {} {}\n\
         *From:* {}\n\
         *To:* {}\n\
         *Network:* {}\n\
         *Status:* {}\n",
        transaction.amount,
        transaction.token_type,
        truncate_address(&transaction.from_address),
        truncate_address(&transaction.to_address),
        chain_name(transaction.network_id),
        transaction.status.as_str().to_uppercase(),
    );
    if let Some(description) = transaction.description.as_deref() {
        message.push_str(&format!("*Description:* {description}\n"));
    }
    message
}

pub fn invoice_overdue_message(invoice: &Invoice, now: DateTime<Utc>) -> String {
    let days_overdue = (now - invoice.due_date).num_days().max(0);
    format!(
        "⚠️ *Invoice Overdue*\n\n\
         *Invoice:* {}\n\
         *Client:* {}\n\
         *Amount:* {}\n\
         *Due Date:* {}\n\
         *Days Overdue:* {}",
        invoice.number,
        invoice.client_name,
        format_currency(invoice.total_amount),
        invoice.due_date.format("%Y-%m-%d"),
        days_overdue,
    )
}

// ---------------------------------------------------------------------------
// Webhook updates
// ---------------------------------------------------------------------------

/// Incoming webhook update (only the fields the bot reacts to).
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Reply text for an incoming bot command.
///
/// `notification_chat_id` is the chat configured to receive notifications;
/// `/status` compares against it.
pub fn webhook_reply(text: &str, chat_id: i64, notification_chat_id: Option<&str>) -> String {
    if text.starts_with("/start") {
        return format!(
            "👋 Welcome to Chainvoice!\n\nYour Chat ID is: `{chat_id}`\n\n\
             Please add this Chat ID to your settings to receive notifications."
        );
    }
    if text.starts_with("/help") {
        return "*Available Commands:*\n\n\
                /start - Get your Chat ID\n\
                /help - Show this help message\n\
                /status - Check if notifications are enabled"
            .to_string();
    }
    if text.starts_with("/status") {
        let enabled = notification_chat_id == Some(chat_id.to_string().as_str());
        return if enabled {
            "✅ Notifications are enabled for this chat".to_string()
        } else {
            "❌ Notifications are not enabled for this chat".to_string()
        };
    }
    "I can send you notifications about invoices and transactions. \
     Type /help to see available commands."
        .to_string()
}
