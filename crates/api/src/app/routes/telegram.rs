use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use chainvoice_notify::telegram::webhook_reply;
use chainvoice_notify::{TelegramTransport, TelegramUpdate};

use crate::app::services::AppServices;

pub async fn banner() -> impl IntoResponse {
    (StatusCode::OK, "Chainvoice Telegram Webhook")
}

/// Webhook receiver for bot commands (`/start`, `/help`, `/status`).
///
/// Always answers 200 to Telegram; reply delivery failures are logged only.
pub async fn receive_update(
    Extension(services): Extension<Arc<AppServices>>,
    Json(update): Json<TelegramUpdate>,
) -> impl IntoResponse {
    let Some(message) = update.message else {
        return (StatusCode::OK, "OK");
    };

    let text = message.text.unwrap_or_default();
    let reply = webhook_reply(&text, message.chat.id, services.notifier().chat_id());

    if let Some(telegram) = services.telegram() {
        if let Err(e) = telegram
            .send_message(&message.chat.id.to_string(), &reply, true)
            .await
        {
            tracing::warn!("telegram webhook reply failed: {e}");
        }
    } else {
        tracing::warn!("telegram update received but no bot token configured");
    }

    (StatusCode::OK, "OK")
}
