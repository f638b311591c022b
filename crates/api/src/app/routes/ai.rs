use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use chainvoice_ai::draft_or_fallback;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/draft", post(draft_invoice))
}

/// Draft an invoice from free-form prompt text.
///
/// Never fails toward the caller: generation errors are replaced by the
/// deterministic placeholder draft.
pub async fn draft_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::DraftInvoiceRequest>,
) -> axum::response::Response {
    if body.prompt.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "Prompt is required");
    }

    let draft = draft_or_fallback(services.drafter().as_ref(), &body.prompt, Utc::now()).await;

    (
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "draft": draft })),
    )
        .into_response()
}
