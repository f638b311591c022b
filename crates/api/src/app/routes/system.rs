use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::{owner_sse_stream, AppServices};
use crate::context::OwnerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(owner): Extension<OwnerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "owner_id": owner.owner_id().to_string(),
    }))
}

/// SSE stream of refresh signals for the requesting owner.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> impl IntoResponse {
    owner_sse_stream(services, owner.owner_id())
}
