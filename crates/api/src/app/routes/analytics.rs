use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub fn router() -> Router {
    Router::new()
        .route("/invoices", get(invoice_stats))
        .route("/transactions", get(transaction_stats))
        .route("/status-distribution", get(status_distribution))
        .route("/network-distribution", get(network_distribution))
        .route("/monthly-revenue", get(monthly_revenue))
        .route("/top-clients", get(top_clients))
}

pub async fn invoice_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services.analytics().invoice_stats(owner.owner_id()).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "stats": stats })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}

pub async fn transaction_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services.analytics().transaction_stats(owner.owner_id()).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "stats": stats })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}

pub async fn status_distribution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services
        .analytics()
        .payment_status_distribution(owner.owner_id())
        .await
    {
        Ok(data) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": data })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}

pub async fn network_distribution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services
        .analytics()
        .network_distribution(owner.owner_id())
        .await
    {
        Ok(data) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": data })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}

pub async fn monthly_revenue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Query(query): Query<dto::MonthlyRevenueQuery>,
) -> axum::response::Response {
    match services
        .analytics()
        .monthly_revenue(owner.owner_id(), query.months, Utc::now())
        .await
    {
        Ok(data) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": data })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}

pub async fn top_clients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Query(query): Query<dto::TopClientsQuery>,
) -> axum::response::Response {
    match services
        .analytics()
        .top_clients(owner.owner_id(), query.limit)
        .await
    {
        Ok(clients) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "clients": clients })),
        )
            .into_response(),
        Err(e) => errors::analytics_error_to_response(e),
    }
}
