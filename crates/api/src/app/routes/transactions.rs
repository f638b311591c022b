use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use chainvoice_core::TransactionId;
use chainvoice_infra::{InvoiceStore, TransactionStore};
use chainvoice_payments::TransactionStatus;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_transaction).get(list_transactions))
        .route("/track", post(track_transaction))
        .route("/:id", get(get_transaction))
        .route("/:id/status", post(update_transaction_status))
}

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::CreateTransactionRequest>,
) -> axum::response::Response {
    let input = match body.into_new_transaction() {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    let valid = match input.validate() {
        Ok(valid) => valid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let now = Utc::now();
    let transaction = match services
        .transactions()
        .create(owner.owner_id(), valid, now)
        .await
    {
        Ok(transaction) => transaction,
        Err(e) => return errors::store_error_to_response(e, "Transaction"),
    };

    // A transaction that references an invoice settles it. Failures here are
    // logged, not surfaced: the transaction write already succeeded.
    if let Some(invoice_id) = transaction.invoice_id {
        match services
            .invoices()
            .mark_paid(owner.owner_id(), invoice_id, &transaction.hash, now)
            .await
        {
            Ok(invoice) => {
                services.signal_refresh(owner.owner_id(), "invoices");
                services.notify_invoice_paid(invoice);
            }
            Err(e) => {
                tracing::warn!(invoice_id = %invoice_id, "mark-paid after transaction create failed: {e}");
            }
        }
    }

    services.signal_refresh(owner.owner_id(), "transactions");
    services.notify_transaction_recorded(transaction.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "id": transaction.id.to_string(),
            "transaction": dto::transaction_to_json(&transaction),
        })),
    )
        .into_response()
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services.transactions().list(owner.owner_id()).await {
        Ok(transactions) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "transactions": transactions.iter().map(dto::transaction_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e, "Transactions"),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid transaction id"),
    };

    match services.transactions().get(owner.owner_id(), id).await {
        Ok(transaction) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "transaction": dto::transaction_to_json(&transaction),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e, "Transaction"),
    }
}

pub async fn update_transaction_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let id: TransactionId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid transaction id"),
    };
    let status: TransactionStatus = match body.status.parse() {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .transactions()
        .update_status(owner.owner_id(), id, status)
        .await
    {
        Ok(transaction) => {
            services.signal_refresh(owner.owner_id(), "transactions");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "transaction": dto::transaction_to_json(&transaction),
                })),
            )
                .into_response()
        }
        Err(e) => errors::store_error_to_response(e, "Transaction"),
    }
}

/// Track a wallet transaction by hash without duplicating an existing record.
pub async fn track_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::TrackTransactionRequest>,
) -> axum::response::Response {
    if body.hash.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "Transaction hash is required");
    }

    match services
        .reconciler()
        .track_wallet_transaction(owner.owner_id(), &body.hash, body.network_id, Utc::now())
        .await
    {
        Ok(tracked) => {
            if !tracked.already_tracked {
                services.signal_refresh(owner.owner_id(), "transactions");
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "exists": tracked.already_tracked,
                    "transaction": dto::transaction_to_json(&tracked.transaction),
                })),
            )
                .into_response()
        }
        Err(e) => errors::reconcile_error_to_response(e),
    }
}
