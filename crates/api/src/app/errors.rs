//! Consistent error responses.
//!
//! Every failure surfaces as the uniform envelope
//! `{"success": false, "error": ...}` (or `"errors"` with field-level entries
//! for validation), with a status code matching the failure class. Nothing
//! propagates as an unhandled fault.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use chainvoice_core::{DomainError, FieldError};
use chainvoice_infra::{AnalyticsError, ReconcileError, StoreError};

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(fields: &[FieldError]) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "success": false,
            "errors": fields,
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(fields) => validation_error(&fields),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not found"),
        DomainError::InvariantViolation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, msg),
    }
}

/// `what` names the record class for the 404 message, e.g. "Invoice".
pub fn store_error_to_response(err: StoreError, what: &str) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, format!("{what} not found")),
        StoreError::Backend(msg) => {
            tracing::error!("store failure: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to access {}", what.to_lowercase()))
        }
    }
}

pub fn reconcile_error_to_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Validation(fields) => validation_error(&fields),
        ReconcileError::InvoiceNotFound => json_error(StatusCode::NOT_FOUND, "Invoice not found"),
        ReconcileError::TransactionWrite(e) => {
            tracing::error!("transaction write failed: {e}");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create transaction record",
            )
        }
        // The transaction row persists even though the invoice transition
        // failed; the sweep endpoint is the recovery path.
        ReconcileError::InvoiceUpdateFailed { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record payment")
        }
        ReconcileError::Store(e) => {
            tracing::error!("reconciliation read failed: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to initiate payment")
        }
    }
}

pub fn analytics_error_to_response(err: AnalyticsError) -> axum::response::Response {
    tracing::error!("analytics failure: {err}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "aggregation failed")
}
