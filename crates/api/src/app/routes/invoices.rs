use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use chainvoice_infra::InvoiceStore;
use chainvoice_invoicing::InvoiceStatus;
use chainvoice_notify::{
    invoice_email, payment_confirmation_email, DocumentRenderer, EmailAttachment, EmailTransport,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/:id", get(get_invoice).delete(delete_invoice))
        .route("/:id/status", post(update_invoice_status))
        .route("/:id/pay", post(mark_invoice_paid))
        .route("/:id/email", post(send_invoice_email))
        .route("/:id/document", get(download_invoice_document))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> axum::response::Response {
    let input = match body.into_new_invoice() {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    let valid = match input.validate() {
        Ok(valid) => valid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let invoice = match services
        .invoices()
        .create(owner.owner_id(), valid, Utc::now())
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => return errors::store_error_to_response(e, "Invoice"),
    };

    services.signal_refresh(owner.owner_id(), "invoices");
    services.notify_invoice_created(invoice.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "id": invoice.id.to_string(),
            "invoice": dto::invoice_to_json(&invoice),
        })),
    )
        .into_response()
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services.invoices().list(owner.owner_id()).await {
        Ok(invoices) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "invoices": invoices.iter().map(dto::invoice_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e, "Invoices"),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.invoices().get(owner.owner_id(), id).await {
        Ok(invoice) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "invoice": dto::invoice_to_json(&invoice),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e, "Invoice"),
    }
}

pub async fn update_invoice_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status: InvoiceStatus = match body.status.parse() {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let invoice = match services
        .invoices()
        .update_status(owner.owner_id(), id, status, Utc::now())
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => return errors::store_error_to_response(e, "Invoice"),
    };

    services.signal_refresh(owner.owner_id(), "invoices");
    if status == InvoiceStatus::Overdue {
        services.notify_invoice_overdue(invoice.clone());
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "invoice": dto::invoice_to_json(&invoice),
        })),
    )
        .into_response()
}

/// Direct mark-paid path: sets status, paid_at, and the transaction hash in
/// one step without recording a transaction (the payments flow does both).
pub async fn mark_invoice_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MarkPaidRequest>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if body.transaction_hash.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "Transaction hash is required");
    }

    let invoice = match services
        .invoices()
        .mark_paid(owner.owner_id(), id, &body.transaction_hash, Utc::now())
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => return errors::store_error_to_response(e, "Invoice"),
    };

    services.signal_refresh(owner.owner_id(), "invoices");
    services.notify_invoice_paid(invoice.clone());

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "invoice": dto::invoice_to_json(&invoice),
        })),
    )
        .into_response()
}

pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.invoices().delete(owner.owner_id(), id).await {
        Ok(()) => {
            services.signal_refresh(owner.owner_id(), "invoices");
            (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "Invoice"),
    }
}

pub async fn send_invoice_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SendEmailRequest>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if body.sender_name.trim().is_empty() || !body.sender_email.contains('@') {
        return errors::json_error(StatusCode::BAD_REQUEST, "Invalid sender");
    }

    let invoice = match services.invoices().get(owner.owner_id(), id).await {
        Ok(invoice) => invoice,
        Err(e) => return errors::store_error_to_response(e, "Invoice"),
    };

    let now = Utc::now();
    let message = match body.email_type.as_str() {
        "invoice" => {
            let attachment = body.attach_document.then(|| {
                let renderer = services.renderer();
                EmailAttachment {
                    filename: renderer.filename(&invoice),
                    content_type: renderer.content_type().to_string(),
                    content: renderer.render(&invoice, now),
                }
            });
            invoice_email(&invoice, &body.sender_name, &body.sender_email, attachment, now)
        }
        "payment" => {
            // Confirmations only make sense for settled invoices.
            if invoice.status != InvoiceStatus::Paid {
                return errors::json_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Cannot send payment confirmation for unpaid invoice",
                );
            }
            payment_confirmation_email(&invoice, &body.sender_name, &body.sender_email, now)
        }
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "email_type must be \"invoice\" or \"payment\"",
            )
        }
    };

    match services.email().send(message).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message_id": receipt.message_id,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("invoice email failed: {e}");
            errors::json_error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

pub async fn download_invoice_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let invoice = match services.invoices().get(owner.owner_id(), id).await {
        Ok(invoice) => invoice,
        Err(e) => return errors::store_error_to_response(e, "Invoice"),
    };

    let renderer = services.renderer();
    let bytes = renderer.render(&invoice, Utc::now());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, renderer.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", renderer.filename(&invoice)),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::{build_services, AppConfig};
    use chainvoice_infra::InvoiceStore;

    fn create_body(due_date: &str) -> dto::CreateInvoiceRequest {
        serde_json::from_value(serde_json::json!({
            "client_name": "Acme Corp",
            "client_email": "billing@acme.example",
            "items": [
                { "description": "Design", "quantity": 2, "unit_price": 50.0, "amount": 100.0 }
            ],
            "due_date": due_date,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(chainvoice_core::OwnerId::new());

        let response = create_invoice(
            Extension(services.clone()),
            Extension(owner),
            Json(create_body("2026-12-01T00:00:00Z")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let invoices = services.invoices().list(owner.owner_id()).await.unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].total_amount, 100.0);

        let response = get_invoice(
            Extension(services.clone()),
            Extension(owner),
            Path(invoices[0].id.to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_items_fail_with_field_errors() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(chainvoice_core::OwnerId::new());

        let body: dto::CreateInvoiceRequest = serde_json::from_value(serde_json::json!({
            "client_name": "",
            "client_email": "nope",
            "items": [],
            "due_date": "2026-12-01T00:00:00Z",
        }))
        .unwrap();

        let response = create_invoice(Extension(services), Extension(owner), Json(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_invoice_is_not_found() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(chainvoice_core::OwnerId::new());

        let response = get_invoice(
            Extension(services),
            Extension(owner),
            Path(chainvoice_core::InvoiceId::new().to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payment_confirmation_requires_a_paid_invoice() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(chainvoice_core::OwnerId::new());

        create_invoice(
            Extension(services.clone()),
            Extension(owner),
            Json(create_body("2026-12-01T00:00:00Z")),
        )
        .await;
        let invoices = services.invoices().list(owner.owner_id()).await.unwrap();
        let invoice = &invoices[0];

        let body: dto::SendEmailRequest = serde_json::from_value(serde_json::json!({
            "sender_name": "Studio",
            "sender_email": "studio@example.com",
            "email_type": "payment",
        }))
        .unwrap();

        let response = send_invoice_email(
            Extension(services.clone()),
            Extension(owner),
            Path(invoice.id.to_string()),
            Json(body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn document_download_sets_attachment_headers() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(chainvoice_core::OwnerId::new());

        create_invoice(
            Extension(services.clone()),
            Extension(owner),
            Json(create_body("2026-12-01T00:00:00Z")),
        )
        .await;
        let invoices = services.invoices().list(owner.owner_id()).await.unwrap();
        let invoice = &invoices[0];

        let response = download_invoice_document(
            Extension(services.clone()),
            Extension(owner),
            Path(invoice.id.to_string()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.contains(&invoice.number));
    }
}
