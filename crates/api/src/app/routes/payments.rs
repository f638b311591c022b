use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use chainvoice_infra::InvoiceStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(initiate_payment))
        .route("/validate", post(validate_payment))
        .route("/sweep", post(sweep_unreconciled))
}

/// Record a user-submitted payment claim: writes the transaction, settles the
/// invoice, and reports the new transaction id.
pub async fn initiate_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::InitiatePaymentRequest>,
) -> axum::response::Response {
    let claim = match body.into_claim() {
        Ok(claim) => claim,
        Err(resp) => return resp,
    };
    let invoice_id = claim.invoice_id;

    let transaction = match services
        .reconciler()
        .initiate_payment(owner.owner_id(), claim, Utc::now())
        .await
    {
        Ok(transaction) => transaction,
        Err(e) => return errors::reconcile_error_to_response(e),
    };

    services.signal_refresh(owner.owner_id(), "invoices");
    services.signal_refresh(owner.owner_id(), "transactions");
    services.notify_transaction_recorded(transaction.clone());
    if let Ok(invoice) = services.invoices().get(owner.owner_id(), invoice_id).await {
        services.notify_invoice_paid(invoice);
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "transaction_id": transaction.id.to_string(),
        })),
    )
        .into_response()
}

/// Simulated verification of a claimed payment (the hash is trusted).
pub async fn validate_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::ValidatePaymentRequest>,
) -> axum::response::Response {
    let invoice_id = match dto::parse_invoice_id(&body.invoice_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .reconciler()
        .validate_payment(owner.owner_id(), invoice_id, &body.transaction_hash)
        .await
    {
        Ok(verified) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "verified": verified })),
        )
            .into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

/// Recovery endpoint for the partial-failure window: re-applies the paid
/// transition for confirmed transactions whose invoice never settled.
pub async fn sweep_unreconciled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services
        .reconciler()
        .sweep_unreconciled(owner.owner_id(), Utc::now())
        .await
    {
        Ok(repaired) => {
            if !repaired.is_empty() {
                services.signal_refresh(owner.owner_id(), "invoices");
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "repaired": repaired.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                })),
            )
                .into_response()
        }
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::{build_services, AppConfig};
    use chainvoice_core::OwnerId;
    use chainvoice_infra::{InvoiceStore, TransactionStore};
    use chainvoice_invoicing::{InvoiceStatus, NewInvoice, NewInvoiceItem};
    use chrono::Duration;

    async fn seeded_invoice(services: &Arc<AppServices>, owner: OwnerId) -> chainvoice_core::InvoiceId {
        services
            .invoices()
            .create(
                owner,
                NewInvoice {
                    client_name: "Acme".to_string(),
                    client_email: "a@b.co".to_string(),
                    client_address: None,
                    items: vec![NewInvoiceItem {
                        description: "Design".to_string(),
                        quantity: 2,
                        unit_price: 50.0,
                        amount: 100.0,
                    }],
                    notes: None,
                    terms: None,
                    due_date: Utc::now() + Duration::days(30),
                    payment_address: Some(format!("0x{}", "b".repeat(40))),
                    payment_token_type: None,
                    draft: false,
                }
                .validate()
                .unwrap(),
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }

    fn claim_body(invoice_id: &str) -> dto::InitiatePaymentRequest {
        serde_json::from_value(serde_json::json!({
            "invoice_id": invoice_id,
            "from_address": format!("0x{}", "a".repeat(40)),
            "hash": format!("0x{}", "d".repeat(64)),
            "network_id": 1,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn initiating_a_payment_settles_the_invoice() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(OwnerId::new());
        let invoice_id = seeded_invoice(&services, owner.owner_id()).await;

        let response = initiate_payment(
            Extension(services.clone()),
            Extension(owner),
            Json(claim_body(&invoice_id.to_string())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let invoice = services
            .invoices()
            .get(owner.owner_id(), invoice_id)
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(
            services
                .transactions()
                .list(owner.owner_id())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn claims_for_unknown_invoices_create_nothing() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(OwnerId::new());

        let response = initiate_payment(
            Extension(services.clone()),
            Extension(owner),
            Json(claim_body(&chainvoice_core::InvoiceId::new().to_string())),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(services
            .transactions()
            .list(owner.owner_id())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn sweep_reports_an_empty_list_when_consistent() {
        let services = Arc::new(build_services(&AppConfig::default()).await);
        let owner = OwnerContext::new(OwnerId::new());
        let invoice_id = seeded_invoice(&services, owner.owner_id()).await;

        initiate_payment(
            Extension(services.clone()),
            Extension(owner),
            Json(claim_body(&invoice_id.to_string())),
        )
        .await;

        let response =
            sweep_unreconciled(Extension(services.clone()), Extension(owner)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
