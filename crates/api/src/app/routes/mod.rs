use axum::{routing::get, Router};

pub mod ai;
pub mod analytics;
pub mod invoices;
pub mod payments;
pub mod system;
pub mod telegram;
pub mod transactions;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/invoices", invoices::router())
        .nest("/transactions", transactions::router())
        .nest("/payments", payments::router())
        .nest("/analytics", analytics::router())
        .nest("/ai", ai::router())
}
