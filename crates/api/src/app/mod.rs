//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (stores, reconciler, analytics,
//!   outbound transports, refresh channel)
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: services::AppConfig) -> Router {
    let auth_state = middleware::AuthState {
        default_owner: config.dev_owner,
    };

    let services = Arc::new(services::build_services(&config).await);

    // Protected routes: require an owner context.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // The Telegram webhook is called by Telegram itself, not by a user agent.
    let webhooks = Router::new()
        .route(
            "/webhooks/telegram",
            post(routes::telegram::receive_update).get(routes::telegram::banner),
        )
        .layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(webhooks)
        .merge(protected)
        .layer(ServiceBuilder::new())
}
