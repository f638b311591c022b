use chainvoice_api::app::services::AppConfig;
use chainvoice_core::OwnerId;

#[tokio::main]
async fn main() {
    chainvoice_observability::init();

    let mut config = AppConfig::from_env();
    if config.dev_owner.is_none() {
        let owner = OwnerId::new();
        tracing::warn!("CHAINVOICE_DEV_OWNER not set; using ephemeral dev owner {owner}");
        config.dev_owner = Some(owner);
    }

    let app = chainvoice_api::app::build_app(config).await;

    let addr =
        std::env::var("CHAINVOICE_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
