use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use chainvoice_ai::{GeminiDrafter, InvoiceDrafter, ScriptedDrafter};
use chainvoice_core::OwnerId;
use chainvoice_infra::{
    Analytics, InMemoryInvoiceStore, InMemoryTransactionStore, InvoiceStore, PaymentReconciler,
    TransactionStore,
};
use chainvoice_invoicing::Invoice;
use chainvoice_notify::{
    BotApiTransport, DisabledEmailTransport, DocumentRenderer, EmailTransport,
    HtmlDocumentRenderer, Notifier, TelegramTransport,
};
use chainvoice_payments::Transaction;

/// Runtime configuration, read once from the environment in `main`.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Owner used for requests that arrive without a bearer token.
    pub dev_owner: Option<OwnerId>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            dev_owner: std::env::var("CHAINVOICE_DEV_OWNER")
                .ok()
                .and_then(|s| s.parse().ok()),
            telegram_bot_token: non_empty_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty_env("TELEGRAM_CHAT_ID"),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Refresh signal broadcast to connected dashboards after a successful
/// mutation. A UI hint only, not a consistency mechanism.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RefreshMessage {
    pub owner_id: OwnerId,
    pub topic: String,
}

#[derive(Clone)]
pub struct AppServices {
    invoices: Arc<dyn InvoiceStore>,
    transactions: Arc<dyn TransactionStore>,
    reconciler: PaymentReconciler,
    analytics: Analytics,
    notifier: Notifier,
    email: Arc<dyn EmailTransport>,
    renderer: Arc<dyn DocumentRenderer>,
    drafter: Arc<dyn InvoiceDrafter>,
    telegram: Option<Arc<dyn TelegramTransport>>,
    refresh_tx: broadcast::Sender<RefreshMessage>,
}

pub async fn build_services(config: &AppConfig) -> AppServices {
    #[cfg(feature = "postgres")]
    {
        let use_persistent = std::env::var("USE_PERSISTENT_STORES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);
        if use_persistent {
            return build_persistent_services(config).await;
        }
    }

    let invoices: Arc<dyn InvoiceStore> = Arc::new(InMemoryInvoiceStore::new());
    let transactions: Arc<dyn TransactionStore> = Arc::new(InMemoryTransactionStore::new());
    build_with_stores(config, invoices, transactions)
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: &AppConfig) -> AppServices {
    use chainvoice_infra::store::postgres::{ensure_schema, PgInvoiceStore, PgTransactionStore};

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");
    ensure_schema(&pool).await.expect("failed to ensure schema");

    let invoices: Arc<dyn InvoiceStore> = Arc::new(PgInvoiceStore::new(pool.clone()));
    let transactions: Arc<dyn TransactionStore> = Arc::new(PgTransactionStore::new(pool));
    build_with_stores(config, invoices, transactions)
}

fn build_with_stores(
    config: &AppConfig,
    invoices: Arc<dyn InvoiceStore>,
    transactions: Arc<dyn TransactionStore>,
) -> AppServices {
    // Refresh channel: lossy broadcast, owner-filtered in the SSE handler.
    let (refresh_tx, _refresh_rx) = broadcast::channel::<RefreshMessage>(256);

    let telegram: Option<Arc<dyn TelegramTransport>> = config
        .telegram_bot_token
        .as_deref()
        .map(|token| Arc::new(BotApiTransport::new(token)) as Arc<dyn TelegramTransport>);

    let notifier = Notifier::new(telegram.clone(), config.telegram_chat_id.clone());

    let drafter: Arc<dyn InvoiceDrafter> = match config.gemini_api_key.as_deref() {
        Some(key) => Arc::new(GeminiDrafter::new(key)),
        // No key: an empty scripted drafter, so every draft takes the
        // fallback path instead of erroring.
        None => Arc::new(ScriptedDrafter::default()),
    };

    AppServices {
        reconciler: PaymentReconciler::new(invoices.clone(), transactions.clone()),
        analytics: Analytics::new(invoices.clone(), transactions.clone()),
        invoices,
        transactions,
        notifier,
        email: Arc::new(DisabledEmailTransport),
        renderer: Arc::new(HtmlDocumentRenderer),
        drafter,
        telegram,
        refresh_tx,
    }
}

impl AppServices {
    pub fn invoices(&self) -> &Arc<dyn InvoiceStore> {
        &self.invoices
    }

    pub fn transactions(&self) -> &Arc<dyn TransactionStore> {
        &self.transactions
    }

    pub fn reconciler(&self) -> &PaymentReconciler {
        &self.reconciler
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn email(&self) -> &Arc<dyn EmailTransport> {
        &self.email
    }

    pub fn renderer(&self) -> &Arc<dyn DocumentRenderer> {
        &self.renderer
    }

    pub fn drafter(&self) -> &Arc<dyn InvoiceDrafter> {
        &self.drafter
    }

    pub fn telegram(&self) -> Option<&Arc<dyn TelegramTransport>> {
        self.telegram.as_ref()
    }

    pub fn refresh_tx(&self) -> &broadcast::Sender<RefreshMessage> {
        &self.refresh_tx
    }

    /// Signal connected dashboards that a listing went stale.
    pub fn signal_refresh(&self, owner_id: OwnerId, topic: &str) {
        // Lossy by design; no backpressure on the write path.
        let _ = self.refresh_tx.send(RefreshMessage {
            owner_id,
            topic: topic.to_string(),
        });
    }

    /// Fire-and-forget notification fan-out: spawned so transport latency or
    /// failure can never block or fail the triggering write.
    pub fn notify_invoice_created(&self, invoice: Invoice) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.invoice_created(&invoice).await;
        });
    }

    pub fn notify_invoice_paid(&self, invoice: Invoice) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.invoice_paid(&invoice).await;
        });
    }

    pub fn notify_invoice_overdue(&self, invoice: Invoice) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.invoice_overdue(&invoice, Utc::now()).await;
        });
    }

    pub fn notify_transaction_recorded(&self, transaction: Transaction) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.transaction_recorded(&transaction).await;
        });
    }
}

/// Build an SSE stream of refresh signals for one owner (used by `/stream`).
pub fn owner_sse_stream(
    services: Arc<AppServices>,
    owner_id: OwnerId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.refresh_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.owner_id == owner_id => {
            let data = serde_json::json!({ "kind": "refresh", "topic": m.topic }).to_string();
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_services_build_without_configuration() {
        let services = build_services(&AppConfig::default()).await;
        assert!(services.telegram().is_none());
        assert!(services.notifier().chat_id().is_none());
    }

    #[tokio::test]
    async fn refresh_signals_reach_subscribers() {
        let services = build_services(&AppConfig::default()).await;
        let owner = OwnerId::new();

        let mut rx = services.refresh_tx().subscribe();
        services.signal_refresh(owner, "invoices");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.owner_id, owner);
        assert_eq!(msg.topic, "invoices");
    }
}
