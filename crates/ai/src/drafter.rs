use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::draft::{DraftError, InvoiceDraft};

/// Boundary for AI invoice generation.
#[async_trait]
pub trait InvoiceDrafter: Send + Sync {
    async fn draft(&self, prompt: &str) -> Result<InvoiceDraft, DraftError>;
}

/// Draft an invoice, swallowing any generation failure.
///
/// Failures are logged and replaced with the deterministic placeholder draft;
/// the caller never sees an error from this path.
pub async fn draft_or_fallback(
    drafter: &dyn InvoiceDrafter,
    prompt: &str,
    now: DateTime<Utc>,
) -> InvoiceDraft {
    match drafter.draft(prompt).await {
        Ok(draft) => draft,
        Err(e) => {
            tracing::warn!("invoice drafting failed, using fallback: {e}");
            InvoiceDraft::fallback(now)
        }
    }
}

/// Drafter that replays canned drafts (dev/tests).
///
/// Drafts are consumed in order; once exhausted it reports itself
/// unconfigured, which exercises the fallback path.
#[derive(Debug, Default)]
pub struct ScriptedDrafter {
    drafts: Mutex<Vec<InvoiceDraft>>,
}

impl ScriptedDrafter {
    pub fn new(drafts: Vec<InvoiceDraft>) -> Self {
        Self {
            drafts: Mutex::new(drafts),
        }
    }
}

#[async_trait]
impl InvoiceDrafter for ScriptedDrafter {
    async fn draft(&self, _prompt: &str) -> Result<InvoiceDraft, DraftError> {
        let mut drafts = self
            .drafts
            .lock()
            .map_err(|_| DraftError::Upstream("drafter state poisoned".to_string()))?;
        if drafts.is_empty() {
            return Err(DraftError::NotConfigured);
        }
        Ok(drafts.remove(0))
    }
}
