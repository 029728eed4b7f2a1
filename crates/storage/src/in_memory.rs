//! In-memory repository, useful for tests and ephemeral sessions.

use async_trait::async_trait;
use bentofolio_core::error::StoreError;
use bentofolio_core::portfolio::PortfolioState;
use bentofolio_core::repository::PortfolioRepository;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Keeps portfolio documents in a map keyed by identity.
pub struct InMemoryRepository {
    documents: Arc<RwLock<HashMap<String, PortfolioState>>>,
    reject_saves: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            reject_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail, to exercise error paths.
    pub fn set_reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryRepository {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, identity: &str) -> Result<Option<PortfolioState>, StoreError> {
        Ok(self.documents.read().await.get(identity).cloned())
    }

    async fn save(&self, identity: &str, state: &PortfolioState) -> Result<(), StoreError> {
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Save("in-memory repository is rejecting saves".into()));
        }
        self.documents
            .write()
            .await
            .insert(identity.to_string(), state.clone());
        Ok(())
    }
}
