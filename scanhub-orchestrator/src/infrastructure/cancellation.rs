//! Per-job cancellation tokens

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Maps live job ids to the token their adapters watch.
///
/// A token is registered at submission and removed once the job is terminal.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) token for a job
    pub async fn register(&self, job_id: Uuid) -> CancellationToken {
        self.tokens
            .lock()
            .await
            .entry(job_id)
            .or_default()
            .clone()
    }

    pub async fn token(&self, job_id: Uuid) -> Option<CancellationToken> {
        self.tokens.lock().await.get(&job_id).cloned()
    }

    /// Trigger a job's token. Returns false when the job has no live token.
    /// Repeated calls are harmless.
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        match self.tokens.lock().await.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live job, used on shutdown
    pub async fn cancel_all(&self) -> usize {
        let tokens = self.tokens.lock().await;
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    pub async fn remove(&self, job_id: Uuid) {
        self.tokens.lock().await.remove(&job_id);
    }

    /// Jobs that have not reached a terminal state yet
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let token = registry.register(id).await;

        assert!(registry.cancel(id).await);
        assert!(registry.cancel(id).await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_register_returns_same_token() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let first = registry.register(id).await;
        let second = registry.register(id).await;
        first.cancel();
        assert!(second.is_cancelled());
    }

    #[tokio::test]
    async fn test_removed_job_cannot_be_cancelled() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id).await;
        registry.remove(id).await;

        assert!(!registry.cancel(id).await);
        assert!(registry.token(id).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let registry = CancellationRegistry::new();
        let a = registry.register(Uuid::new_v4()).await;
        let b = registry.register(Uuid::new_v4()).await;

        assert_eq!(registry.cancel_all().await, 2);
        assert!(a.is_cancelled() && b.is_cancelled());
    }
}
