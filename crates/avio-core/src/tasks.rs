//! Registry for long-running background operations (series, broadcasts).
//!
//! Every launched run gets an id and a cancellation token so the operator
//! can list in-flight work and stop it; entries remove themselves when the
//! task finishes.

use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct TaskInfo {
    pub id: u64,
    pub label: String,
}

struct TaskEntry {
    label: String,
    token: CancellationToken,
}

#[derive(Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    inner: Mutex<HashMap<u64, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a cancellable background task and track it until completion.
    ///
    /// `make_fut` receives the run's token; the future is responsible for
    /// observing it at its suspension points.
    pub async fn spawn<F, Fut>(self: &Arc<Self>, label: impl Into<String>, make_fut: F) -> u64
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let label = label.into();
        let token = CancellationToken::new();

        let fut = make_fut(token.clone());
        {
            let mut inner = self.inner.lock().await;
            inner.insert(
                id,
                TaskEntry {
                    label: label.clone(),
                    token,
                },
            );
        }

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            fut.await;
            registry.inner.lock().await.remove(&id);
            tracing::debug!(id, label, "background task finished");
        });

        id
    }

    /// Cancel one run. Returns false when the id is unknown (already done).
    pub async fn cancel(&self, id: u64) -> bool {
        let inner = self.inner.lock().await;
        match inner.get(&id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything in flight; returns how many runs were signalled.
    pub async fn cancel_all(&self) -> usize {
        let inner = self.inner.lock().await;
        for entry in inner.values() {
            entry.token.cancel();
        }
        inner.len()
    }

    pub async fn list(&self) -> Vec<TaskInfo> {
        let inner = self.inner.lock().await;
        let mut out: Vec<TaskInfo> = inner
            .iter()
            .map(|(id, e)| TaskInfo {
                id: *id,
                label: e.label.clone(),
            })
            .collect();
        out.sort_by_key(|t| t.id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn tracks_until_completion_and_removes_itself() {
        let registry = Arc::new(TaskRegistry::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let id = registry
            .spawn("series user=1", |_token| async move {
                let _ = rx.await;
            })
            .await;

        assert_eq!(registry.list().await.len(), 1);
        assert_eq!(registry.list().await[0].id, id);

        tx.send(()).unwrap();
        // Let the wrapper task run its removal.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_signals_the_token() {
        let registry = Arc::new(TaskRegistry::new());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<bool>();

        let id = registry
            .spawn("broadcast Russia", |token| async move {
                token.cancelled().await;
                let _ = done_tx.send(true);
            })
            .await;

        assert!(registry.cancel(id).await);
        assert!(done_rx.await.unwrap());
        assert!(!registry.cancel(9999).await);
    }

    #[tokio::test]
    async fn cancel_all_reports_count() {
        let registry = Arc::new(TaskRegistry::new());
        for i in 0..3 {
            registry
                .spawn(format!("run {i}"), |token| async move {
                    token.cancelled().await;
                })
                .await;
        }
        assert_eq!(registry.cancel_all().await, 3);
    }
}
