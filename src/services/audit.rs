use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::AppError;
use crate::models::audit::AuditEvent;
use crate::services::record_store::RecordStore;

#[derive(Debug, Clone)]
pub struct AuditRetry {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for AuditRetry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome counters for audit writes, reported on `/health`.
#[derive(Debug, Default)]
pub struct AuditStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl AuditStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Sender side of the audit worker. Enqueueing never blocks or fails the
/// caller; delivery problems show up in `AuditStats` and the logs.
#[derive(Clone)]
pub struct AuditQueue {
    tx: mpsc::UnboundedSender<AuditEvent>,
    stats: Arc<AuditStats>,
}

pub struct AuditWorker {
    handle: JoinHandle<()>,
}

impl AuditWorker {
    /// Resolves once every `AuditQueue` clone is dropped and the backlog is written.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Audit Worker | task ended abnormally");
        }
    }
}

impl AuditQueue {
    pub fn spawn(store: Arc<dyn RecordStore>, retry: AuditRetry) -> (Self, AuditWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(AuditStats::default());
        let handle = tokio::spawn(run(store, retry, stats.clone(), rx));

        (Self { tx, stats }, AuditWorker { handle })
    }

    pub fn enqueue(&self, event: AuditEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            let err = AppError::AuditWriteFailed("audit worker is not running".to_string());
            tracing::error!(event_id = %event.id, project_id = %event.project_id, error = %err, "Audit | dropped");
        }
    }

    pub fn stats(&self) -> Arc<AuditStats> {
        self.stats.clone()
    }
}

async fn run(
    store: Arc<dyn RecordStore>,
    retry: AuditRetry,
    stats: Arc<AuditStats>,
    mut rx: mpsc::UnboundedReceiver<AuditEvent>,
) {
    tracing::info!("Audit Worker | Started");
    while let Some(event) = rx.recv().await {
        deliver(store.as_ref(), &retry, &stats, &event).await;
    }
    tracing::info!("Audit Worker | Stopped");
}

async fn deliver(store: &dyn RecordStore, retry: &AuditRetry, stats: &AuditStats, event: &AuditEvent) {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match store.insert_audit_event(event).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(event_id = %event.id, attempt, "Audit | written");
                return;
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(event_id = %event.id, attempt, error = %e, "Audit | write failed, retrying");
                sleep(retry.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                let err = AppError::AuditWriteFailed(e.to_string());
                tracing::error!(
                    event_id = %event.id,
                    project_id = %event.project_id,
                    attempts = attempt,
                    error = %err,
                    "Audit | giving up"
                );
                return;
            }
        }
    }
}
