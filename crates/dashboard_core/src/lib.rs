use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ProcessId, ProcessRecord},
    protocol::{DashboardSnapshot, ProcessoFields},
};
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

mod aggregate;
mod reconcile;

pub use aggregate::{completion_rate, compute_snapshot};
pub use reconcile::{after_mutation, find_by_id, MutationOutcome};

const NOTICE_CHANNEL_CAPACITY: usize = 16;

/// Persistence collaborator seam. The session only ever talks to the store
/// through this trait; lifecycle of the concrete handle belongs to the
/// application entry point.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Unordered full collection. May fail; the session decides policy.
    async fn fetch_all(&self) -> Result<Vec<ProcessRecord>>;
    /// Persists a new processo, assigning its id and entry date.
    async fn create(&self, fields: ProcessoFields) -> Result<ProcessId>;
    /// Rewrites the mutable fields of an existing processo. `false` when no
    /// row carries the id. Never touches the entry date.
    async fn update(&self, id: ProcessId, fields: ProcessoFields) -> Result<bool>;
}

/// Non-blocking, user-visible outcome reports. Failures are absorbed at
/// this boundary and surfaced here instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A fetch failed; the dashboard rendered an empty collection.
    ConnectionLost,
    Saved {
        created: bool,
    },
    SaveFailed {
        /// Best-effort distinction for user messaging; `true` when the
        /// store error looks like a permission denial.
        permission: bool,
    },
}

/// Holds the latest computed snapshot and drives the fetch → aggregate →
/// present cycle. Writes go through [`save`](Self::save), which enforces
/// the full-refresh-on-success / no-touch-on-failure contract.
pub struct DashboardSession {
    store: Arc<dyn ProcessStore>,
    state: RwLock<DashboardSnapshot>,
    notices: broadcast::Sender<Notice>,
}

impl DashboardSession {
    pub fn new(store: Arc<dyn ProcessStore>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            store,
            state: RwLock::new(DashboardSnapshot::default()),
            notices,
        }
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Latest computed snapshot without touching the store.
    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().await.clone()
    }

    /// Re-fetches the full collection and recomputes the snapshot. A fetch
    /// failure is reported and rendered as an empty collection; it never
    /// propagates.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let processos = match self.store.fetch_all().await {
            Ok(processos) => processos,
            Err(error) => {
                warn!(%error, "fetch failed; rendering empty collection");
                let _ = self.notices.send(Notice::ConnectionLost);
                Vec::new()
            }
        };
        let snapshot = compute_snapshot(processos);
        *self.state.write().await = snapshot.clone();
        snapshot
    }

    /// Creates (no id) or updates (id present) a processo. Returns whether
    /// the write succeeded; on failure the current snapshot is left exactly
    /// as it was and only a notice is emitted.
    pub async fn save(&self, id: Option<ProcessId>, fields: ProcessoFields) -> bool {
        let attempt = match id {
            Some(id) => self.store.update(id, fields).await,
            None => self.store.create(fields).await.map(|_| true),
        };

        match attempt {
            Ok(true) => {
                self.reconcile(MutationOutcome::Saved).await;
                let _ = self.notices.send(Notice::Saved {
                    created: id.is_none(),
                });
                true
            }
            Ok(false) => {
                warn!(id = ?id, "update targeted a processo that no longer exists");
                let _ = self.notices.send(Notice::SaveFailed { permission: false });
                false
            }
            Err(error) => {
                warn!(%error, "save failed; keeping rendered state");
                let _ = self.notices.send(Notice::SaveFailed {
                    permission: is_permission_error(&error),
                });
                false
            }
        }
    }

    /// Resolves a record for the edit form: re-fetches, then scans the
    /// fresh collection. `None` means the form must not open.
    pub async fn processo_for_edit(&self, id: ProcessId) -> Option<ProcessRecord> {
        let snapshot = self.refresh().await;
        find_by_id(&snapshot.processos, id).cloned()
    }

    async fn reconcile(&self, outcome: MutationOutcome) {
        let current = self.state.read().await.processos.clone();
        match after_mutation(self.store.as_ref(), outcome, current).await {
            Ok(processos) => {
                *self.state.write().await = compute_snapshot(processos);
            }
            Err(error) => {
                warn!(%error, "refresh after save failed; rendering empty collection");
                let _ = self.notices.send(Notice::ConnectionLost);
                *self.state.write().await = compute_snapshot(Vec::new());
            }
        }
    }
}

fn is_permission_error(err: &anyhow::Error) -> bool {
    let rendered = err.to_string().to_ascii_lowercase();
    rendered.contains("permission") || rendered.contains("forbidden") || rendered.contains("denied")
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
