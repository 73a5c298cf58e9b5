use anyhow::Result;
use shared::domain::{ProcessId, ProcessRecord};

use crate::ProcessStore;

/// First record carrying the given id, if any. "Not found" is a normal
/// answer, never an error: the edit flow treats it as a no-op.
pub fn find_by_id(processos: &[ProcessRecord], id: ProcessId) -> Option<&ProcessRecord> {
    processos.iter().find(|p| p.id == Some(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Saved,
    Failed,
}

/// Refresh contract after a write attempt. A successful mutation always
/// re-fetches the full collection from the store — never patches the local
/// list — so the rendered summary stays consistent with persisted state. A
/// failed mutation performs no refresh and hands back the collection
/// exactly as it was before the attempt.
pub async fn after_mutation(
    store: &dyn ProcessStore,
    outcome: MutationOutcome,
    current: Vec<ProcessRecord>,
) -> Result<Vec<ProcessRecord>> {
    match outcome {
        MutationOutcome::Saved => store.fetch_all().await,
        MutationOutcome::Failed => Ok(current),
    }
}
