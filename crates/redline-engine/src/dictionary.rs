//! Three-way reconciliation between the local personal dictionary and the
//! checker account's server-side word list.
//!
//! The last synchronized snapshot acts as the common ancestor. A word's
//! presence or absence on either side is compared against that snapshot so
//! deletions propagate instead of resurrecting on the next sync.

use std::collections::BTreeSet;

use crate::error::EngineError;

/// The set operations a reconciliation run will perform, computed up front
/// so callers can inspect or log them before any network traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Words to push to the server (new locally since the snapshot).
    pub add_remote: BTreeSet<String>,
    /// Words to delete from the server (removed locally since the snapshot).
    pub delete_remote: BTreeSet<String>,
    /// The dictionary both sides converge on.
    pub merged: BTreeSet<String>,
}

impl MergePlan {
    /// Three-way merge: an addition on either side wins over absence, and a
    /// deletion on either side wins over snapshot presence. A word survives
    /// only if some side added it since the snapshot, or it was in the
    /// snapshot and neither side deleted it.
    pub fn compute(
        last_synced: &BTreeSet<String>,
        local: &BTreeSet<String>,
        remote: &BTreeSet<String>,
    ) -> Self {
        let locally_added: BTreeSet<String> =
            local.difference(last_synced).cloned().collect();
        let locally_deleted: BTreeSet<String> =
            last_synced.difference(local).cloned().collect();
        let remotely_added: BTreeSet<String> =
            remote.difference(last_synced).cloned().collect();
        let remotely_deleted: BTreeSet<String> =
            last_synced.difference(remote).cloned().collect();

        let mut merged: BTreeSet<String> = last_synced
            .iter()
            .filter(|w| !locally_deleted.contains(*w) && !remotely_deleted.contains(*w))
            .cloned()
            .collect();
        merged.extend(locally_added.iter().cloned());
        merged.extend(remotely_added.iter().cloned());

        // Only push what the server does not already have, and only delete
        // what it still holds.
        let add_remote = merged.difference(remote).cloned().collect();
        let delete_remote = remote.difference(&merged).cloned().collect();

        Self {
            add_remote,
            delete_remote,
            merged,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.add_remote.is_empty() && self.delete_remote.is_empty()
    }
}

/// The server-side word list operations reconciliation needs. Implemented
/// by the HTTP checker client; test doubles implement it in memory.
pub trait RemoteDictionary {
    fn list_words(&self) -> impl Future<Output = Result<BTreeSet<String>, EngineError>> + Send;
    fn add_word(&self, word: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
    fn delete_word(&self, word: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
}

impl RemoteDictionary for redline_check::CheckerClient {
    async fn list_words(&self) -> Result<BTreeSet<String>, EngineError> {
        let words = redline_check::CheckerClient::list_words(self).await?;
        Ok(words.into_iter().collect())
    }

    async fn add_word(&self, word: &str) -> Result<(), EngineError> {
        redline_check::CheckerClient::add_word(self, word)
            .await
            .map_err(|e| EngineError::DictionarySync {
                word: word.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn delete_word(&self, word: &str) -> Result<(), EngineError> {
        redline_check::CheckerClient::delete_word(self, word)
            .await
            .map_err(|e| EngineError::DictionarySync {
                word: word.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The converged dictionary; becomes both the local list and the next
    /// snapshot.
    pub merged: BTreeSet<String>,
    /// Whether any word moved in either direction. Deliberately stricter
    /// than a size comparison: a same-size content change (one word deleted,
    /// another pulled in) still needs the local list and snapshot persisted.
    pub changed: bool,
}

/// Run one reconciliation against a remote word list.
///
/// Remote mutations run sequentially. A failure aborts the run without
/// rolling back mutations already applied; the aborted state is safe because
/// the snapshot is only advanced by the caller after success, so the next
/// run recomputes a plan from honest observations and converges.
pub async fn reconcile<R: RemoteDictionary>(
    remote: &R,
    last_synced: &BTreeSet<String>,
    local: &BTreeSet<String>,
) -> Result<SyncOutcome, EngineError> {
    let remote_words = remote.list_words().await?;
    let plan = MergePlan::compute(last_synced, local, &remote_words);
    tracing::debug!(
        target: "redline::dictionary",
        add = plan.add_remote.len(),
        delete = plan.delete_remote.len(),
        "computed merge plan"
    );

    for word in &plan.delete_remote {
        remote.delete_word(word).await?;
    }
    for word in &plan.add_remote {
        remote.add_word(word).await?;
    }

    let changed = !plan.is_noop() || plan.merged != *local;
    Ok(SyncOutcome {
        merged: plan.merged,
        changed,
    })
}
