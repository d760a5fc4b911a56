//! Sync outcome and status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one reconciliation pass changed in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Books found in the store that were not cached.
    pub inserted: usize,
    /// Cached books whose content differed from the store.
    pub updated: usize,
    /// Cached books the store no longer reports.
    pub deleted: usize,
    /// Books given a fallback color.
    pub colored: usize,
}

impl SyncReport {
    /// Whether a list showing these books needs a redraw.
    pub fn has_changes(&self) -> bool {
        self.inserted > 0 || self.updated > 0 || self.deleted > 0 || self.colored > 0
    }
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last completed reconciliation.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Books the next commit will write.
    pub pending_count: usize,
    pub account_count: usize,
    pub book_count: usize,
}
