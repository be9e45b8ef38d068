use chrono::{DateTime, Local};

use super::notifications::Kind;

const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub message: String,
    pub kind: Kind,
    pub timestamp: DateTime<Local>,
}

/// Removed notifications, newest first.
#[derive(Default)]
pub struct DismissalHistory {
    pub entries: Vec<HistoryEntry>,
}

impl DismissalHistory {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, message: impl Into<String>, kind: Kind) {
        self.entries.insert(
            0,
            HistoryEntry { message: message.into(), kind, timestamp: Local::now() },
        );
        self.entries.truncate(MAX_ENTRIES);
    }
}
