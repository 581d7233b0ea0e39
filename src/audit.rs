//! Append-only action log for election operations
//!
//! The election reports every successful mutating operation through the
//! [`ActionLogger`] trait. [`ElectionLogger`] is the in-memory implementation:
//! timestamped, sequence-numbered entries behind a mutex so concurrent
//! appends are safe. Entries are mirrored to `tracing` as they arrive.

use crate::{Result, internal_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Default cap on retained entries
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Receiver for human-readable descriptions of election actions
pub trait ActionLogger: Send + Sync {
    fn log_action(&self, message: &str);
}

/// A single audit log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, starting at 1 and never reused
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<LogEntry>,
    next_sequence: u64,
}

/// In-memory audit log
///
/// Once `max_entries` is reached the oldest entries are evicted; sequence
/// numbers keep increasing so gaps reveal eviction.
#[derive(Debug)]
pub struct ElectionLogger {
    state: Mutex<LogState>,
    max_entries: usize,
}

impl ElectionLogger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a logger retaining at most `max_entries` (minimum 1)
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                entries: VecDeque::new(),
                next_sequence: 1,
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry and return a copy of it
    pub fn append(&self, message: impl Into<String>) -> Result<LogEntry> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| internal_error!("Audit log lock poisoned"))?;

        let entry = LogEntry {
            sequence_number: state.next_sequence,
            timestamp: Utc::now(),
            message: message.into(),
        };
        state.next_sequence += 1;

        while state.entries.len() >= self.max_entries {
            state.entries.pop_front();
        }
        state.entries.push_back(entry.clone());

        tracing::info!(sequence = entry.sequence_number, "📝 {}", entry.message);
        Ok(entry)
    }

    /// Snapshot of the retained entries, oldest first
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        let state = self
            .state
            .lock()
            .map_err(|_| internal_error!("Audit log lock poisoned"))?;
        Ok(state.entries.iter().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        let state = self
            .state
            .lock()
            .map_err(|_| internal_error!("Audit log lock poisoned"))?;
        Ok(state.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Export retained entries as a JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries()?)?)
    }
}

impl Default for ElectionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLogger for ElectionLogger {
    fn log_action(&self, message: &str) {
        if let Err(e) = self.append(message) {
            tracing::error!("Failed to record audit entry '{}': {}", message, e);
        }
    }
}
