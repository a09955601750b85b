use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::watcher::Pane;

/// Default maximum number of log lines kept in memory.
pub const DEFAULT_MAX_LOG_LINES: usize = 10000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub pane: Option<Pane>,
}

/// In-memory ring buffer of engine log lines, capped at `max_lines`.
/// Watcher background failures land here; collaborators poll it instead of
/// the engine writing to stdout.
pub struct LogManager {
    entries: Mutex<VecDeque<LogEntry>>,
    max_lines: usize,
}

impl LogManager {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_lines)),
            max_lines,
        }
    }

    pub fn log(&self, level: &str, message: &str, pane: Option<Pane>) {
        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.to_string(),
            message: message.to_string(),
            pane,
        };

        let mut entries = self.entries.lock().unwrap();
        entries.push_back(entry);
        while entries.len() > self.max_lines {
            entries.pop_front();
        }
    }

    /// All retained entries, optionally filtered to one pane.
    pub fn get_logs(&self, pane: Option<Pane>) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        match pane {
            Some(p) => entries.iter().filter(|e| e.pane == Some(p)).cloned().collect(),
            None => entries.iter().cloned().collect(),
        }
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_LINES)
    }
}
