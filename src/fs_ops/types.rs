use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Read-only snapshot of one directory entry, produced fresh on every
/// `read_dir` call. The watcher, not this struct, is the source of change
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub dir: PathBuf,
    pub extension: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Unix permission bits; zero on platforms without them.
    pub mode: u32,
    pub index: usize,
}

/// Outcome of one entry within a batch operation.
#[derive(Debug)]
pub struct EntryOutcome {
    pub path: PathBuf,
    pub result: Result<(), EngineError>,
}

/// Aggregate result of a batch operation. Outcomes preserve the input
/// order; every failure carries the path it belongs to.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<EntryOutcome>,
}

impl BatchReport {
    pub fn push_ok(&mut self, path: PathBuf) {
        self.outcomes.push(EntryOutcome {
            path,
            result: Ok(()),
        });
    }

    pub fn push_err(&mut self, path: PathBuf, err: EngineError) {
        self.outcomes.push(EntryOutcome {
            path,
            result: Err(err),
        });
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &EngineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.path.as_path(), e)))
    }

    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}
