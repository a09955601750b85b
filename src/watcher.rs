//! Per-pane directory watching.
//!
//! Each pane holds at most one active watch: a non-recursive `notify`
//! subscription on its root plus any sub-paths added as the UI expands tree
//! nodes. A single flat recursive watch is avoided on purpose; the watch
//! set grows lazily with what is actually visible, bounding kernel fan-out
//! on large trees.
//!
//! Raw notify events land on a bounded std channel and a forwarding thread
//! converts them into [`ChangeEvent`]s on an unbounded tokio channel. The
//! consumer reads the stream returned by [`WatcherHub::set_dir_watch`];
//! re-issuing that call is the only way to restart the stream.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::logging::LogManager;

/// Identity of one directory view. Watches live in a collection keyed by
/// this, so more panes would not change the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    Left,
    Right,
}

impl Pane {
    pub const ALL: [Pane; 2] = [Pane::Left, Pane::Right];
}

impl fmt::Display for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pane::Left => write!(f, "left"),
            Pane::Right => write!(f, "right"),
        }
    }
}

impl std::str::FromStr for Pane {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Pane::Left),
            "right" => Ok(Pane::Right),
            other => Err(EngineError::InvalidPath(format!("unknown pane '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// One change notification forwarded to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub pane: Pane,
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Buffer between the notify callback and the forwarding thread. Bursts
/// beyond this are shed rather than blocking the notify thread.
const RAW_EVENT_BUFFER: usize = 1024;

/// How often the forwarding thread re-checks its cancellation token.
const FORWARD_POLL: Duration = Duration::from_millis(200);

struct PaneWatch {
    root: PathBuf,
    watcher: RecommendedWatcher,
    /// Sub-paths added via `add_watcher`, each with the directories its
    /// depth expansion actually subscribed.
    added: HashMap<PathBuf, Vec<PathBuf>>,
    token: CancellationToken,
}

impl Drop for PaneWatch {
    fn drop(&mut self) {
        // Signal the forwarding thread; it exits on its own. Joining here
        // could deadlock against an in-flight send.
        self.token.cancel();
    }
}

/// Owner of all pane watches. One mutex per pane serializes the watch
/// lifecycle calls for that pane without coupling the panes to each other.
pub struct WatcherHub {
    panes: HashMap<Pane, Mutex<Option<PaneWatch>>>,
    logs: Arc<LogManager>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl WatcherHub {
    pub fn new(logs: Arc<LogManager>) -> Self {
        let panes = Pane::ALL.iter().map(|p| (*p, Mutex::new(None))).collect();
        Self {
            panes,
            logs,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    fn slot(&self, pane: Pane) -> &Mutex<Option<PaneWatch>> {
        // Every pane identity is inserted at construction.
        &self.panes[&pane]
    }

    /// Replaces any existing watch for `pane` with a new one rooted at
    /// `path` and returns the stream of change events for it. The swap
    /// happens under the pane mutex, so callers never observe a window
    /// with the old watch torn down and the new one absent.
    pub fn set_dir_watch(
        &self,
        pane: Pane,
        path: &Path,
    ) -> Result<UnboundedReceiverStream<ChangeEvent>> {
        let root = canonical_dir(path)?;
        let mut slot = self.slot(pane).lock().unwrap();

        let (raw_tx, raw_rx) = sync_channel::<Event>(RAW_EVENT_BUFFER);
        let logs = Arc::clone(&self.logs);
        let last_error = Arc::clone(&self.last_error);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = raw_tx.try_send(event);
                }
                Err(err) => {
                    let text = format!("{pane} watch error: {err}");
                    logs.log("error", &text, Some(pane));
                    *last_error.lock().unwrap() = Some(text);
                }
            })
            .map_err(|e| EngineError::WatchInit {
                path: root.clone(),
                source: e,
            })?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| EngineError::WatchInit {
                path: root.clone(),
                source: e,
            })?;

        let (tx, rx) = unbounded_channel();
        let token = CancellationToken::new();
        let thread_token = token.clone();
        thread::spawn(move || forward_events(pane, raw_rx, tx, thread_token));

        // Dropping the previous watch cancels its forwarding thread and
        // releases its OS handles.
        *slot = Some(PaneWatch {
            root,
            watcher,
            added: HashMap::new(),
            token,
        });
        Ok(UnboundedReceiverStream::new(rx))
    }

    /// Extends the pane's watch to `path` and nested directories up to
    /// `depth` levels. On any subscription failure the watch set is left
    /// exactly as it was.
    pub fn add_watcher(&self, pane: Pane, path: &Path, depth: usize) -> Result<()> {
        let mut slot = self.slot(pane).lock().unwrap();
        let watch = slot.as_mut().ok_or(EngineError::NoActiveWatch(pane))?;

        let target = canonical_dir(path)?;
        if !target.starts_with(&watch.root) {
            return Err(EngineError::PathOutsideRoot {
                path: target,
                root: watch.root.clone(),
            });
        }

        // The root stays out of the recorded set so removing an added
        // sub-path can never unwatch the root itself.
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&target)
            .max_depth(depth)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() && entry.path() != watch.root {
                dirs.push(entry.path().to_path_buf());
            }
        }

        for (i, dir) in dirs.iter().enumerate() {
            if let Err(e) = watch.watcher.watch(dir, RecursiveMode::NonRecursive) {
                for undo in &dirs[..i] {
                    let _ = watch.watcher.unwatch(undo);
                }
                return Err(EngineError::WatchInit {
                    path: dir.clone(),
                    source: e,
                });
            }
        }

        watch.added.insert(target, dirs);
        Ok(())
    }

    /// Stops observing a previously added sub-path. A path that was never
    /// added, or a pane with no watch, is a no-op.
    pub fn remove_watcher(&self, pane: Pane, path: &Path) {
        let mut slot = self.slot(pane).lock().unwrap();
        let Some(watch) = slot.as_mut() else {
            return;
        };
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(dirs) = watch.added.remove(&key) {
            for dir in dirs {
                let _ = watch.watcher.unwatch(&dir);
            }
        }
    }

    /// Releases the pane's watch. Idempotent.
    pub fn close_watch(&self, pane: Pane) {
        let mut slot = self.slot(pane).lock().unwrap();
        *slot = None;
    }

    pub fn close_all(&self) {
        for pane in Pane::ALL {
            self.close_watch(pane);
        }
    }

    /// Root of the pane's active watch, if any.
    pub fn active_root(&self, pane: Pane) -> Option<PathBuf> {
        self.slot(pane)
            .lock()
            .unwrap()
            .as_ref()
            .map(|w| w.root.clone())
    }

    /// Every directory currently subscribed for the pane: the root plus
    /// all depth-expanded additions.
    pub fn watched_paths(&self, pane: Pane) -> Vec<PathBuf> {
        let slot = self.slot(pane).lock().unwrap();
        match slot.as_ref() {
            Some(watch) => {
                let mut paths = vec![watch.root.clone()];
                for dirs in watch.added.values() {
                    paths.extend(dirs.iter().cloned());
                }
                paths
            }
            None => Vec::new(),
        }
    }

    /// Most recent asynchronous watch failure, if any. Synchronous calls
    /// report through their own results and never land here.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .map_err(|e| EngineError::from_io(path, e))?;
    if !canonical.is_dir() {
        return Err(EngineError::NotADirectory(path.to_path_buf()));
    }
    Ok(canonical)
}

/// Drains raw notify events, coalescing duplicate (kind, path) pairs within
/// each forwarded batch, until cancelled or the watcher is dropped.
fn forward_events(
    pane: Pane,
    raw_rx: Receiver<Event>,
    tx: UnboundedSender<ChangeEvent>,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        let first = match raw_rx.recv_timeout(FORWARD_POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let mut batch = Vec::new();
        let mut seen = HashSet::new();
        convert_event(pane, first, &mut batch, &mut seen);
        while let Ok(event) = raw_rx.try_recv() {
            convert_event(pane, event, &mut batch, &mut seen);
        }

        for change in batch {
            // A dropped receiver means the consumer re-issued the watch or
            // shut down; keep draining so the raw channel never backs up.
            let _ = tx.send(change);
        }
    }
}

fn convert_event(
    pane: Pane,
    event: Event,
    out: &mut Vec<ChangeEvent>,
    seen: &mut HashSet<(ChangeKind, PathBuf)>,
) {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return,
    };
    for path in event.paths {
        if seen.insert((kind, path.clone())) {
            out.push(ChangeEvent { pane, kind, path });
        }
    }
}
