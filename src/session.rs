//! Session facade: the single stateful coordinator the GUI/IPC collaborator
//! talks to. It owns both pane watches, the clipboard slot, the log buffer
//! and the startup command list; everything else is delegated.
//!
//! Path lists cross the boundary as one newline-delimited text blob.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::command::{self, CommandOutput};
use crate::error::{EngineError, Result};
use crate::fs_ops::{self, BatchReport, FileInfo};
use crate::logging::{LogEntry, LogManager};
use crate::paths::{self, FileParts};
use crate::watcher::{ChangeEvent, Pane, WatcherHub};

pub struct Session {
    watchers: WatcherHub,
    logs: Arc<LogManager>,
    clipboard: Mutex<String>,
    commands: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_commands(Vec::new())
    }

    /// `commands` is the command-line argument list the process was started
    /// with, exposed verbatim through [`Session::get_command_line_commands`].
    pub fn with_commands(commands: Vec<String>) -> Self {
        let logs = Arc::new(LogManager::default());
        Self {
            watchers: WatcherHub::new(Arc::clone(&logs)),
            logs,
            clipboard: Mutex::new(String::new()),
            commands,
        }
    }

    // Path / meta

    pub fn append_path(&self, base: &str, segment: &str) -> Result<PathBuf> {
        paths::append_path(base, segment)
    }

    pub fn dir_exists(&self, path: &str) -> bool {
        paths::dir_exists(Path::new(path))
    }

    pub fn file_exists(&self, path: &str) -> bool {
        paths::file_exists(Path::new(path))
    }

    pub fn get_home_dir(&self) -> Result<PathBuf> {
        paths::home_dir()
    }

    pub fn split_file(&self, path: &str) -> Result<FileParts> {
        paths::split_file(path)
    }

    // Directory listing and file content

    pub async fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>> {
        paths::validate_path(path)?;
        fs_ops::read_dir(Path::new(path)).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        paths::validate_path(path)?;
        fs_ops::read_file(Path::new(path)).await
    }

    pub async fn write_file(&self, path: &str, contents: &str) -> Result<()> {
        paths::validate_path(path)?;
        fs_ops::write_file(Path::new(path), contents).await
    }

    // Watching

    pub fn set_left_dir_watch(&self, path: &str) -> Result<UnboundedReceiverStream<ChangeEvent>> {
        self.set_dir_watch(Pane::Left, path)
    }

    pub fn set_right_dir_watch(&self, path: &str) -> Result<UnboundedReceiverStream<ChangeEvent>> {
        self.set_dir_watch(Pane::Right, path)
    }

    pub fn set_dir_watch(
        &self,
        pane: Pane,
        path: &str,
    ) -> Result<UnboundedReceiverStream<ChangeEvent>> {
        paths::validate_path(path)?;
        self.watchers.set_dir_watch(pane, Path::new(path))
    }

    pub fn add_watcher(&self, pane: Pane, depth: usize, path: &str) -> Result<()> {
        paths::validate_path(path)?;
        self.watchers.add_watcher(pane, Path::new(path), depth)
    }

    pub fn remove_watcher(&self, pane: Pane, path: &str) {
        self.watchers.remove_watcher(pane, Path::new(path));
    }

    pub fn close_left_watch(&self) {
        self.watchers.close_watch(Pane::Left);
    }

    pub fn close_right_watch(&self) {
        self.watchers.close_watch(Pane::Right);
    }

    pub fn watched_paths(&self, pane: Pane) -> Vec<PathBuf> {
        self.watchers.watched_paths(pane)
    }

    // Entry operations

    pub async fn copy_entries(&self, path_list: &str, dest_dir: &str) -> Result<BatchReport> {
        let sources = self.parse_list(path_list)?;
        paths::validate_path(dest_dir)?;
        fs_ops::copy_entries(&sources, Path::new(dest_dir), |_, _| {}).await
    }

    pub async fn move_entries(&self, path_list: &str, dest_dir: &str) -> Result<BatchReport> {
        let sources = self.parse_list(path_list)?;
        paths::validate_path(dest_dir)?;
        fs_ops::move_entries(&sources, Path::new(dest_dir), |_, _| {}).await
    }

    pub async fn delete_entries(&self, path_list: &str) -> Result<BatchReport> {
        let targets = self.parse_list(path_list)?;
        Ok(fs_ops::delete_entries(&targets).await)
    }

    pub async fn rename_entry(&self, old: &str, new: &str) -> Result<()> {
        paths::validate_path(old)?;
        paths::validate_path(new)?;
        fs_ops::rename_entry(Path::new(old), Path::new(new)).await
    }

    pub async fn make_dir(&self, path: &str) -> Result<()> {
        paths::validate_path(path)?;
        fs_ops::make_dir(Path::new(path)).await
    }

    pub async fn make_file(&self, path: &str) -> Result<()> {
        paths::validate_path(path)?;
        fs_ops::make_file(Path::new(path)).await
    }

    pub fn search_matching_dirs(
        &self,
        root: &str,
        pattern: &str,
        max: usize,
    ) -> Result<Vec<PathBuf>> {
        paths::validate_path(root)?;
        fs_ops::search_dirs(Path::new(root), pattern, max)
    }

    // Process

    pub async fn run_command_line(
        &self,
        program: &str,
        args: &[String],
        env_overrides: &HashMap<String, String>,
        work_dir: Option<&str>,
    ) -> Result<CommandOutput> {
        command::run_command_line(program, args, env_overrides, work_dir.map(Path::new)).await
    }

    pub fn get_environment(&self) -> Vec<String> {
        command::environment()
    }

    pub fn get_command_line_commands(&self) -> Vec<String> {
        self.commands.clone()
    }

    // Clipboard: an engine-owned text slot, the plain get/set contract.

    pub fn get_clip(&self) -> String {
        self.clipboard.lock().unwrap().clone()
    }

    pub fn set_clip(&self, text: &str) {
        *self.clipboard.lock().unwrap() = text.to_string();
    }

    // Lifecycle

    /// Closes both pane watches and releases their OS resources.
    pub fn quit(&self) {
        self.watchers.close_all();
    }

    /// The most recent asynchronous watcher failure, empty when none
    /// occurred. Synchronous failures surface in each call's own result.
    pub fn get_error(&self) -> String {
        self.watchers.last_error().unwrap_or_default()
    }

    pub fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.logs.recent(limit)
    }

    fn parse_list(&self, blob: &str) -> Result<Vec<PathBuf>> {
        let entries = paths::parse_path_list(blob);
        if entries.is_empty() {
            return Err(EngineError::InvalidPath("empty path list".to_string()));
        }
        for entry in &entries {
            paths::validate_path(&entry.to_string_lossy())?;
        }
        Ok(entries)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.quit();
    }
}
