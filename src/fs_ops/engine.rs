//! File operation engine: directory listing and batch copy/move/delete.
//!
//! Batch operations process entries independently and in input order. One
//! entry failing never stops the remaining entries; the caller gets a
//! [`BatchReport`] listing every outcome.

use std::path::{Path, PathBuf};

use tokio::fs;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::fs_ops::types::{BatchReport, FileInfo};
use crate::paths;

/// Lists the children of `path` as fresh [`FileInfo`] snapshots, in the
/// order the OS reports them.
pub async fn read_dir(path: &Path) -> Result<Vec<FileInfo>> {
    let meta = fs::metadata(path)
        .await
        .map_err(|e| EngineError::from_io(path, e))?;
    if !meta.is_dir() {
        return Err(EngineError::NotADirectory(path.to_path_buf()));
    }

    let mut entries = Vec::new();
    let mut reader = fs::read_dir(path)
        .await
        .map_err(|e| EngineError::from_io(path, e))?;

    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| EngineError::from_io(path, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| EngineError::from_io(entry.path(), e))?;

        // Follow the link for size and kind so a symlinked directory lists
        // as a directory; a broken link falls back to the lstat view.
        let followed = fs::metadata(entry.path()).await.ok();
        let is_dir = followed
            .as_ref()
            .map(|m| m.is_dir())
            .unwrap_or(file_type.is_dir());
        let is_symlink = file_type.is_symlink() || (is_dir && !file_type.is_dir());

        let (size, modified, mode) = match &followed {
            Some(m) => (
                m.len(),
                m.modified().ok().map(Into::into).unwrap_or_default(),
                permission_bits(m),
            ),
            None => (0, Default::default(), 0),
        };

        let extension = paths::split_file(&name)
            .map(|p| p.extension)
            .unwrap_or_default();

        entries.push(FileInfo {
            name,
            dir: path.to_path_buf(),
            extension,
            is_dir,
            is_symlink,
            size,
            modified,
            mode,
            index: entries.len(),
        });
    }

    Ok(entries)
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(_meta: &std::fs::Metadata) -> u32 {
    0
}

pub async fn read_file(path: &Path) -> Result<String> {
    if paths::dir_exists(path) {
        return Err(EngineError::NotAFile(path.to_path_buf()));
    }
    fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::from_io(path, e))
}

pub async fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| EngineError::from_io(path, e))
}

/// Copies each source into `dest_dir`, recursively for directories.
///
/// An already-present destination entry fails that source with
/// `DestinationExists` and leaves the destination untouched. `progress` is
/// called with (entries done, entries total) after each source.
pub async fn copy_entries(
    sources: &[PathBuf],
    dest_dir: &Path,
    progress: impl Fn(usize, usize),
) -> Result<BatchReport> {
    require_dir(dest_dir).await?;

    let mut report = BatchReport::default();
    for (done, source) in sources.iter().enumerate() {
        match copy_one(source, dest_dir).await {
            Ok(()) => report.push_ok(source.clone()),
            Err(e) => report.push_err(source.clone(), e),
        }
        progress(done + 1, sources.len());
    }
    Ok(report)
}

/// Same as [`copy_entries`], then removes each source whose copy succeeded.
/// A source whose copy failed is never deleted.
pub async fn move_entries(
    sources: &[PathBuf],
    dest_dir: &Path,
    progress: impl Fn(usize, usize),
) -> Result<BatchReport> {
    require_dir(dest_dir).await?;

    let mut report = BatchReport::default();
    for (done, source) in sources.iter().enumerate() {
        let result = match copy_one(source, dest_dir).await {
            Ok(()) => remove_entry(source).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => report.push_ok(source.clone()),
            Err(e) => report.push_err(source.clone(), e),
        }
        progress(done + 1, sources.len());
    }
    Ok(report)
}

/// Recursively removes each listed entry, collecting per-entry outcomes.
pub async fn delete_entries(targets: &[PathBuf]) -> BatchReport {
    let mut report = BatchReport::default();
    for target in targets {
        match remove_entry(target).await {
            Ok(()) => report.push_ok(target.clone()),
            Err(e) => report.push_err(target.clone(), e),
        }
    }
    report
}

pub async fn rename_entry(old: &Path, new: &Path) -> Result<()> {
    if fs::symlink_metadata(new).await.is_ok() {
        return Err(EngineError::DestinationExists(new.to_path_buf()));
    }
    if fs::symlink_metadata(old).await.is_err() {
        return Err(EngineError::NotFound(old.to_path_buf()));
    }
    fs::rename(old, new)
        .await
        .map_err(|e| EngineError::from_io(old, e))
}

/// Creates one empty directory. The parent must already exist.
pub async fn make_dir(path: &Path) -> Result<()> {
    fs::create_dir(path)
        .await
        .map_err(|e| EngineError::from_io(path, e))
}

/// Creates one empty file. Fails if it is already present.
pub async fn make_file(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map(|_| ())
        .map_err(|e| EngineError::from_io(path, e))
}

/// Walks `root` and returns up to `max` directories whose path contains
/// `pattern`.
pub fn search_dirs(root: &Path, pattern: &str, max: usize) -> Result<Vec<PathBuf>> {
    if !paths::dir_exists(root) {
        return Err(EngineError::NotFound(root.to_path_buf()));
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if matches.len() >= max {
            break;
        }
        if entry.file_type().is_dir() && entry.path().to_string_lossy().contains(pattern) {
            matches.push(entry.path().to_path_buf());
        }
    }
    Ok(matches)
}

async fn require_dir(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .await
        .map_err(|e| EngineError::from_io(path, e))?;
    if !meta.is_dir() {
        return Err(EngineError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

async fn remove_entry(target: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(target)
        .await
        .map_err(|e| EngineError::from_io(target, e))?;
    if meta.is_dir() {
        fs::remove_dir_all(target)
            .await
            .map_err(|e| EngineError::from_io(target, e))
    } else {
        fs::remove_file(target)
            .await
            .map_err(|e| EngineError::from_io(target, e))
    }
}

async fn copy_one(source: &Path, dest_dir: &Path) -> Result<()> {
    let name = source
        .file_name()
        .ok_or_else(|| EngineError::InvalidPath(source.display().to_string()))?;
    let target = dest_dir.join(name);

    if fs::symlink_metadata(&target).await.is_ok() {
        return Err(EngineError::DestinationExists(target));
    }

    let meta = fs::metadata(source)
        .await
        .map_err(|e| EngineError::from_io(source, e))?;

    if meta.is_dir() {
        copy_tree(source, &target).await
    } else {
        copy_file(source, &target).await
    }
}

async fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    // Collect first so walkdir's blocking iteration stays out of the
    // per-file await points.
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source.to_path_buf());
            match e.into_io_error() {
                Some(io) => EngineError::from_io(path, io),
                None => EngineError::NotFound(path),
            }
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| EngineError::InvalidPath(entry.path().display().to_string()))?
            .to_path_buf();
        if entry.file_type().is_dir() {
            dirs.push(rel);
        } else {
            files.push(rel);
        }
    }

    for rel in dirs {
        let dest = target.join(&rel);
        fs::create_dir_all(&dest)
            .await
            .map_err(|e| EngineError::from_io(&dest, e))?;
    }
    for rel in files {
        copy_file(&source.join(&rel), &target.join(&rel)).await?;
    }
    Ok(())
}

async fn copy_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .await
        .map_err(|e| EngineError::from_io(source, e))?;

    let meta = fs::metadata(source)
        .await
        .map_err(|e| EngineError::from_io(source, e))?;
    fs::set_permissions(target, meta.permissions())
        .await
        .map_err(|e| EngineError::from_io(target, e))?;
    if let Ok(modified) = meta.modified() {
        filetime::set_file_mtime(target, filetime::FileTime::from_system_time(modified))
            .map_err(|e| EngineError::from_io(target, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seed_tree(root: &Path) {
        fs::create_dir_all(root.join("sub/inner")).await.unwrap();
        fs::write(root.join("top.txt"), b"top").await.unwrap();
        fs::write(root.join("sub/mid.txt"), b"mid").await.unwrap();
        fs::write(root.join("sub/inner/leaf.txt"), b"leaf")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn read_dir_matches_os_listing() {
        let temp = TempDir::new().unwrap();
        seed_tree(temp.path()).await;

        let listed = read_dir(temp.path()).await.unwrap();
        let mut names: Vec<_> = listed.iter().map(|f| f.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["sub", "top.txt"]);

        let sub = listed.iter().find(|f| f.name == "sub").unwrap();
        assert!(sub.is_dir);
        let top = listed.iter().find(|f| f.name == "top.txt").unwrap();
        assert!(!top.is_dir);
        assert_eq!(top.size, 3);
        assert_eq!(top.extension, "txt");
    }

    #[tokio::test]
    async fn read_dir_rejects_files_and_missing_paths() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"x").await.unwrap();

        assert!(matches!(
            read_dir(&file).await,
            Err(EngineError::NotADirectory(_))
        ));
        assert!(matches!(
            read_dir(&temp.path().join("missing")).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn copy_recurses_and_preserves_structure() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        seed_tree(src.path()).await;

        let sources = vec![src.path().join("sub"), src.path().join("top.txt")];
        let report = copy_entries(&sources, dst.path(), |_, _| {})
            .await
            .unwrap();
        assert!(report.is_ok());

        assert_eq!(
            fs::read_to_string(dst.path().join("sub/inner/leaf.txt"))
                .await
                .unwrap(),
            "leaf"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("top.txt")).await.unwrap(),
            "top"
        );
        // Sources untouched.
        assert!(paths::file_exists(&src.path().join("top.txt")));
    }

    #[tokio::test]
    async fn copy_conflict_fails_entry_without_touching_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), b"new").await.unwrap();
        fs::write(dst.path().join("a.txt"), b"old").await.unwrap();

        let sources = vec![src.path().join("a.txt")];
        let report = copy_entries(&sources, dst.path(), |_, _| {})
            .await
            .unwrap();

        assert!(matches!(
            report.outcomes[0].result,
            Err(EngineError::DestinationExists(_))
        ));
        assert_eq!(
            fs::read_to_string(dst.path().join("a.txt")).await.unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn batch_continues_past_failures_in_input_order() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("one.txt"), b"1").await.unwrap();
        fs::write(src.path().join("three.txt"), b"3").await.unwrap();

        let sources = vec![
            src.path().join("one.txt"),
            src.path().join("missing.txt"),
            src.path().join("three.txt"),
        ];
        let report = copy_entries(&sources, dst.path(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].result.is_ok());
        assert!(matches!(
            report.outcomes[1].result,
            Err(EngineError::NotFound(_))
        ));
        assert!(report.outcomes[2].result.is_ok());
        assert!(paths::file_exists(&dst.path().join("three.txt")));
    }

    #[tokio::test]
    async fn move_removes_only_successfully_copied_sources() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("first.txt"), b"1").await.unwrap();
        fs::write(src.path().join("blocked.txt"), b"2").await.unwrap();
        // Pre-existing destination blocks the second entry's copy.
        fs::write(dst.path().join("blocked.txt"), b"old")
            .await
            .unwrap();

        let sources = vec![src.path().join("first.txt"), src.path().join("blocked.txt")];
        let report = move_entries(&sources, dst.path(), |_, _| {})
            .await
            .unwrap();

        assert!(report.outcomes[0].result.is_ok());
        assert!(report.outcomes[1].result.is_err());
        // Moved source is gone, failed source remains.
        assert!(!paths::file_exists(&src.path().join("first.txt")));
        assert!(paths::file_exists(&src.path().join("blocked.txt")));

        let failed: Vec<_> = report.failures().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(failed, vec![src.path().join("blocked.txt")]);
    }

    #[tokio::test]
    async fn delete_aggregates_per_entry_results() {
        let temp = TempDir::new().unwrap();
        seed_tree(temp.path()).await;

        let targets = vec![
            temp.path().join("sub"),
            temp.path().join("nope"),
            temp.path().join("top.txt"),
        ];
        let report = delete_entries(&targets).await;

        assert!(report.outcomes[0].result.is_ok());
        assert!(matches!(
            report.outcomes[1].result,
            Err(EngineError::NotFound(_))
        ));
        assert!(report.outcomes[2].result.is_ok());
        assert!(!paths::dir_exists(&temp.path().join("sub")));
    }

    #[tokio::test]
    async fn rename_checks_both_ends() {
        let temp = TempDir::new().unwrap();
        let old = temp.path().join("old.txt");
        let new = temp.path().join("new.txt");
        fs::write(&old, b"x").await.unwrap();

        rename_entry(&old, &new).await.unwrap();
        assert!(paths::file_exists(&new));

        assert!(matches!(
            rename_entry(&temp.path().join("gone"), &temp.path().join("other")).await,
            Err(EngineError::NotFound(_))
        ));

        fs::write(&old, b"again").await.unwrap();
        assert!(matches!(
            rename_entry(&old, &new).await,
            Err(EngineError::DestinationExists(_))
        ));
    }

    #[tokio::test]
    async fn make_dir_and_file_do_not_create_parents() {
        let temp = TempDir::new().unwrap();

        let dir = temp.path().join("fresh");
        make_dir(&dir).await.unwrap();
        assert!(matches!(
            make_dir(&dir).await,
            Err(EngineError::AlreadyExists(_))
        ));
        assert!(matches!(
            make_dir(&temp.path().join("no/parent/here")).await,
            Err(EngineError::NotFound(_))
        ));

        let file = temp.path().join("fresh/new.txt");
        make_file(&file).await.unwrap();
        assert!(matches!(
            make_file(&file).await,
            Err(EngineError::AlreadyExists(_))
        ));
        assert!(matches!(
            make_file(&temp.path().join("no/parent/file.txt")).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_dirs_caps_results() {
        let temp = TempDir::new().unwrap();
        for i in 0..4 {
            fs::create_dir(temp.path().join(format!("match_{i}")))
                .await
                .unwrap();
        }
        fs::create_dir(temp.path().join("other")).await.unwrap();

        let found = search_dirs(temp.path(), "match_", 2).unwrap();
        assert_eq!(found.len(), 2);

        let found = search_dirs(temp.path(), "match_", 100).unwrap();
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn copy_reports_progress_per_entry() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a"), b"a").await.unwrap();
        fs::write(src.path().join("b"), b"b").await.unwrap();

        let seen = std::sync::Mutex::new(Vec::new());
        let sources = vec![src.path().join("a"), src.path().join("b")];
        copy_entries(&sources, dst.path(), |done, total| {
            seen.lock().unwrap().push((done, total));
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }
}
