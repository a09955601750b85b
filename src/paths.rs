//! Path utilities shared by the operation engine and the watcher.
//!
//! Existence checks report absence as a plain `false`; only malformed input
//! is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Upper bound on accepted path lengths, matching common PATH_MAX setups.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Decomposition of a single path into directory, base name and extension.
///
/// The extension is everything after the first dot of the file name, a
/// leading dot excluded: `file.tar.gz` splits into `file` + `tar.gz`, and
/// `.bashrc` keeps its whole name with an empty extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParts {
    pub dir: PathBuf,
    pub name: String,
    pub extension: String,
}

/// Rejects paths the rest of the engine must never see: empty strings,
/// embedded NUL bytes, or anything past the length cap.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EngineError::InvalidPath("empty path".to_string()));
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(EngineError::InvalidPath(format!(
            "path too long ({} bytes, max {MAX_PATH_LENGTH})",
            path.len()
        )));
    }
    if path.bytes().any(|b| b == 0) {
        return Err(EngineError::InvalidPath(
            "path contains NUL bytes".to_string(),
        ));
    }
    Ok(())
}

/// Joins a base directory and one segment.
pub fn append_path(base: &str, segment: &str) -> Result<PathBuf> {
    validate_path(base)?;
    if segment.bytes().any(|b| b == 0) {
        return Err(EngineError::InvalidPath(
            "segment contains NUL bytes".to_string(),
        ));
    }
    Ok(Path::new(base).join(segment))
}

pub fn dir_exists(path: &Path) -> bool {
    path.metadata().map(|m| m.is_dir()).unwrap_or(false)
}

pub fn file_exists(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| EngineError::NotFound(PathBuf::from("~")))
}

/// Splits a path into [`FileParts`]. Pure; performs no I/O.
pub fn split_file(path: &str) -> Result<FileParts> {
    validate_path(path)?;
    let path = Path::new(path);
    let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Skip a leading dot so hidden files keep their full name.
    let split_at = file_name
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '.')
        .map(|(i, _)| i);

    let (name, extension) = match split_at {
        Some(i) => (file_name[..i].to_string(), file_name[i + 1..].to_string()),
        None => (file_name, String::new()),
    };

    Ok(FileParts {
        dir,
        name,
        extension,
    })
}

/// Parses the boundary encoding of a path list: one path per line, blank
/// lines skipped.
pub fn parse_path_list(blob: &str) -> Vec<PathBuf> {
    blob.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_path_rejects_nul_and_empty() {
        assert!(validate_path("test\0file").is_err());
        assert!(validate_path("").is_err());
        assert!(validate_path("/tmp/test").is_ok());
    }

    #[test]
    fn validate_path_rejects_overlong() {
        let long = "/".repeat(MAX_PATH_LENGTH + 1);
        assert!(validate_path(&long).is_err());
    }

    #[test]
    fn append_path_joins_segments() {
        assert_eq!(
            append_path("/base", "sub").unwrap(),
            PathBuf::from("/base/sub")
        );
        assert!(append_path("", "sub").is_err());
        assert!(append_path("/base", "a\0b").is_err());
    }

    #[test]
    fn exists_checks_do_not_fail_on_absence() {
        assert!(!dir_exists(Path::new("/no/such/dir/anywhere")));
        assert!(!file_exists(Path::new("/no/such/file/anywhere")));
    }

    #[test]
    fn exists_checks_distinguish_kind() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(dir_exists(temp.path()));
        assert!(!file_exists(temp.path()));
        assert!(file_exists(&file));
        assert!(!dir_exists(&file));
    }

    #[test]
    fn split_file_extension_rule() {
        let parts = split_file("/a/b/file.tar.gz").unwrap();
        assert_eq!(parts.dir, PathBuf::from("/a/b"));
        assert_eq!(parts.name, "file");
        assert_eq!(parts.extension, "tar.gz");

        let parts = split_file("/a/b/file.txt").unwrap();
        assert_eq!(parts.name, "file");
        assert_eq!(parts.extension, "txt");

        let parts = split_file("/a/b/plain").unwrap();
        assert_eq!(parts.name, "plain");
        assert_eq!(parts.extension, "");
    }

    #[test]
    fn split_file_keeps_hidden_names_whole() {
        let parts = split_file("/home/user/.bashrc").unwrap();
        assert_eq!(parts.name, ".bashrc");
        assert_eq!(parts.extension, "");

        let parts = split_file("/home/user/.config.bak").unwrap();
        assert_eq!(parts.name, ".config");
        assert_eq!(parts.extension, "bak");
    }

    #[test]
    fn parse_path_list_skips_blank_lines() {
        let blob = "/a/one\n\n/b/two\n  \n/c/three\n";
        let paths = parse_path_list(blob);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a/one"),
                PathBuf::from("/b/two"),
                PathBuf::from("/c/three"),
            ]
        );
    }
}
