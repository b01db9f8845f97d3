// Cloud Bucket - uniform object storage access
// Copyright (C) 2025 Cloud Bucket Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Local filesystem side of transfers: source expansion, directories, content types

use crate::error::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Local files selected by an upload argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    /// Files to upload, sorted
    pub files: Vec<PathBuf>,
    /// Directory the relative destination paths are computed from
    pub base_dir: Option<String>,
    /// `true` for directory and glob arguments, `false` for a literal file
    pub expanded: bool,
}

/// Resolve an upload argument into the local files it names
///
/// A trailing `/` or an existing directory selects every file below it, an
/// argument containing `*` is expanded as a glob, anything else is a single
/// file that must exist.
pub async fn expand_local_source(local: &str) -> StorageResult<LocalSource> {
    if local.is_empty() {
        return Err(StorageError::invalid_argument("no local path given"));
    }

    let is_dir = local.ends_with('/')
        || tokio::fs::metadata(local)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

    if is_dir {
        let dir = if local.ends_with('/') {
            local.to_string()
        } else {
            format!("{local}/")
        };
        let root = dir.clone();
        let files = tokio::task::spawn_blocking(move || walk_files(&root))
            .await
            .map_err(|e| StorageError::backend("local directory walk did not complete", e))??;
        debug!(dir = %dir, count = files.len(), "Expanded local directory");
        return Ok(LocalSource {
            files,
            base_dir: Some(normalize_local(Path::new(&dir), true)),
            expanded: true,
        });
    }

    if local.contains('*') {
        let pattern = local.to_string();
        let files = tokio::task::spawn_blocking(move || glob_files(&pattern))
            .await
            .map_err(|e| StorageError::backend("local glob expansion did not complete", e))??;
        let base_dir = glob_base_dir(local);
        debug!(pattern = %local, count = files.len(), "Expanded local glob");
        return Ok(LocalSource {
            files,
            base_dir: Some(base_dir),
            expanded: true,
        });
    }

    let meta = tokio::fs::metadata(local).await?;
    if !meta.is_file() {
        return Err(StorageError::invalid_argument(format!(
            "'{local}' is not a regular file"
        )));
    }
    Ok(LocalSource {
        files: vec![PathBuf::from(local)],
        base_dir: None,
        expanded: false,
    })
}

fn walk_files(root: &str) -> StorageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::backend(format!("cannot read '{root}'"), e))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn glob_files(pattern: &str) -> StorageResult<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| {
        StorageError::invalid_argument(format!("invalid local glob '{pattern}': {e}"))
    })?;

    let mut files = Vec::new();
    for path in paths {
        let path = path.map_err(|e| StorageError::backend(format!("cannot expand '{pattern}'"), e))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Directory part of a local glob before its first wildcard
///
/// A glob with no directory before the wildcard, such as `**/*.txt` or
/// `./*.txt`, yields `""`: matches keep their path relative to the working
/// directory.
fn glob_base_dir(pattern: &str) -> String {
    let literal = pattern.find('*').map_or(pattern, |idx| &pattern[..idx]);
    let dir = literal.rfind('/').map_or("", |idx| &literal[..=idx]);
    strip_dot_prefix(dir).to_string()
}

/// `/`-separated form of a local path, without a leading `./`
pub fn normalize_local(path: &Path, keep_trailing_slash: bool) -> String {
    let mut text = path.to_string_lossy().replace('\\', "/");
    if keep_trailing_slash && !text.ends_with('/') {
        text.push('/');
    }
    strip_dot_prefix(&text).to_string()
}

fn strip_dot_prefix(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Create the parent directory of `path` if it is missing
pub async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// MIME type derived from the file extension alone, without charset
pub fn content_type_for(path: &str) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        tokio::fs::create_dir_all(root.join("sub")).await.unwrap();
        tokio::fs::write(root.join("a.txt"), b"a").await.unwrap();
        tokio::fs::write(root.join("b.json"), b"{}").await.unwrap();
        tokio::fs::write(root.join("sub/c.txt"), b"c").await.unwrap();
        dir
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("index.html").as_deref(), Some("text/html"));
        assert_eq!(content_type_for("data/x.json").as_deref(), Some("application/json"));
        assert_eq!(content_type_for("no-extension"), None);
    }

    #[test]
    fn test_normalize_local() {
        assert_eq!(normalize_local(Path::new("./dir/a.txt"), false), "dir/a.txt");
        assert_eq!(normalize_local(Path::new("dir"), true), "dir/");
    }

    #[tokio::test]
    async fn test_expand_directory_walks_recursively() {
        let dir = tree().await;
        let arg = format!("{}/", dir.path().display());
        let source = expand_local_source(&arg).await.unwrap();

        assert!(source.expanded);
        assert_eq!(source.files.len(), 3);
        assert_eq!(
            source.base_dir,
            Some(normalize_local(dir.path(), true))
        );
    }

    #[tokio::test]
    async fn test_expand_directory_without_trailing_slash() {
        let dir = tree().await;
        let arg = dir.path().display().to_string();
        let source = expand_local_source(&arg).await.unwrap();
        assert_eq!(source.files.len(), 3);
    }

    #[tokio::test]
    async fn test_expand_glob() {
        let dir = tree().await;
        let arg = format!("{}/*.txt", dir.path().display());
        let source = expand_local_source(&arg).await.unwrap();

        assert!(source.expanded);
        assert_eq!(source.files, vec![dir.path().join("a.txt")]);
    }

    #[test]
    fn test_glob_base_dir() {
        assert_eq!(glob_base_dir("dir/sub/*.txt"), "dir/sub/");
        assert_eq!(glob_base_dir("dir/a*/x.txt"), "dir/");
        assert_eq!(glob_base_dir("./dir/**/*.txt"), "dir/");
        assert_eq!(glob_base_dir("./*.txt"), "");
        assert_eq!(glob_base_dir("**/*.txt"), "");
        assert_eq!(glob_base_dir("*.txt"), "");
    }

    #[tokio::test]
    async fn test_expand_current_directory_has_empty_base() {
        for arg in ["./", "."] {
            let source = expand_local_source(arg).await.unwrap();
            assert!(source.expanded);
            assert_eq!(source.base_dir.as_deref(), Some(""));
        }
    }

    #[tokio::test]
    async fn test_expand_literal_file() {
        let dir = tree().await;
        let arg = dir.path().join("a.txt").display().to_string();
        let source = expand_local_source(&arg).await.unwrap();
        assert!(!source.expanded);
        assert_eq!(source.files.len(), 1);
    }

    #[tokio::test]
    async fn test_expand_missing_literal_file() {
        let dir = tree().await;
        let arg = dir.path().join("missing.txt").display().to_string();
        assert!(matches!(
            expand_local_source(&arg).await,
            Err(StorageError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_parent_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x/y/z.txt");
        ensure_parent_dir(&target).await.unwrap();
        assert!(dir.path().join("x/y").is_dir());
    }
}
