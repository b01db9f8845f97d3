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

//! Prefix / glob resolution
//!
//! Backends only ever filter by a literal prefix. A request such as
//! `photos/2024/**/*.jpg` is therefore split into the literal part before the
//! first `*` (sent to the backend) and the full expression, which is matched
//! client-side against every candidate the backend returns.
//!
//! ```
//! use cloud_bucket_storage::pathspec::parse_prefix_or_glob;
//!
//! let spec = parse_prefix_or_glob(Some("photos/2024/**/*.jpg"));
//! assert_eq!(spec.prefix.as_deref(), Some("photos/2024/"));
//! assert_eq!(spec.glob.as_deref(), Some("photos/2024/**/*.jpg"));
//! assert_eq!(spec.base_dir.as_deref(), Some("photos/2024/"));
//! ```

use crate::error::{StorageError, StorageResult};
use crate::types::{ListArg, ListOptions, ListQuery};
use glob::{MatchOptions, Pattern};
use std::path::Path;

/// A path argument split into its backend prefix, client glob and base directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSpec {
    /// Literal prefix the backend filters by
    pub prefix: Option<String>,
    /// Full glob expression, only set when `prefix` is non-empty
    pub glob: Option<String>,
    /// `prefix` up to and including its last `/`
    pub base_dir: Option<String>,
}

/// Split a prefix-or-glob argument
///
/// A `*` at index 0 is not treated as a glob: the whole input becomes the
/// prefix, so `"*.txt"` only lists keys literally starting with `*.txt`.
pub fn parse_prefix_or_glob(input: Option<&str>) -> PathSpec {
    let input = match input {
        Some(s) if !s.is_empty() => s,
        _ => return PathSpec::default(),
    };

    let (prefix, glob) = match input.find('*') {
        Some(idx) if idx > 0 => (&input[..idx], Some(input.to_string())),
        _ => (input, None),
    };

    let base_dir = prefix.rfind('/').map(|idx| prefix[..=idx].to_string());

    PathSpec {
        prefix: Some(prefix.to_string()),
        glob,
        base_dir,
    }
}

/// Destination of one matched item of a multi-item transfer
///
/// The path of `source_path` relative to `base_dir` is appended to
/// `dest_dir_prefix`. An empty base directory stands for the working
/// directory and keeps the whole relative path. Without a base directory, or
/// when the source does not lie below it, only the file name is kept.
pub fn resolve_destination_path(
    base_dir: Option<&str>,
    source_path: &str,
    dest_dir_prefix: &str,
) -> String {
    let relative = base_dir
        .and_then(|base| source_path.strip_prefix(base))
        .filter(|rest| !rest.is_empty())
        .unwrap_or_else(|| base_name(source_path));

    format!("{dest_dir_prefix}{relative}")
}

/// Destination of a single literal file
///
/// A destination ending in `/` names a directory and receives the file name
/// of `local_path`; anything else is used verbatim.
pub fn build_full_dest_path(local_path: &str, dest_path: &str) -> StorageResult<String> {
    if dest_path.is_empty() {
        return Err(StorageError::invalid_argument(format!(
            "no destination given for '{local_path}'"
        )));
    }

    if dest_path.ends_with('/') {
        let file_name = Path::new(local_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| base_name(local_path).to_string());
        Ok(format!("{dest_path}{file_name}"))
    } else {
        Ok(dest_path.to_string())
    }
}

/// Last `/`-separated segment of a path
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled client-side glob
///
/// `*` and `?` stay inside one path segment, `**` spans segments.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: Pattern,
}

impl GlobMatcher {
    /// Compile a glob expression
    pub fn new(expr: &str) -> StorageResult<Self> {
        let pattern = Pattern::new(expr).map_err(|e| {
            StorageError::invalid_argument(format!("invalid glob '{expr}': {e}"))
        })?;
        Ok(GlobMatcher { pattern })
    }

    /// Whether `path` matches the expression
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.matches_with(path, MATCH_OPTIONS)
    }

    /// Source expression
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Normalize a listing argument into the backend query and an optional matcher
pub fn resolve_list_arg(arg: ListArg) -> StorageResult<(ListQuery, Option<GlobMatcher>)> {
    let options = match arg {
        ListArg::Prefix(prefix) => ListOptions::prefix(prefix),
        ListArg::Options(options) => options,
    };

    let spec = parse_prefix_or_glob(options.prefix.as_deref());
    let matcher = spec.glob.as_deref().map(GlobMatcher::new).transpose()?;

    let query = ListQuery {
        prefix: spec.prefix,
        directory: options.directory,
        marker: options.marker,
        limit: options.limit,
    };
    Ok((query, matcher))
}
