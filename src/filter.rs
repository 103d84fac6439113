//! Selection of the children of a directory that a walk visits.
//!
//! Every child is matched by its key: the absolute path, with a trailing `/`
//! for directories so a single pattern can tell directories apart. Matching
//! is an unanchored, case-insensitive search.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use metaproc_common::paths::is_override_file;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::{keys, Configuration, Pattern};

/// Whether a path entry is a leaf or can be descended into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// A path classified as file or directory, with its match key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEntry {
    path: PathBuf,
    kind: EntryKind,
    key: String,
}

impl PathEntry {
    pub fn new(path: PathBuf, kind: EntryKind) -> Self {
        let mut key = path.to_string_lossy().into_owned();
        if kind == EntryKind::Directory && !key.ends_with('/') {
            key.push('/');
        }
        Self { path, kind, key }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), EntryKind::File)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), EntryKind::Directory)
    }

    /// Classify an existing path, following symlinks.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let kind = if std::fs::metadata(path)?.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Self::new(path.to_path_buf(), kind))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The string patterns are matched against.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Final path component, or the whole path when there is none.
    pub fn name(&self) -> Cow<'_, str> {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => self.path.to_string_lossy(),
        }
    }
}

/// List the children of `dir` that a walk under `cfg` visits, sorted by key.
///
/// Children whose type cannot be determined, and directories that cannot be
/// read, are reported and skipped.
pub fn filter_children(dir: &Path, cfg: &Configuration) -> Vec<PathEntry> {
    let mut entries = Vec::new();

    for item in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        match item {
            Ok(entry) => {
                let kind = if entry.file_type().is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                entries.push(PathEntry::new(entry.into_path(), kind));
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir);
                warn!(path = %path.display(), error = %e, "Skipping unreadable path");
            }
        }
    }

    select_entries(entries, cfg)
}

/// Apply the override, include and exclude rules of `cfg` to `entries` and
/// sort what remains.
pub fn select_entries(entries: Vec<PathEntry>, cfg: &Configuration) -> Vec<PathEntry> {
    let includes: Vec<&Pattern> = cfg.patterns(keys::PATH_INCLUDE_REGEXPS).collect();
    let excludes: Vec<&Pattern> = cfg.patterns(keys::PATH_EXCLUDE_REGEXPS).collect();

    let mut selected: Vec<PathEntry> = entries
        .into_iter()
        .filter(|entry| !is_override_file(entry.path()))
        .filter(|entry| is_included(entry.key(), &includes))
        .filter(|entry| !excludes.iter().any(|p| p.is_match(entry.key())))
        .collect();

    selected.sort_by(|a, b| a.key.cmp(&b.key));
    selected
}

fn is_included(key: &str, includes: &[&Pattern]) -> bool {
    // directories always pass the include rules, the `.*/$` pattern
    includes.is_empty() || key.ends_with('/') || includes.iter().any(|p| p.is_match(key))
}
