//! Depth-first walks over media trees.
//!
//! A walk carries two things down the tree: the configuration in force and
//! the facts known so far. At every directory the override layer is applied
//! first, then the directory itself is derived and handed to the processor,
//! and only then are its children visited, each with its own copy of the
//! facts. The top-level directory of a walk only contributes its override
//! layer; it is never derived or processed.

mod clean;

use std::path::{Component, Path, PathBuf};

use metaproc_common::paths::{dir_override_path, file_override_path};
use metaproc_common::Result;
use tracing::{info, warn};

use crate::config::{traversal_config, ConfigLoader, Configuration};
use crate::facts::Facts;
use crate::filter::{filter_children, PathEntry};

/// What a walk does at each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Process,
    Clean { recursive: bool },
}

impl Operation {
    fn descends(self) -> bool {
        match self {
            Operation::Process => true,
            Operation::Clean { recursive } => recursive,
        }
    }
}

/// Walks media trees with a [`ConfigLoader`] for override layers.
pub struct TreeWalker<'a> {
    loader: &'a ConfigLoader,
}

impl<'a> TreeWalker<'a> {
    pub fn new(loader: &'a ConfigLoader) -> Self {
        Self { loader }
    }

    /// Process every directory of `directories` in order, starting from the
    /// base configuration.
    ///
    /// Directories that do not exist are skipped with a warning.
    pub fn run_process(&self, base: &Configuration, directories: &[PathBuf]) -> Result<()> {
        let cfg = traversal_config(base);

        for dir in directories {
            let dir = normalize_path(dir)?;
            match PathEntry::from_path(&dir) {
                Ok(entry) if entry.is_dir() => {
                    info!(path = %dir.display(), "Processing tree");
                    self.walk_process(&entry, &cfg, Facts::new(), true)?;
                }
                Ok(_) => warn!(path = %dir.display(), "Not a directory, skipping"),
                Err(e) => warn!(path = %dir.display(), error = %e, "Cannot open directory, skipping"),
            }
        }
        Ok(())
    }

    /// Process `entry` and everything below it.
    pub fn walk_process(
        &self,
        entry: &PathEntry,
        cfg: &Configuration,
        inherited: Facts,
        is_root: bool,
    ) -> Result<()> {
        self.visit_dir(entry, cfg, inherited, is_root, Operation::Process)
    }

    fn visit_dir(
        &self,
        entry: &PathEntry,
        cfg: &Configuration,
        mut inherited: Facts,
        is_root: bool,
        op: Operation,
    ) -> Result<()> {
        let cfg = self
            .loader
            .apply_override(&dir_override_path(entry.path()), cfg, &mut inherited)?;

        let inherited = if is_root {
            inherited
        } else {
            info!(path = %entry.path().display(), "Visiting directory");
            let mut facts = inherited;
            self.derive(entry, &cfg, &mut facts)?;
            self.dispatch(entry, &cfg, &facts, op)?;
            facts
        };

        if !op.descends() {
            return Ok(());
        }

        for child in filter_children(entry.path(), &cfg) {
            let facts = inherited.clone();
            if child.is_dir() {
                self.visit_dir(&child, &cfg, facts, false, op)?;
            } else {
                self.visit_file(&child, &cfg, facts, op)?;
            }
        }
        Ok(())
    }

    fn visit_file(
        &self,
        entry: &PathEntry,
        cfg: &Configuration,
        mut facts: Facts,
        op: Operation,
    ) -> Result<()> {
        info!(path = %entry.path().display(), "Visiting file");
        // scoped to this file, siblings keep `cfg`
        let cfg = self
            .loader
            .apply_override(&file_override_path(entry.path()), cfg, &mut facts)?;
        self.derive(entry, &cfg, &mut facts)?;
        self.dispatch(entry, &cfg, &facts, op)
    }

    fn derive(&self, entry: &PathEntry, cfg: &Configuration, facts: &mut Facts) -> Result<()> {
        cfg.fact_deriver()?.derive(entry, cfg, facts)
    }

    fn dispatch(
        &self,
        entry: &PathEntry,
        cfg: &Configuration,
        facts: &Facts,
        op: Operation,
    ) -> Result<()> {
        let processor = cfg.processor()?;
        match op {
            Operation::Process => processor.process(entry, cfg, facts),
            Operation::Clean { .. } => processor.clean(entry, cfg, facts),
        }
        Ok(())
    }
}

/// Make `path` absolute and resolve `.` and `..` lexically.
///
/// Symlinks are left alone so that a process walk and a clean of the same
/// path see the same path strings.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(
            normalize_path(Path::new("/media/TV/./Show/../Other/")).unwrap(),
            PathBuf::from("/media/TV/Other")
        );
        assert_eq!(normalize_path(Path::new("/..")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn normalize_makes_relative_paths_absolute() {
        let out = normalize_path(Path::new("Show")).unwrap();
        assert!(out.is_absolute());
        assert!(out.ends_with("Show"));
    }

    #[test]
    fn clean_descends_only_when_recursive() {
        assert!(Operation::Process.descends());
        assert!(Operation::Clean { recursive: true }.descends());
        assert!(!Operation::Clean { recursive: false }.descends());
    }
}
