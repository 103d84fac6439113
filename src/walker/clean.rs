//! Cleaning a single path without walking its whole tree.
//!
//! Cleaning a node needs exactly the configuration and facts a process walk
//! would have had there. Instead of walking the tree, the chain of ancestors
//! from the root down to the target is replayed: each ancestor's override is
//! applied and its facts derived, and each step must be one a process walk
//! would have taken, otherwise the target is unreachable and the clean is
//! refused before anything is removed.

use std::path::{Path, PathBuf};

use metaproc_common::paths::dir_override_path;
use metaproc_common::{Error, Result};
use tracing::{debug, info};

use super::{normalize_path, Operation, TreeWalker};
use crate::config::{traversal_config, Configuration};
use crate::facts::Facts;
use crate::filter::{filter_children, PathEntry};

impl TreeWalker<'_> {
    /// Clean `target` under the first of `roots` that contains it.
    pub fn run_clean(
        &self,
        base: &Configuration,
        roots: &[PathBuf],
        target: &Path,
        recursive: bool,
    ) -> Result<()> {
        let target = normalize_path(target)?;

        let mut root = None;
        for candidate in roots {
            let candidate = normalize_path(candidate)?;
            if target.starts_with(&candidate) {
                root = Some(candidate);
                break;
            }
        }
        let root = root.ok_or_else(|| {
            Error::path(format!(
                "{} is not inside any configured directory",
                target.display()
            ))
        })?;

        self.perform_clean(&root, &target, &traversal_config(base), recursive)
    }

    /// Clean `target`, which must be `root` or below it, as a process walk
    /// started at `root` with `cfg` would have reached it.
    pub fn perform_clean(
        &self,
        root: &Path,
        target: &Path,
        cfg: &Configuration,
        recursive: bool,
    ) -> Result<()> {
        let op = Operation::Clean { recursive };

        let relative = target.strip_prefix(root).map_err(|_| {
            Error::path(format!(
                "{} is not inside {}",
                target.display(),
                root.display()
            ))
        })?;
        let target_entry = PathEntry::from_path(target)
            .map_err(|e| Error::path(format!("cannot clean {}: {e}", target.display())))?;

        let segments: Vec<_> = relative.components().map(|c| c.as_os_str()).collect();
        let Some((_, between)) = segments.split_last() else {
            if !target_entry.is_dir() {
                return Err(Error::path(format!("{} is not a directory", root.display())));
            }
            info!(path = %root.display(), "Cleaning from the top of the tree");
            return self.visit_dir(&target_entry, cfg, Facts::new(), true, op);
        };

        // root, then every directory between root and target
        let mut ancestors = vec![PathEntry::directory(root)];
        let mut path = root.to_path_buf();
        for segment in between {
            path.push(segment);
            ancestors.push(PathEntry::directory(path.clone()));
        }

        let mut cfg = cfg.clone();
        let mut facts = Facts::new();
        let mut admitted: Vec<PathEntry> = Vec::new();

        for (depth, ancestor) in ancestors.iter().enumerate() {
            if depth > 0 {
                ensure_admitted(ancestor, &admitted)?;
            }
            cfg = self
                .loader
                .apply_override(&dir_override_path(ancestor.path()), &cfg, &mut facts)?;
            if depth > 0 {
                self.derive(ancestor, &cfg, &mut facts)?;
            }
            admitted = filter_children(ancestor.path(), &cfg);
            debug!(path = %ancestor.path().display(), facts = ?facts, "Replayed ancestor");
        }

        ensure_admitted(&target_entry, &admitted)?;

        info!(path = %target.display(), recursive, "Cleaning");
        if target_entry.is_dir() {
            self.visit_dir(&target_entry, &cfg, facts, false, op)
        } else {
            self.visit_file(&target_entry, &cfg, facts, op)
        }
    }
}

/// A process walk only reaches `entry` if its parent's listing held it.
fn ensure_admitted(entry: &PathEntry, admitted: &[PathEntry]) -> Result<()> {
    if admitted.iter().any(|candidate| candidate.key() == entry.key()) {
        Ok(())
    } else {
        Err(Error::filtered(entry.path()))
    }
}
