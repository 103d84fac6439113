//! Processors act on every node a walk visits.
//!
//! The walker hands each processor the node, the configuration in force and
//! the facts known there. Processors handle and log their own failures; a
//! failure on one node never stops the walk.

pub mod item;
pub mod mediabrowser;

pub use item::{classify, Classification, MediaItem};
pub use mediabrowser::MediaBrowserProcessor;

use crate::config::Configuration;
use crate::facts::Facts;
use crate::filter::PathEntry;

/// Writes (and removes) whatever a node needs.
///
/// Both operations must be idempotent: processing a node that is already
/// complete and cleaning a node that has nothing to remove are no-ops.
pub trait Processor: Send + Sync {
    /// Registered name, used in log output.
    fn name(&self) -> &'static str;

    /// Settings this processor reads, checked when the settings file is
    /// loaded.
    fn required_settings(&self) -> &'static [&'static str] {
        &[]
    }

    fn process(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts);

    fn clean(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts);
}
