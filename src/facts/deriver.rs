use metaproc_common::{ItemKind, Result};
use tracing::{debug, warn};

use super::{Facts, EPISODE_NUMBER, MOVIE_TITLE, SEASON_NUMBER, SERIES_TITLE};
use crate::config::{keys, Configuration, Pattern};
use crate::filter::PathEntry;

/// Extends the facts of a node from its path and the configuration in force.
///
/// A deriver reads whatever facts are already present, may add or overwrite
/// any of them, and must cope with every fact being absent.
pub trait FactDeriver: Send + Sync {
    /// Registered name, used in log output.
    fn name(&self) -> &'static str;

    /// Settings this deriver reads, checked when the settings file is loaded.
    fn required_settings(&self) -> &'static [&'static str] {
        &[]
    }

    fn derive(&self, entry: &PathEntry, cfg: &Configuration, facts: &mut Facts) -> Result<()>;
}

/// Name-based heuristics for TV and movie trees.
///
/// TV trees are laid out as `Series/Season N/episode files`: a directory with
/// no series title names the series, the next directory is matched against
/// `TV_SEASON_FACTS_REGEXPS`, and files are matched against
/// `TV_FILE_FACTS_REGEXPS`. In movie trees a directory names its movie, a
/// file is matched against `MOVIE_TITLE_FACTS_REGEXPS`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactDeriver;

impl FactDeriver for DefaultFactDeriver {
    fn name(&self) -> &'static str {
        "default"
    }

    fn required_settings(&self) -> &'static [&'static str] {
        &[
            keys::TV_SEASON_FACTS_REGEXPS,
            keys::TV_FILE_FACTS_REGEXPS,
            keys::MOVIE_TITLE_FACTS_REGEXPS,
        ]
    }

    fn derive(&self, entry: &PathEntry, cfg: &Configuration, facts: &mut Facts) -> Result<()> {
        let name = entry.name();

        match facts.item_kind() {
            Some(Ok(ItemKind::Tv)) => {
                let has_series = facts.known(SERIES_TITLE).is_some();
                let has_season = facts.known(SEASON_NUMBER).is_some();
                let has_episode = facts.known(EPISODE_NUMBER).is_some();

                if entry.is_file() && !(has_series && has_season && has_episode) {
                    apply_first_match(cfg.patterns(keys::TV_FILE_FACTS_REGEXPS), &name, facts);
                } else if has_series && !has_season {
                    apply_first_match(cfg.patterns(keys::TV_SEASON_FACTS_REGEXPS), &name, facts);
                } else if !has_series {
                    facts.insert(SERIES_TITLE, &*name);
                }
            }
            Some(Ok(ItemKind::Movie)) => {
                if facts.known(MOVIE_TITLE).is_none() {
                    if entry.is_file() {
                        apply_first_match(
                            cfg.patterns(keys::MOVIE_TITLE_FACTS_REGEXPS),
                            &name,
                            facts,
                        );
                    } else {
                        facts.insert(MOVIE_TITLE, &*name);
                    }
                }
            }
            Some(Err(other)) => {
                warn!(path = %entry.path().display(), item_type = other, "Unknown item type");
            }
            None => {
                warn!(path = %entry.path().display(), "No item type is known");
            }
        }

        Ok(())
    }
}

/// Merge the named groups of the first pattern matching `name`.
fn apply_first_match<'a>(
    patterns: impl Iterator<Item = &'a Pattern>,
    name: &str,
    facts: &mut Facts,
) {
    for pattern in patterns {
        let Some(caps) = pattern.captures(name) else {
            continue;
        };
        debug!(pattern = pattern.as_str(), name, "Matched fact pattern");
        for group in pattern.group_names() {
            if let Some(m) = caps.name(group) {
                facts.insert(group, normalize(group, m.as_str()));
            }
        }
        return;
    }
}

/// `*_number` facts are stored as plain decimals, so `01` and `1` agree.
fn normalize(group: &str, value: &str) -> String {
    if group.ends_with("_number") {
        if let Ok(n) = value.parse::<u64>() {
            return n.to_string();
        }
    }
    value.to_string()
}
