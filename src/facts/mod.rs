//! Contextual facts discovered while walking a media tree.

mod deriver;

pub use deriver::{DefaultFactDeriver, FactDeriver};

use std::collections::BTreeMap;
use std::fmt;

use metaproc_common::ItemKind;
use serde::{Deserialize, Serialize};

/// Kind of media the branch holds (`tv` or `movie`).
pub const TYPE: &str = "type";
pub const SERIES_TITLE: &str = "series_title";
pub const SEASON_NUMBER: &str = "season_number";
pub const EPISODE_NUMBER: &str = "episode_number";
pub const MOVIE_TITLE: &str = "movie_title";

/// Fact name to value, scoped to one branch of the tree.
///
/// A child always receives its own copy, so nothing a child adds is visible
/// to its siblings or its parent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facts(BTreeMap<String, String>);

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The value of `name` if it is present and not empty.
    pub fn known(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Overwrite or add every fact of `other`.
    pub fn merge(&mut self, other: &Facts) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Kind of media from the `type` fact. `None` when the fact is missing,
    /// `Some(Err(value))` when it names no known kind.
    pub fn item_kind(&self) -> Option<std::result::Result<ItemKind, &str>> {
        self.known(TYPE)
            .map(|value| value.parse::<ItemKind>().map_err(|_| value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Facts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Facts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
