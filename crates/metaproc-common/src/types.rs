//! Core type definitions for media trees.
//!
//! The `type` fact of a media tree is free text in configuration, but every
//! consumer dispatches on the closed [`ItemKind`] set instead of comparing
//! strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media a tree holds, taken from its `type` fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// TV series, laid out as series / season / episode files.
    Tv,
    /// Movies, one directory per movie.
    Movie,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tv => write!(f, "tv"),
            Self::Movie => write!(f, "movie"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tv" => Ok(Self::Tv),
            "movie" => Ok(Self::Movie),
            _ => Err(format!("Unknown item type: {}", s)),
        }
    }
}
