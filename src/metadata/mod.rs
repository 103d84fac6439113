//! Metadata lookups against external services.
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`providers`] -- Concrete provider implementations (TMDB).

pub mod provider;
pub mod providers;

pub use provider::{
    EpisodeMetadata, ImageInfo, MediaImages, MediaMetadata, MetadataProvider, Person, PersonRole,
    SearchResult,
};
