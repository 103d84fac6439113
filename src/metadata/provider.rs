//! Trait definition and types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait that metadata backends
//! implement, along with the data types returned by provider queries. The
//! MediaBrowser processor only talks to this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A single result returned from a metadata search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-specific identifier for this item (e.g. TMDB numeric ID).
    pub id: String,
    /// Display title of the item.
    pub title: String,
    /// Release or premiere year, if known.
    pub year: Option<u16>,
    /// Short synopsis / overview text.
    pub overview: Option<String>,
    /// How confident the provider is that this result matches the query (0.0 - 1.0).
    pub confidence: f64,
    /// Name of the provider that returned this result (e.g. "tmdb").
    pub provider_name: String,
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Role a person played in a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    Actor,
    Director,
    Writer,
    GuestStar,
}

/// Cast or crew member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub role: PersonRole,
    /// Character played, for actors and guest stars.
    pub character: Option<String>,
}

/// Rich metadata for a movie or TV show.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Localised title.
    pub title: String,
    /// Original-language title, if different from `title`.
    pub original_title: Option<String>,
    /// Synopsis / overview text.
    pub overview: Option<String>,
    /// Marketing tagline (movies).
    pub tagline: Option<String>,
    /// Genre labels (e.g. "Action", "Drama").
    pub genres: Vec<String>,
    /// Production companies (movies).
    pub studios: Vec<String>,
    /// Broadcasting networks (TV shows).
    pub networks: Vec<String>,
    /// Airing status such as "Ended" or "Returning Series" (TV shows).
    pub status: Option<String>,
    /// Content rating such as "TV-MA", if the provider knows one.
    pub content_rating: Option<String>,
    /// Year the media was first released or premiered.
    pub production_year: Option<u16>,
    /// Exact premiere / release date as an ISO-8601 string (YYYY-MM-DD).
    pub premiere_date: Option<String>,
    /// Community / audience rating (typically 0.0 - 10.0).
    pub community_rating: Option<f64>,
    /// Runtime in minutes, if known.
    pub runtime_minutes: Option<u32>,
    /// Production budget in US dollars (movies).
    pub budget: Option<u64>,
    /// Cast and crew, billing order first.
    pub people: Vec<Person>,
    /// Map of external provider IDs keyed by provider name
    /// (e.g. `{"tmdb": "12345", "imdb": "tt1234567"}`).
    pub provider_ids: HashMap<String, String>,
}

/// Metadata for a single episode of a TV show.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    /// Provider-specific identifier of the episode.
    pub id: String,
    /// Provider-specific identifier of the show.
    pub series_id: String,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub season_number: u32,
    pub episode_number: u32,
    /// First air date as an ISO-8601 string (YYYY-MM-DD).
    pub air_date: Option<String>,
    pub community_rating: Option<f64>,
    pub production_code: Option<String>,
    /// Directors, writers and guest stars.
    pub people: Vec<Person>,
    /// Still image of the episode, if any.
    pub still: Option<ImageInfo>,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Collection of images associated with a movie, TV show or season.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaImages {
    /// Poster artwork.
    pub posters: Vec<ImageInfo>,
    /// Backdrop / fanart images.
    pub backdrops: Vec<ImageInfo>,
    /// Wide banner artwork. Providers without banners leave this empty.
    pub banners: Vec<ImageInfo>,
}

/// A single image with sizing and quality metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Fully-qualified URL to the image.
    pub url: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// ISO-639-1 language code for the image content, if applicable.
    pub language: Option<String>,
    /// Community vote average for this image (higher is better).
    pub vote_average: f64,
}

/// Images ordered best first: highest vote average, ties keep provider order.
pub fn ranked(images: &[ImageInfo]) -> Vec<&ImageInfo> {
    let mut ranked: Vec<&ImageInfo> = images.iter().collect();
    ranked.sort_by(|a, b| {
        b.vote_average
            .partial_cmp(&a.vote_average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all metadata providers must implement.
///
/// Each provider wraps a single external API and exposes a uniform interface
/// for searching and fetching metadata and artwork.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has been configured with valid
    /// credentials and is ready to serve requests.
    fn is_available(&self) -> bool;

    /// Search for movies matching `title`, optionally constrained by `year`.
    ///
    /// Results are sorted by descending `confidence`.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> anyhow::Result<Vec<SearchResult>>;

    /// Search for TV shows matching `title`.
    ///
    /// Results are sorted by descending `confidence`.
    async fn search_tv(&self, title: &str) -> anyhow::Result<Vec<SearchResult>>;

    /// Fetch full metadata, including cast and crew, for a movie.
    async fn get_movie_metadata(&self, provider_id: &str) -> anyhow::Result<MediaMetadata>;

    /// Fetch full metadata for a TV show.
    async fn get_tv_metadata(&self, provider_id: &str) -> anyhow::Result<MediaMetadata>;

    /// Fetch metadata for one episode of a TV show.
    async fn get_episode_metadata(
        &self,
        provider_id: &str,
        season: u32,
        episode: u32,
    ) -> anyhow::Result<EpisodeMetadata>;

    /// Fetch available artwork for a movie.
    async fn get_movie_images(&self, provider_id: &str) -> anyhow::Result<MediaImages>;

    /// Fetch available artwork for a TV show.
    async fn get_tv_images(&self, provider_id: &str) -> anyhow::Result<MediaImages>;

    /// Fetch available artwork for one season of a TV show.
    async fn get_season_images(
        &self,
        provider_id: &str,
        season: u32,
    ) -> anyhow::Result<MediaImages>;
}
