//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.
//! - Confidence scoring based on title similarity and year proximity.
//!
//! TMDB publishes no wide banner artwork, so [`MediaImages::banners`] is
//! always empty.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metadata::provider::{
    EpisodeMetadata, ImageInfo, MediaImages, MediaMetadata, MetadataProvider, Person, PersonRole,
    SearchResult,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvSearchResult {
    id: u64,
    name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    tagline: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    runtime: Option<u32>,
    budget: Option<u64>,
    genres: Option<Vec<TmdbNamed>>,
    production_companies: Option<Vec<TmdbNamed>>,
    imdb_id: Option<String>,
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetail {
    id: u64,
    name: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    episode_run_time: Option<Vec<u32>>,
    status: Option<String>,
    genres: Option<Vec<TmdbNamed>>,
    networks: Option<Vec<TmdbNamed>>,
    external_ids: Option<TmdbExternalIds>,
    content_ratings: Option<TmdbContentRatings>,
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisodeDetail {
    id: u64,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    season_number: u32,
    episode_number: u32,
    vote_average: Option<f64>,
    production_code: Option<String>,
    still_path: Option<String>,
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
    #[serde(default)]
    guest_stars: Vec<TmdbCastMember>,
}

#[derive(Debug, Deserialize)]
struct TmdbNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCastMember>,
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Deserialize)]
struct TmdbCastMember {
    name: String,
    character: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrewMember {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TmdbContentRatings {
    results: Vec<TmdbContentRating>,
}

#[derive(Debug, Deserialize)]
struct TmdbContentRating {
    iso_3166_1: String,
    rating: String,
}

#[derive(Debug, Deserialize)]
struct TmdbImagesResponse {
    posters: Option<Vec<TmdbImage>>,
    backdrops: Option<Vec<TmdbImage>>,
}

#[derive(Debug, Deserialize)]
struct TmdbImage {
    file_path: String,
    width: u32,
    height: u32,
    iso_639_1: Option<String>,
    vote_average: f64,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// Wraps the TMDB v3 REST API with built-in rate limiting, retry logic, and
/// confidence-scored search results.
///
/// # Examples
///
/// ```no_run
/// use metaproc::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into());
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    image_base: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider with the given API key and language.
    ///
    /// The `language` parameter should be a language tag such as `"en-US"`.
    /// Rate limiting is configured at 4 requests per second.
    pub fn new(api_key: String, language: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        let quota = Quota::per_second(NonZeroU32::new(4).unwrap());
        let rate_limiter = RateLimiter::direct(quota);

        Self {
            client,
            api_key,
            language,
            base_url: TMDB_BASE_URL.to_string(),
            image_base: TMDB_IMAGE_BASE.to_string(),
            rate_limiter,
        }
    }

    /// Send API requests to `base_url` instead of the public TMDB endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build image URLs on `image_base` instead of the public TMDB CDN.
    pub fn with_image_base(mut self, image_base: impl Into<String>) -> Self {
        self.image_base = image_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(reqwest::Error::without_url)
                .with_context(|| format!("TMDB request failed: {}", self.redact(url)))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let status = resp.status();
            if !status.is_success() {
                bail!("TMDB request returned {status}: {}", self.redact(url));
            }

            return Ok(resp);
        }
    }

    /// GET `path` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_params: &[(&str, &str)],
        what: &str,
    ) -> anyhow::Result<T> {
        let url = self.url(path, extra_params);
        debug!(url = %self.redact(&url), "TMDB {what}");

        self.get(&url)
            .await?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("failed to parse TMDB {what} response"))
    }

    /// Build a full API URL with the API key and language query parameters.
    fn url(&self, path: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoded(&self.api_key),
            urlencoded(&self.language)
        );
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoded(value));
        }
        url
    }

    /// `url` with the API key masked, for logs and error messages.
    fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.replace(&urlencoded(&self.api_key), "***")
    }

    /// Image languages to ask for: the configured one plus language-neutral
    /// artwork, which most backdrops are.
    fn image_languages(&self) -> String {
        let primary = self.language.split('-').next().unwrap_or_default();
        format!("{primary},null")
    }

    /// Region of the configured language (`"US"` for `"en-US"`).
    fn region(&self) -> Option<&str> {
        self.language.split_once('-').map(|(_, region)| region)
    }

    async fn fetch_images(&self, path: &str, what: &str) -> anyhow::Result<MediaImages> {
        let languages = self.image_languages();
        let resp: TmdbImagesResponse = self
            .get_json(path, &[("include_image_language", languages.as_str())], what)
            .await?;

        let convert = |images: Option<Vec<TmdbImage>>| -> Vec<ImageInfo> {
            images
                .unwrap_or_default()
                .iter()
                .map(|img| self.to_image_info(img))
                .collect()
        };

        Ok(MediaImages {
            posters: convert(resp.posters),
            backdrops: convert(resp.backdrops),
            banners: Vec::new(),
        })
    }

    /// Convert a TMDB image path fragment to a full URL.
    fn image_url(&self, path: &str) -> String {
        format!("{}{path}", self.image_base)
    }

    /// Convert a [`TmdbImage`] to an [`ImageInfo`].
    fn to_image_info(&self, img: &TmdbImage) -> ImageInfo {
        ImageInfo {
            url: self.image_url(&img.file_path),
            width: img.width,
            height: img.height,
            language: img.iso_639_1.clone(),
            vote_average: img.vote_average,
        }
    }

    /// Compute confidence score for a search result based on title similarity
    /// and year proximity.
    fn confidence(
        query_title: &str,
        result_title: &str,
        query_year: Option<u16>,
        result_year: Option<u16>,
    ) -> f64 {
        let base = if query_title == result_title {
            0.5
        } else if query_title.eq_ignore_ascii_case(result_title) {
            0.4
        } else if result_title
            .to_ascii_lowercase()
            .contains(&query_title.to_ascii_lowercase())
        {
            0.2
        } else {
            0.1
        };

        let year_bonus = match (query_year, result_year) {
            (Some(q), Some(r)) if q == r => 0.3,
            (Some(q), Some(r)) if q.abs_diff(r) <= 1 => 0.15,
            _ => 0.0,
        };

        base + year_bonus
    }
}

/// Minimal percent-encoding for query parameter values.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

fn names(items: Option<Vec<TmdbNamed>>) -> Vec<String> {
    items.unwrap_or_default().into_iter().map(|n| n.name).collect()
}

/// Directors and writers out of a crew list, other jobs are dropped.
fn crew_people(crew: Vec<TmdbCrewMember>) -> impl Iterator<Item = Person> {
    crew.into_iter().filter_map(|member| {
        let role = match member.job.as_deref() {
            Some("Director") => PersonRole::Director,
            Some("Writer") | Some("Screenplay") | Some("Teleplay") => PersonRole::Writer,
            _ => return None,
        };
        Some(Person {
            name: member.name,
            role,
            character: None,
        })
    })
}

fn cast_people(cast: Vec<TmdbCastMember>, role: PersonRole) -> impl Iterator<Item = Person> {
    cast.into_iter().map(move |member| Person {
        name: member.name,
        role,
        character: member.character.filter(|c| !c.is_empty()),
    })
}

/// Rating for `region`, falling back to the first one listed.
fn pick_content_rating(ratings: Option<TmdbContentRatings>, region: Option<&str>) -> Option<String> {
    let results = ratings?.results;
    let preferred = region.and_then(|region| {
        results
            .iter()
            .position(|r| r.iso_3166_1.eq_ignore_ascii_case(region))
    });
    let index = preferred.unwrap_or(0);
    results
        .into_iter()
        .nth(index)
        .map(|r| r.rating)
        .filter(|r| !r.is_empty())
}

fn by_confidence(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let mut params = vec![("query", title)];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push(("year", y.as_str()));
        }

        let body: TmdbSearchResponse<TmdbMovieSearchResult> =
            self.get_json("/search/movie", &params, "movie search").await?;

        let mut results: Vec<SearchResult> = body
            .results
            .into_iter()
            .map(|r| {
                let result_title = r.title.unwrap_or_default();
                let result_year = parse_year(&r.release_date);
                let confidence = Self::confidence(title, &result_title, year, result_year);
                SearchResult {
                    id: r.id.to_string(),
                    title: result_title,
                    year: result_year,
                    overview: r.overview,
                    confidence,
                    provider_name: "tmdb".to_string(),
                }
            })
            .collect();

        by_confidence(&mut results);
        Ok(results)
    }

    async fn search_tv(&self, title: &str) -> anyhow::Result<Vec<SearchResult>> {
        let body: TmdbSearchResponse<TmdbTvSearchResult> = self
            .get_json("/search/tv", &[("query", title)], "TV search")
            .await?;

        let mut results: Vec<SearchResult> = body
            .results
            .into_iter()
            .map(|r| {
                let result_title = r.name.unwrap_or_default();
                let result_year = parse_year(&r.first_air_date);
                let confidence = Self::confidence(title, &result_title, None, result_year);
                SearchResult {
                    id: r.id.to_string(),
                    title: result_title,
                    year: result_year,
                    overview: r.overview,
                    confidence,
                    provider_name: "tmdb".to_string(),
                }
            })
            .collect();

        by_confidence(&mut results);
        Ok(results)
    }

    async fn get_movie_metadata(&self, provider_id: &str) -> anyhow::Result<MediaMetadata> {
        let detail: TmdbMovieDetail = self
            .get_json(
                &format!("/movie/{provider_id}"),
                &[("append_to_response", "credits")],
                "movie detail",
            )
            .await?;

        let mut provider_ids = HashMap::new();
        provider_ids.insert("tmdb".to_string(), detail.id.to_string());
        if let Some(imdb) = detail.imdb_id.filter(|id| !id.is_empty()) {
            provider_ids.insert("imdb".to_string(), imdb);
        }

        let mut people = Vec::new();
        if let Some(credits) = detail.credits {
            people.extend(cast_people(credits.cast, PersonRole::Actor));
            people.extend(crew_people(credits.crew));
        }

        Ok(MediaMetadata {
            title: detail.title.unwrap_or_default(),
            original_title: detail.original_title,
            overview: detail.overview,
            tagline: detail.tagline.filter(|t| !t.is_empty()),
            genres: names(detail.genres),
            studios: names(detail.production_companies),
            production_year: parse_year(&detail.release_date),
            premiere_date: detail.release_date,
            community_rating: detail.vote_average,
            runtime_minutes: detail.runtime,
            budget: detail.budget.filter(|b| *b > 0),
            people,
            provider_ids,
            ..MediaMetadata::default()
        })
    }

    async fn get_tv_metadata(&self, provider_id: &str) -> anyhow::Result<MediaMetadata> {
        let detail: TmdbTvDetail = self
            .get_json(
                &format!("/tv/{provider_id}"),
                &[("append_to_response", "external_ids,content_ratings,credits")],
                "TV detail",
            )
            .await?;

        let mut provider_ids = HashMap::new();
        provider_ids.insert("tmdb".to_string(), detail.id.to_string());
        if let Some(ref ext) = detail.external_ids {
            if let Some(ref imdb) = ext.imdb_id {
                provider_ids.insert("imdb".to_string(), imdb.clone());
            }
            if let Some(tvdb) = ext.tvdb_id {
                provider_ids.insert("tvdb".to_string(), tvdb.to_string());
            }
        }

        let runtime = detail
            .episode_run_time
            .as_ref()
            .and_then(|v| v.first().copied());

        let people = detail
            .credits
            .map(|credits| cast_people(credits.cast, PersonRole::Actor).collect())
            .unwrap_or_default();

        Ok(MediaMetadata {
            title: detail.name.unwrap_or_default(),
            original_title: detail.original_name,
            overview: detail.overview,
            genres: names(detail.genres),
            networks: names(detail.networks),
            status: detail.status,
            content_rating: pick_content_rating(detail.content_ratings, self.region()),
            production_year: parse_year(&detail.first_air_date),
            premiere_date: detail.first_air_date,
            community_rating: detail.vote_average,
            runtime_minutes: runtime,
            people,
            provider_ids,
            ..MediaMetadata::default()
        })
    }

    async fn get_episode_metadata(
        &self,
        provider_id: &str,
        season: u32,
        episode: u32,
    ) -> anyhow::Result<EpisodeMetadata> {
        let detail: TmdbEpisodeDetail = self
            .get_json(
                &format!("/tv/{provider_id}/season/{season}/episode/{episode}"),
                &[],
                "episode detail",
            )
            .await?;

        let mut people: Vec<Person> = crew_people(detail.crew).collect();
        people.extend(cast_people(detail.guest_stars, PersonRole::GuestStar));

        let still = detail.still_path.map(|path| ImageInfo {
            url: self.image_url(&path),
            width: 0,
            height: 0,
            language: None,
            vote_average: 0.0,
        });

        Ok(EpisodeMetadata {
            id: detail.id.to_string(),
            series_id: provider_id.to_string(),
            name: detail.name,
            overview: detail.overview,
            season_number: detail.season_number,
            episode_number: detail.episode_number,
            air_date: detail.air_date,
            community_rating: detail.vote_average,
            production_code: detail.production_code.filter(|c| !c.is_empty()),
            people,
            still,
        })
    }

    async fn get_movie_images(&self, provider_id: &str) -> anyhow::Result<MediaImages> {
        self.fetch_images(&format!("/movie/{provider_id}/images"), "movie images")
            .await
    }

    async fn get_tv_images(&self, provider_id: &str) -> anyhow::Result<MediaImages> {
        self.fetch_images(&format!("/tv/{provider_id}/images"), "TV images")
            .await
    }

    async fn get_season_images(
        &self,
        provider_id: &str,
        season: u32,
    ) -> anyhow::Result<MediaImages> {
        self.fetch_images(
            &format!("/tv/{provider_id}/season/{season}/images"),
            "season images",
        )
        .await
    }
}
