//! MediaBrowser sidecar metadata.
//!
//! Writes the files MediaBrowser reads next to a media library:
//!
//! | Node | Files |
//! |------|-------|
//! | Series directory | `series.xml`, `folder.*`, `banner.*`, `backdrop*` |
//! | Season directory | `folder.*`, `banner.*`, `backdrop*` |
//! | Episode file | `metadata/<stem>.xml`, `metadata/<stem>.*` |
//! | Movie directory | `movie.xml`, `folder.*`, `backdrop*` |
//!
//! A node whose files are all present is left alone. Images are only handled
//! when `DOWNLOAD_IMAGES` is set, at most `MAX_NUMBER_OF_BACKDROPS` backdrops
//! are kept.

mod artwork;
mod sidecar;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use metaproc_common::{Error, Result};
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use self::artwork::Downloader;
use super::item::{classify, Classification, MediaItem};
use super::Processor;
use crate::config::{keys, Configuration};
use crate::facts::Facts;
use crate::filter::PathEntry;
use crate::metadata::provider::ranked;
use crate::metadata::providers::TmdbProvider;
use crate::metadata::{MediaImages, MetadataProvider};

const SERIES_FILE: &str = "series.xml";
const MOVIE_FILE: &str = "movie.xml";
const EPISODE_METADATA_DIR: &str = "metadata";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_MAX_BACKDROPS: usize = 3;

/// Artwork slots of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Poster,
    Banner,
    Backdrops,
}

impl Slot {
    const SERIES: &'static [Slot] = &[Slot::Poster, Slot::Banner, Slot::Backdrops];
    const SEASON: &'static [Slot] = &[Slot::Poster, Slot::Banner, Slot::Backdrops];
    const MOVIE: &'static [Slot] = &[Slot::Poster, Slot::Backdrops];

    fn stem(self) -> &'static str {
        match self {
            Slot::Poster => "folder",
            Slot::Banner => "banner",
            Slot::Backdrops => "backdrop",
        }
    }

    fn numbered(self) -> bool {
        self == Slot::Backdrops
    }

    fn present(self, dir: &Path) -> bool {
        artwork::present(dir, self.stem(), self.numbered())
    }
}

/// Per-node settings, read from the configuration in force at the node.
#[derive(Debug, Clone, Copy)]
struct Settings {
    download_images: bool,
    max_backdrops: usize,
}

impl Settings {
    fn from_config(cfg: &Configuration) -> Self {
        Self {
            download_images: cfg.bool(keys::DOWNLOAD_IMAGES).unwrap_or(false),
            max_backdrops: cfg
                .integer(keys::MAX_NUMBER_OF_BACKDROPS)
                .map(|n| usize::try_from(n).unwrap_or(0))
                .unwrap_or(DEFAULT_MAX_BACKDROPS),
        }
    }
}

/// Metadata sidecar files for MediaBrowser, looked up through a
/// [`MetadataProvider`].
pub struct MediaBrowserProcessor {
    provider: Arc<dyn MetadataProvider>,
    client: reqwest::Client,
    runtime: Runtime,
    series_ids: Mutex<HashMap<String, String>>,
    movie_ids: Mutex<HashMap<String, String>>,
}

impl MediaBrowserProcessor {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Result<Self> {
        if !provider.is_available() {
            return Err(Error::config(format!(
                "metadata provider '{}' is not configured",
                provider.name()
            )));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            provider,
            client: reqwest::Client::new(),
            runtime,
            series_ids: Mutex::new(HashMap::new()),
            movie_ids: Mutex::new(HashMap::new()),
        })
    }

    /// Build a processor backed by TMDB.
    ///
    /// The API key comes from the `TMDB_API_KEY` setting, falling back to the
    /// environment variable of the same name.
    pub fn from_config(cfg: &Configuration) -> Result<Self> {
        let api_key = cfg
            .text(keys::TMDB_API_KEY)
            .map(str::to_string)
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(keys::TMDB_API_KEY).ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "the mediabrowser processor needs a TMDB API key: set {0} in the settings file or the environment",
                    keys::TMDB_API_KEY
                ))
            })?;
        let language = cfg
            .text(keys::TMDB_LANGUAGE)
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();

        Self::new(Arc::new(TmdbProvider::new(api_key, language)))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn downloader(&self) -> Downloader<'_> {
        Downloader {
            client: &self.client,
            runtime: &self.runtime,
        }
    }

    fn series_id(&self, title: &str) -> anyhow::Result<String> {
        if let Some(id) = self.series_ids.lock().get(title) {
            return Ok(id.clone());
        }
        let results = self.block_on(self.provider.search_tv(title))?;
        let Some(best) = results.into_iter().next() else {
            bail!("{} has no match for series '{title}'", self.provider.name());
        };
        debug!(series = title, id = %best.id, matched = %best.title, "Series identified");
        self.series_ids
            .lock()
            .insert(title.to_string(), best.id.clone());
        Ok(best.id)
    }

    fn movie_id(&self, title: &str) -> anyhow::Result<String> {
        if let Some(id) = self.movie_ids.lock().get(title) {
            return Ok(id.clone());
        }
        let (name, year) = split_year(title);
        let results = self.block_on(self.provider.search_movie(name, year))?;
        let Some(best) = results.into_iter().next() else {
            bail!("{} has no match for movie '{title}'", self.provider.name());
        };
        debug!(movie = title, id = %best.id, matched = %best.title, "Movie identified");
        self.movie_ids
            .lock()
            .insert(title.to_string(), best.id.clone());
        Ok(best.id)
    }

    /// Fill the missing artwork slots of `dir`, fetching images only when
    /// something is missing.
    fn fill_slots<F>(&self, dir: &Path, slots: &[Slot], settings: Settings, fetch: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<MediaImages>,
    {
        let missing: Vec<Slot> = slots.iter().copied().filter(|s| !s.present(dir)).collect();
        if missing.is_empty() {
            return Ok(());
        }

        let images = fetch()?;
        let downloader = self.downloader();
        for slot in missing {
            info!(path = %dir.display(), slot = slot.stem(), "Downloading artwork");
            match slot {
                Slot::Poster => {
                    downloader.save_or_mark(dir, slot.stem(), ranked(&images.posters).first().copied())?
                }
                Slot::Banner => {
                    downloader.save_or_mark(dir, slot.stem(), ranked(&images.banners).first().copied())?
                }
                Slot::Backdrops => {
                    downloader.save_backdrops(dir, &ranked(&images.backdrops), settings.max_backdrops)?
                }
            }
        }
        Ok(())
    }

    fn slots_complete(dir: &Path, slots: &[Slot], settings: Settings) -> bool {
        !settings.download_images || slots.iter().all(|slot| slot.present(dir))
    }

    fn remove_slots(dir: &Path, slots: &[Slot]) -> anyhow::Result<()> {
        for slot in slots {
            let removed = artwork::remove(dir, slot.stem(), slot.numbered())?;
            if removed > 0 {
                info!(path = %dir.display(), slot = slot.stem(), removed, "Removed artwork");
            }
        }
        Ok(())
    }

    fn process_series(&self, dir: &Path, title: &str, settings: Settings) -> anyhow::Result<()> {
        let xml = dir.join(SERIES_FILE);
        if xml.exists() && Self::slots_complete(dir, Slot::SERIES, settings) {
            debug!(path = %dir.display(), "Series metadata is complete");
            return Ok(());
        }

        let id = self.series_id(title)?;
        if !xml.exists() {
            info!(path = %dir.display(), series = title, "Retrieving series metadata");
            let meta = self.block_on(self.provider.get_tv_metadata(&id))?;
            sidecar::write(&xml, &sidecar::series_document(&meta)?)?;
        }
        if settings.download_images {
            self.fill_slots(dir, Slot::SERIES, settings, || {
                self.block_on(self.provider.get_tv_images(&id))
            })?;
        }
        Ok(())
    }

    fn process_season(&self, dir: &Path, title: &str, season: u32, settings: Settings) -> anyhow::Result<()> {
        if Self::slots_complete(dir, Slot::SEASON, settings) {
            debug!(path = %dir.display(), "Season metadata is complete");
            return Ok(());
        }

        let id = self.series_id(title)?;
        info!(path = %dir.display(), series = title, season, "Retrieving season artwork");
        self.fill_slots(dir, Slot::SEASON, settings, || {
            self.block_on(self.provider.get_season_images(&id, season))
        })
    }

    fn process_episode(
        &self,
        file: &Path,
        title: &str,
        season: u32,
        episode: u32,
        settings: Settings,
    ) -> anyhow::Result<()> {
        let (dir, stem) = episode_location(file)?;
        let xml = dir.join(format!("{stem}.xml"));
        let image_done = !settings.download_images || artwork::present(&dir, &stem, false);
        if xml.exists() && image_done {
            debug!(path = %file.display(), "Episode metadata is complete");
            return Ok(());
        }

        let id = self.series_id(title)?;
        info!(path = %file.display(), series = title, season, episode, "Retrieving episode metadata");
        let meta = self.block_on(self.provider.get_episode_metadata(&id, season, episode))?;
        if !xml.exists() {
            sidecar::write(&xml, &sidecar::episode_document(&meta)?)?;
        }
        if !image_done {
            self.downloader().save_or_mark(&dir, &stem, meta.still.as_ref())?;
        }
        Ok(())
    }

    fn process_movie(&self, dir: &Path, title: &str, settings: Settings) -> anyhow::Result<()> {
        let xml = dir.join(MOVIE_FILE);
        if xml.exists() && Self::slots_complete(dir, Slot::MOVIE, settings) {
            debug!(path = %dir.display(), "Movie metadata is complete");
            return Ok(());
        }

        let id = self.movie_id(title)?;
        if !xml.exists() {
            info!(path = %dir.display(), movie = title, "Retrieving movie metadata");
            let meta = self.block_on(self.provider.get_movie_metadata(&id))?;
            sidecar::write(&xml, &sidecar::movie_document(&meta)?)?;
        }
        if settings.download_images {
            self.fill_slots(dir, Slot::MOVIE, settings, || {
                self.block_on(self.provider.get_movie_images(&id))
            })?;
        }
        Ok(())
    }

    fn process_item(&self, entry: &PathEntry, item: &MediaItem<'_>, settings: Settings) -> anyhow::Result<()> {
        let path = entry.path();
        match *item {
            MediaItem::Series { title } => self.process_series(path, title, settings),
            MediaItem::Season { title, season } => self.process_season(path, title, season, settings),
            MediaItem::Episode {
                title,
                season,
                episode,
            } => self.process_episode(path, title, season, episode, settings),
            MediaItem::Movie { title } => self.process_movie(path, title, settings),
        }
    }

    fn clean_item(&self, entry: &PathEntry, item: &MediaItem<'_>, settings: Settings) -> anyhow::Result<()> {
        let path = entry.path();
        let (xml, slots): (Option<PathBuf>, &[Slot]) = match item {
            MediaItem::Series { .. } => (Some(path.join(SERIES_FILE)), Slot::SERIES),
            MediaItem::Season { .. } => (None, Slot::SEASON),
            MediaItem::Movie { .. } => (Some(path.join(MOVIE_FILE)), Slot::MOVIE),
            MediaItem::Episode { .. } => {
                let (dir, stem) = episode_location(path)?;
                remove_file(&dir.join(format!("{stem}.xml")))?;
                if settings.download_images {
                    let removed = artwork::remove(&dir, &stem, false)?;
                    if removed > 0 {
                        info!(path = %path.display(), removed, "Removed episode artwork");
                    }
                }
                return Ok(());
            }
        };

        if let Some(xml) = xml {
            remove_file(&xml)?;
        }
        if settings.download_images {
            Self::remove_slots(path, slots)?;
        }
        Ok(())
    }

    /// Classify a node and run `action` on it, reporting what cannot be
    /// handled.
    fn dispatch<F>(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts, what: &str, action: F)
    where
        F: FnOnce(&MediaItem<'_>, Settings) -> anyhow::Result<()>,
    {
        let path = entry.path().display();
        match classify(entry, facts) {
            Classification::Item(item) => {
                if let Err(e) = action(&item, Settings::from_config(cfg)) {
                    error!(path = %path, error = %format!("{e:#}"), "Failed to {what} item");
                }
            }
            Classification::Ignored => {}
            Classification::Insufficient => {
                warn!(path = %path, facts = ?facts, "Not enough facts were available, skipping");
            }
            Classification::UnknownKind(kind) => {
                warn!(path = %path, item_type = kind.unwrap_or(""), "Unknown item type, skipping");
            }
        }
    }
}

impl Processor for MediaBrowserProcessor {
    fn name(&self) -> &'static str {
        "mediabrowser"
    }

    fn required_settings(&self) -> &'static [&'static str] {
        &[keys::DOWNLOAD_IMAGES, keys::MAX_NUMBER_OF_BACKDROPS]
    }

    fn process(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts) {
        self.dispatch(entry, cfg, facts, "process", |item, settings| {
            self.process_item(entry, item, settings)
        });
    }

    fn clean(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts) {
        self.dispatch(entry, cfg, facts, "clean", |item, settings| {
            self.clean_item(entry, item, settings)
        });
    }
}

/// Split a trailing release year off a movie title: `Heat (1995)` searches
/// for `Heat` released in 1995.
fn split_year(title: &str) -> (&str, Option<u16>) {
    let year = title
        .trim_end()
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once('('))
        .filter(|(_, year)| year.len() == 4)
        .and_then(|(name, year)| Some((name.trim_end(), year.parse::<u16>().ok()?)))
        .filter(|(name, _)| !name.is_empty());
    match year {
        Some((name, year)) => (name, Some(year)),
        None => (title, None),
    }
}

/// Directory and file stem of an episode's sidecar files.
fn episode_location(file: &Path) -> anyhow::Result<(PathBuf, String)> {
    let parent = file
        .parent()
        .with_context(|| format!("{} has no parent directory", file.display()))?;
    let stem = file
        .file_stem()
        .with_context(|| format!("{} has no file name", file.display()))?
        .to_string_lossy()
        .into_owned();
    Ok((parent.join(EPISODE_METADATA_DIR), stem))
}

fn remove_file(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Removed metadata");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}
