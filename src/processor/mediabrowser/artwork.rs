//! Sidecar artwork files.
//!
//! Artwork is stored next to the item as `<stem>.<ext>`. When the provider
//! has nothing for a slot, an empty `<stem>.noimage` marker is written so the
//! lookup is not repeated on the next run.

use std::path::{Path, PathBuf};

use anyhow::Context;
use metaproc_common::paths::{is_image_file, is_no_image_marker, NO_IMAGE_EXTENSION};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::metadata::ImageInfo;

/// Extension used when an image URL carries none.
const DEFAULT_EXTENSION: &str = "jpg";

/// Artwork files and markers in `dir` whose stem is exactly `stem`, or
/// `stem` followed by digits when `numbered` is set (`backdrop`,
/// `backdrop1`, ...).
pub fn find(dir: &Path, stem: &str, numbered: bool) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(stem),
    );

    match glob::glob(&pattern) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .filter(|p| is_image_file(p) || is_no_image_marker(p))
            .filter(|p| in_slot(p, stem, numbered))
            .collect(),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid artwork pattern");
            Vec::new()
        }
    }
}

/// Whether the file stem of `path` names the slot `stem`.
fn in_slot(path: &Path, stem: &str, numbered: bool) -> bool {
    let Some(file_stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    match file_stem.strip_prefix(stem) {
        Some("") => true,
        Some(index) => numbered && index.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Whether a slot already holds artwork or a marker.
pub fn present(dir: &Path, stem: &str, numbered: bool) -> bool {
    !find(dir, stem, numbered).is_empty()
}

/// Remove the artwork and markers of a slot. Returns how many files went.
pub fn remove(dir: &Path, stem: &str, numbered: bool) -> anyhow::Result<usize> {
    let files = find(dir, stem, numbered);
    for file in &files {
        std::fs::remove_file(file)
            .with_context(|| format!("failed to remove {}", file.display()))?;
    }
    Ok(files.len())
}

/// Drop the "nothing available" marker for a slot.
pub fn mark_missing(dir: &Path, stem: &str) -> anyhow::Result<()> {
    let marker = dir.join(format!("{stem}.{NO_IMAGE_EXTENSION}"));
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    std::fs::File::create(&marker)
        .with_context(|| format!("failed to create {}", marker.display()))?;
    debug!(path = %marker.display(), "No artwork available, marker written");
    Ok(())
}

/// Extension of the file an image URL points at.
fn extension_of(url: &str) -> &str {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => DEFAULT_EXTENSION,
    }
}

/// Downloads artwork over HTTP, blocking on the processor's runtime.
pub struct Downloader<'a> {
    pub client: &'a reqwest::Client,
    pub runtime: &'a Runtime,
}

impl Downloader<'_> {
    /// Save `image` as `<dir>/<stem>.<ext>`, or mark the slot when there is
    /// no image.
    pub fn save_or_mark(&self, dir: &Path, stem: &str, image: Option<&ImageInfo>) -> anyhow::Result<()> {
        match image {
            Some(image) => self.download(&image.url, dir, stem).map(|_| ()),
            None => mark_missing(dir, stem),
        }
    }

    /// Save up to `max` images as `backdrop`, `backdrop1`, `backdrop2`, ...
    pub fn save_backdrops(&self, dir: &Path, images: &[&ImageInfo], max: usize) -> anyhow::Result<()> {
        if images.is_empty() || max == 0 {
            return mark_missing(dir, "backdrop");
        }
        for (i, image) in images.iter().take(max).enumerate() {
            let stem = if i == 0 {
                "backdrop".to_string()
            } else {
                format!("backdrop{i}")
            };
            self.download(&image.url, dir, &stem)?;
        }
        Ok(())
    }

    fn download(&self, url: &str, dir: &Path, stem: &str) -> anyhow::Result<PathBuf> {
        let dest = dir.join(format!("{stem}.{}", extension_of(url)));
        debug!(url, dest = %dest.display(), "Downloading artwork");

        let bytes = self
            .runtime
            .block_on(async {
                let resp = self.client.get(url).send().await?.error_for_status()?;
                resp.bytes().await
            })
            .with_context(|| format!("failed to download {url}"))?;

        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        std::fs::write(&dest, &bytes).with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(dest)
    }
}
