//! Path conventions shared by the tree walker and the processors.
//!
//! Override layers live next to the item they configure: a directory's layer
//! is a reserved file inside it, a file's layer is the file name plus the same
//! reserved suffix. Sidecar artwork is recognised by extension, with a
//! `.noimage` marker standing in for artwork that does not exist upstream.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Reserved name of a directory override layer, also the suffix of a file's.
pub const OVERRIDE_FILE_NAME: &str = ".metaproc-override";

/// Extension of the marker dropped when no artwork is available.
pub const NO_IMAGE_EXTENSION: &str = "noimage";

/// List of sidecar image extensions written by processors.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Path of the override layer for the directory `dir`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use metaproc_common::paths::dir_override_path;
///
/// assert_eq!(
///     dir_override_path(Path::new("/media/TV/Entourage")),
///     Path::new("/media/TV/Entourage/.metaproc-override")
/// );
/// ```
pub fn dir_override_path(dir: &Path) -> PathBuf {
    dir.join(OVERRIDE_FILE_NAME)
}

/// Path of the override layer for the file `file`, a sibling of it.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use metaproc_common::paths::file_override_path;
///
/// assert_eq!(
///     file_override_path(Path::new("/media/TV/Show/ep.mkv")),
///     Path::new("/media/TV/Show/ep.mkv.metaproc-override")
/// );
/// ```
pub fn file_override_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(OVERRIDE_FILE_NAME);
    PathBuf::from(name)
}

/// Check if a path names an override layer of either form.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use metaproc_common::paths::is_override_file;
///
/// assert!(is_override_file(Path::new("/media/TV/.metaproc-override")));
/// assert!(is_override_file(Path::new("/media/TV/ep.mkv.metaproc-override")));
/// assert!(!is_override_file(Path::new("/media/TV/ep.mkv")));
/// ```
pub fn is_override_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(OVERRIDE_FILE_NAME))
        .unwrap_or(false)
}

/// Check if a path has a sidecar image extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use metaproc_common::paths::is_image_file;
///
/// assert!(is_image_file(Path::new("folder.jpg")));
/// assert!(is_image_file(Path::new("/path/to/backdrop1.png")));
/// assert!(!is_image_file(Path::new("series.xml")));
/// ```
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path is a "no artwork available" marker.
pub fn is_no_image_marker(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == NO_IMAGE_EXTENSION)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_override_path_keeps_full_name() {
        assert_eq!(
            file_override_path(Path::new("a/Show.S01E01.mkv")),
            Path::new("a/Show.S01E01.mkv.metaproc-override")
        );
        assert_eq!(
            file_override_path(Path::new("no_extension")),
            Path::new("no_extension.metaproc-override")
        );
    }

    #[test]
    fn test_is_override_file() {
        assert!(is_override_file(Path::new(".metaproc-override")));
        assert!(is_override_file(Path::new("x/.metaproc-override")));
        assert!(is_override_file(Path::new("x/movie.avi.metaproc-override")));

        assert!(!is_override_file(Path::new("x/metaproc-override.txt")));
        assert!(!is_override_file(Path::new("x/")));
        assert!(!is_override_file(Path::new("")));
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("folder.jpg")));
        assert!(is_image_file(Path::new("banner.png")));

        // Case insensitive
        assert!(is_image_file(Path::new("folder.JPG")));

        // Not sidecar images
        assert!(!is_image_file(Path::new("folder.noimage")));
        assert!(!is_image_file(Path::new("poster.gif")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn test_is_no_image_marker() {
        assert!(is_no_image_marker(Path::new("folder.noimage")));
        assert!(is_no_image_marker(Path::new("metadata/ep.noimage")));
        assert!(!is_no_image_marker(Path::new("folder.jpg")));
    }
}
