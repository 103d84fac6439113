//! Names of the settings the walker and the built-in components read.

/// Top-level directories to walk. Read from the settings file only.
pub const DIRS_TO_PROCESS: &str = "DIRS_TO_PROCESS";

/// Name of the fact deriver to run on every node.
pub const FACTS_FUNCTION: &str = "FACTS_FUNCTION";

/// Name of the processor that acts on every node.
pub const PROCESSOR: &str = "PROCESSOR";

/// Patterns a child path must match at least one of.
pub const PATH_INCLUDE_REGEXPS: &str = "PATH_INCLUDE_REGEXPS";

/// Patterns a child path must match none of.
pub const PATH_EXCLUDE_REGEXPS: &str = "PATH_EXCLUDE_REGEXPS";

pub const TV_SEASON_FACTS_REGEXPS: &str = "TV_SEASON_FACTS_REGEXPS";
pub const TV_FILE_FACTS_REGEXPS: &str = "TV_FILE_FACTS_REGEXPS";
pub const MOVIE_TITLE_FACTS_REGEXPS: &str = "MOVIE_TITLE_FACTS_REGEXPS";

pub const DOWNLOAD_IMAGES: &str = "DOWNLOAD_IMAGES";
pub const MAX_NUMBER_OF_BACKDROPS: &str = "MAX_NUMBER_OF_BACKDROPS";
pub const TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const TMDB_LANGUAGE: &str = "TMDB_LANGUAGE";

/// Reserved block of an override layer holding facts rather than settings.
pub const FACTS_BLOCK: &str = "facts";

/// Suffix of settings holding one compiled pattern.
pub const PATTERN_SUFFIX: &str = "_REGEXP";

/// Suffix of settings holding a list of compiled patterns.
pub const PATTERN_LIST_SUFFIX: &str = "_REGEXPS";

/// Settings that only make sense in the settings file and are removed
/// before traversal begins.
pub const APP_ONLY_SETTINGS: &[&str] = &[DIRS_TO_PROCESS];

/// Settings every run needs, whatever processor it uses.
pub const REQUIRED_SETTINGS: &[&str] = &[
    DIRS_TO_PROCESS,
    FACTS_FUNCTION,
    PROCESSOR,
    PATH_INCLUDE_REGEXPS,
    PATH_EXCLUDE_REGEXPS,
];
