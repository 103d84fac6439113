//! Common error types used throughout metaproc.
//!
//! Configuration problems are foundational and abort a run, path problems are
//! specific to clean operations. Each variant maps to a distinct process exit
//! status via [`Error::exit_code`].

use std::path::PathBuf;

/// Common error type for metaproc.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A settings file or override layer is malformed or incomplete, a
    /// reference cannot be resolved, or a pattern does not compile.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A clean target is not inside any configured root, or does not exist.
    #[error("Path error: {0}")]
    Path(String),

    /// A clean target (or one of its ancestors) is excluded by the active
    /// path filters, so a process run would never reach it either.
    #[error("Path is excluded by the configured filters: {}", path.display())]
    FilteredPath {
        /// The first path of the chain that the filters rejected.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Path error.
    pub fn path<S: Into<String>>(msg: S) -> Self {
        Self::Path(msg.into())
    }

    /// Create a new FilteredPath error.
    pub fn filtered<P: Into<PathBuf>>(path: P) -> Self {
        Self::FilteredPath { path: path.into() }
    }

    /// Map this error to the exit status reported by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 1,
            Error::Path(_) => 2,
            Error::FilteredPath { .. } => 3,
            Error::Io(_) => 1,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("PROCESSOR is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: PROCESSOR is not set"
        );

        let err = Error::path("/tmp/x is not inside a configured root");
        assert_eq!(
            err.to_string(),
            "Path error: /tmp/x is not inside a configured root"
        );

        let err = Error::filtered("/media/TV/Show/metadata");
        assert_eq!(
            err.to_string(),
            "Path is excluded by the configured filters: /media/TV/Show/metadata"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_exit_codes_are_distinct_for_path_errors() {
        assert_eq!(Error::config("x").exit_code(), 1);
        assert_eq!(Error::path("x").exit_code(), 2);
        assert_eq!(Error::filtered("/x").exit_code(), 3);
    }

    #[test]
    fn test_error_string_into() {
        let err = Error::config(String::from("test"));
        assert!(matches!(err, Error::Config(ref m) if m == "test"));
    }
}
