//! Metaproc-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across metaproc:
//!
//! - **Error Handling**: The error taxonomy shared by the configuration layer,
//!   the tree walker, and the CLI, plus a result alias
//! - **Core Types**: The closed set of item kinds a media tree can hold
//! - **Path Utilities**: Override-file discovery and sidecar image detection
//!
//! # Examples
//!
//! ```
//! use metaproc_common::{Error, ItemKind, Result};
//! use metaproc_common::paths::dir_override_path;
//! use std::path::Path;
//!
//! // Parse the kind of a media tree from its `type` fact
//! let kind: ItemKind = "TV".parse().unwrap();
//! assert_eq!(kind, ItemKind::Tv);
//!
//! // Locate the override layer of a directory
//! let layer = dir_override_path(Path::new("/media/TV"));
//! assert!(layer.ends_with(".metaproc-override"));
//!
//! // Use common error types
//! fn example() -> Result<()> {
//!     Err(Error::config("PROCESSOR is not set"))
//! }
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
