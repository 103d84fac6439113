//! Metaproc - media library metadata processor
//!
//! Walks media directory trees, derives facts such as series title and
//! episode number from layered configuration, and hands every node to a
//! processor that writes metadata sidecar files. This library crate exposes
//! the core functionality for integration testing.

pub mod config;
pub mod facts;
pub mod filter;
pub mod metadata;
pub mod processor;
pub mod registry;
pub mod walker;
