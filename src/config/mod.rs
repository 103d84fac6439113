//! Settings files and override layers.
//!
//! A run starts from one settings file (the base configuration). Every
//! directory or file in a media tree may carry an override layer that is
//! evaluated against the configuration inherited at that point and merged
//! over it. Each load compiles pattern settings and resolves the processor
//! and fact deriver names to live handles before the result is used.

pub mod eval;
pub mod keys;
mod patterns;
mod types;

pub use patterns::compile_patterns;
pub use types::*;

use std::path::{Path, PathBuf};

use metaproc_common::{Error, Result};

use crate::facts::Facts;
use crate::registry::Registry;

/// Settings file locations tried when none is given explicitly.
const DEFAULT_SETTINGS_PATHS: &[&str] = &[
    "./metaproc.toml",
    "~/.config/metaproc/config.toml",
    "/etc/metaproc/config.toml",
];

/// Find the settings file to use.
///
/// An explicit path is returned as is. Otherwise the first existing default
/// location wins; there are no built-in defaults, so finding none is an error.
pub fn locate_settings_file(custom_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = custom_path {
        return Ok(path.to_path_buf());
    }

    for path_str in DEFAULT_SETTINGS_PATHS {
        let path = PathBuf::from(shellexpand::tilde(path_str).as_ref());
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Using settings file");
            return Ok(path);
        }
    }

    Err(Error::config(format!(
        "no settings file found (tried {})",
        DEFAULT_SETTINGS_PATHS.join(", ")
    )))
}

/// The base configuration with settings that only the application reads
/// removed.
pub fn traversal_config(base: &Configuration) -> Configuration {
    keys::APP_ONLY_SETTINGS
        .iter()
        .fold(base.clone(), |cfg, key| cfg.without(key))
}

/// The configured top-level directories, tilde-expanded, in order.
pub fn dirs_to_process(base: &Configuration) -> Result<Vec<PathBuf>> {
    Ok(base
        .text_list(keys::DIRS_TO_PROCESS)?
        .iter()
        .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
        .collect())
}

/// Check that every required setting is present: the core ones plus those
/// declared by the resolved processor and fact deriver.
pub fn check_required(cfg: &Configuration) -> Result<()> {
    let mut missing: Vec<&str> = keys::REQUIRED_SETTINGS
        .iter()
        .copied()
        .filter(|key| !cfg.contains(key))
        .collect();

    if missing.is_empty() {
        let processor = cfg.processor()?;
        let deriver = cfg.fact_deriver()?;
        missing.extend(
            processor
                .required_settings()
                .iter()
                .chain(deriver.required_settings())
                .copied()
                .filter(|key| !cfg.contains(key)),
        );
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "required settings are missing: {}",
            missing.join(", ")
        )))
    }
}

/// Loads settings files and override layers.
pub struct ConfigLoader {
    registry: Registry,
}

impl ConfigLoader {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Load the base configuration from the settings file at `path`.
    pub fn load_base_file(&self, path: &Path) -> Result<Configuration> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read settings file {}: {e}", path.display()))
        })?;
        self.load_base(&source, path)
    }

    /// Load the base configuration from settings text.
    ///
    /// `origin` only names the source in error messages.
    pub fn load_base(&self, source: &str, origin: &Path) -> Result<Configuration> {
        let settings = eval::evaluate(source, origin, &Configuration::new())?;
        if settings.contains_key(keys::FACTS_BLOCK) {
            return Err(Error::config(format!(
                "{}: a `{}` block may only appear in override layers",
                origin.display(),
                keys::FACTS_BLOCK
            )));
        }

        let cfg = self.finish(Configuration::from_settings(settings))?;
        check_required(&cfg)?;
        tracing::debug!(path = %origin.display(), settings = cfg.len(), "Loaded settings");
        Ok(cfg)
    }

    /// Evaluate an override layer against `base` and merge it over it.
    ///
    /// The layer's `facts` block, if any, is left in the result for the
    /// caller to take.
    pub fn load_layer(&self, source: &str, origin: &Path, base: &Configuration) -> Result<Configuration> {
        let settings = eval::evaluate(source, origin, base)?;
        self.finish(base.merged(settings))
    }

    /// Read and merge the override layer at `path`.
    pub fn load_layer_file(&self, path: &Path, base: &Configuration) -> Result<Configuration> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read override {}: {e}", path.display()))
        })?;
        self.load_layer(&source, path, base)
    }

    /// Apply the override layer at `path` when one exists.
    ///
    /// Returns the configuration in force after the layer; its fact block is
    /// merged into `facts`, overriding what was there. Without a layer `cfg`
    /// is returned unchanged.
    pub fn apply_override(
        &self,
        path: &Path,
        cfg: &Configuration,
        facts: &mut Facts,
    ) -> Result<Configuration> {
        if !path.is_file() {
            return Ok(cfg.clone());
        }

        tracing::debug!(layer = %path.display(), "Applying override");
        let mut merged = self.load_layer_file(path, cfg)?;
        if let Some(block) = merged.take_facts()? {
            facts.merge(&block);
        }
        Ok(merged)
    }

    fn finish(&self, cfg: Configuration) -> Result<Configuration> {
        let mut cfg = compile_patterns(&cfg)?;
        self.registry.resolve_handles(&mut cfg)?;
        Ok(cfg)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}
