//! Named processors and fact derivers.
//!
//! The settings file refers to its processor and fact deriver by name. The
//! [`Registry`] maps those names to live handles: derivers are stateless and
//! stored directly, processors are built on demand by a factory that receives
//! the configuration in force where the name is resolved.

use std::collections::HashMap;
use std::sync::Arc;

use metaproc_common::{Error, Result};

use crate::config::{keys, Configuration, DeriverHandle, ProcessorHandle, Value};
use crate::facts::DefaultFactDeriver;
use crate::processor::MediaBrowserProcessor;

type ProcessorFactory = Box<dyn Fn(&Configuration) -> Result<ProcessorHandle> + Send + Sync>;

/// Lookup table from configured names to processors and fact derivers.
///
/// # Examples
///
/// ```rust,ignore
/// use metaproc::registry::Registry;
///
/// let mut registry = Registry::with_builtins();
/// registry.register_processor("recording", |_cfg| Ok(my_handle.clone()));
/// ```
#[derive(Default)]
pub struct Registry {
    processors: HashMap<String, ProcessorFactory>,
    derivers: HashMap<String, DeriverHandle>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in components: the `default`
    /// fact deriver (also reachable as `default_facts_function`) and the
    /// `mediabrowser` processor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        let default: DeriverHandle = Arc::new(DefaultFactDeriver);
        registry.register_deriver("default", default.clone());
        registry.register_deriver("default_facts_function", default);

        registry.register_processor("mediabrowser", |cfg| {
            let processor: ProcessorHandle = Arc::new(MediaBrowserProcessor::from_config(cfg)?);
            Ok(processor)
        });

        registry
    }

    /// Register a processor factory under `name`, replacing any previous one.
    pub fn register_processor<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Configuration) -> Result<ProcessorHandle> + Send + Sync + 'static,
    {
        self.processors.insert(name.into(), Box::new(factory));
    }

    /// Register a fact deriver under `name`, replacing any previous one.
    pub fn register_deriver(&mut self, name: impl Into<String>, deriver: DeriverHandle) {
        self.derivers.insert(name.into(), deriver);
    }

    /// Names of the registered processors, sorted.
    pub fn processor_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.processors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of the registered fact derivers, sorted.
    pub fn deriver_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.derivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Replace the processor name stored under `key` with a live handle.
    ///
    /// A value that already is a handle is returned as is.
    pub fn resolve_processor(&self, cfg: &mut Configuration, key: &str) -> Result<ProcessorHandle> {
        let name = match cfg.get(key) {
            Some(Value::Processor(handle)) => return Ok(handle.clone()),
            Some(Value::Text(name)) => registered_name(name).to_string(),
            Some(other) => {
                return Err(Error::config(format!(
                    "{key} must name a processor, found {}",
                    other.type_name()
                )))
            }
            None => return Err(Error::config(format!("{key} is not set"))),
        };

        let factory = self.processors.get(&name).ok_or_else(|| {
            Error::config(format!(
                "{key}: unknown processor `{name}` (available: {})",
                self.processor_names().join(", ")
            ))
        })?;

        let handle = factory(cfg)?;
        tracing::debug!(processor = handle.name(), "Resolved processor");
        cfg.set(key, Value::Processor(handle.clone()));
        Ok(handle)
    }

    /// Replace the fact deriver name stored under `key` with a live handle.
    pub fn resolve_deriver(&self, cfg: &mut Configuration, key: &str) -> Result<DeriverHandle> {
        let name = match cfg.get(key) {
            Some(Value::FactDeriver(handle)) => return Ok(handle.clone()),
            Some(Value::Text(name)) => registered_name(name).to_string(),
            Some(other) => {
                return Err(Error::config(format!(
                    "{key} must name a fact deriver, found {}",
                    other.type_name()
                )))
            }
            None => return Err(Error::config(format!("{key} is not set"))),
        };

        let handle = self.derivers.get(&name).cloned().ok_or_else(|| {
            Error::config(format!(
                "{key}: unknown fact deriver `{name}` (available: {})",
                self.deriver_names().join(", ")
            ))
        })?;

        cfg.set(key, Value::FactDeriver(handle.clone()));
        Ok(handle)
    }

    /// Resolve both handle-valued settings of `cfg` in place, if present.
    pub(crate) fn resolve_handles(&self, cfg: &mut Configuration) -> Result<()> {
        if cfg.contains(keys::FACTS_FUNCTION) {
            self.resolve_deriver(cfg, keys::FACTS_FUNCTION)?;
        }
        if cfg.contains(keys::PROCESSOR) {
            self.resolve_processor(cfg, keys::PROCESSOR)?;
        }
        Ok(())
    }
}

/// Dotted module-style names (`processors.mediabrowser`) resolve by their
/// last segment.
fn registered_name(name: &str) -> &str {
    let name = name.trim();
    match name.rsplit_once('.') {
        Some((_, last)) => last,
        None => name,
    }
}
