//! Shared fixtures for integration tests.
//!
//! [`TestLibrary`] lays out a media tree in a temporary directory and writes
//! a settings file for it. [`RecordingProcessor`] stands in for a real
//! processor and records every node a walk hands it, together with the
//! facts and configuration in force there.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use metaproc::config::{ConfigLoader, Configuration, ProcessorHandle};
use metaproc::facts::Facts;
use metaproc::filter::PathEntry;
use metaproc::processor::Processor;
use metaproc::registry::Registry;

/// Settings shared by the tests, minus `DIRS_TO_PROCESS`.
pub const BASE_SETTINGS: &str = r#"
FACTS_FUNCTION = "default_facts_function"
PROCESSOR = "recording"
PATH_INCLUDE_REGEXPS = ['.*\.(avi|mkv|mp4)$']
PATH_EXCLUDE_REGEXPS = ['/metadata/$']
TV_SEASON_FACTS_REGEXPS = ['season\s*(?P<season_number>\d+)']
TV_FILE_FACTS_REGEXPS = [
    'S(?P<season_number>\d+)E(?P<episode_number>\d+)',
    '(?P<season_number>\d+)x(?P<episode_number>\d+)',
]
MOVIE_TITLE_FACTS_REGEXPS = ['^(?P<movie_title>.+?)\.\w+$']
"#;

/// A media tree in a temporary directory.
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Create the directory `relative` and its parents.
    pub fn dir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).expect("failed to create dir");
        path
    }

    /// Create an empty file at `relative`.
    pub fn file(&self, relative: &str) -> PathBuf {
        self.write(relative, "")
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Write `metaproc.toml` next to the tree, listing `roots` as the
    /// directories to process and appending `extra` to the base settings.
    pub fn settings(&self, roots: &[&str], extra: &str) -> PathBuf {
        let dirs: Vec<String> = roots
            .iter()
            .map(|root| format!("'{}'", self.path(root).display()))
            .collect();
        let source = format!(
            "DIRS_TO_PROCESS = [{}]\n{BASE_SETTINGS}\n{extra}\n",
            dirs.join(", ")
        );
        self.write("metaproc.toml", &source)
    }

    /// The tree most tests walk: a TV root with one series of two
    /// episodes, plus the noise a real library carries.
    pub fn entourage() -> Self {
        let lib = Self::new();
        lib.write("TV/.metaproc-override", "[facts]\ntype = \"tv\"\n");
        lib.file("TV/Entourage/Season 1/Entourage.S01E01.avi");
        lib.file("TV/Entourage/Season 1/Entourage.S01E02.avi");
        lib.file("TV/Entourage/Season 1/notes.txt");
        lib.file("TV/Entourage/Season 1/metadata/Entourage.S01E01.xml");
        lib
    }
}

/// Which processor operation a walk invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Process,
    Clean,
}

/// One invocation of the processor.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub path: PathBuf,
    pub facts: Facts,
    pub cfg: Configuration,
}

/// Processor that records what it is handed.
#[derive(Default)]
pub struct RecordingProcessor {
    calls: Mutex<Vec<Call>>,
}

impl RecordingProcessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn record(&self, op: Op, entry: &PathEntry, cfg: &Configuration, facts: &Facts) {
        self.calls.lock().push(Call {
            op,
            path: entry.path().to_path_buf(),
            facts: facts.clone(),
            cfg: cfg.clone(),
        });
    }
}

impl Processor for RecordingProcessor {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn process(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts) {
        self.record(Op::Process, entry, cfg, facts);
    }

    fn clean(&self, entry: &PathEntry, cfg: &Configuration, facts: &Facts) {
        self.record(Op::Clean, entry, cfg, facts);
    }
}

/// A loader whose `recording` processor is `recorder`.
pub fn loader(recorder: &Arc<RecordingProcessor>) -> ConfigLoader {
    let mut registry = Registry::with_builtins();
    let recorder = recorder.clone();
    registry.register_processor("recording", move |_cfg| {
        let handle: ProcessorHandle = recorder.clone();
        Ok(handle)
    });
    ConfigLoader::new(registry)
}

/// Paths of `calls`, relative to `root`.
pub fn relative_paths(calls: &[Call], root: &Path) -> Vec<String> {
    calls
        .iter()
        .map(|call| {
            call.path
                .strip_prefix(root)
                .unwrap_or(&call.path)
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

/// Facts built from `(name, value)` pairs.
pub fn facts(pairs: &[(&str, &str)]) -> Facts {
    pairs.iter().copied().collect()
}
