//! Integration tests for settings files and override layers.

mod common;

use std::path::Path;

use assert_matches::assert_matches;
use common::{facts, loader, RecordingProcessor, TestLibrary, BASE_SETTINGS};
use metaproc::config::{self, keys, ConfigLoader, Pattern};
use metaproc::facts::Facts;
use metaproc_common::Error;

#[test]
fn settings_file_loads_with_handles_resolved() {
    let lib = TestLibrary::new();
    let recorder = RecordingProcessor::new();
    let base = loader(&recorder)
        .load_base_file(&lib.settings(&["TV", "Movies"], ""))
        .unwrap();

    assert_eq!(base.processor().unwrap().name(), "recording");
    assert_eq!(base.fact_deriver().unwrap().name(), "default");
    assert_eq!(base.patterns(keys::TV_FILE_FACTS_REGEXPS).count(), 2);
    assert_eq!(
        config::dirs_to_process(&base).unwrap(),
        vec![lib.path("TV"), lib.path("Movies")]
    );
}

#[test]
fn unreadable_settings_file_is_a_config_error() {
    let recorder = RecordingProcessor::new();
    let result = loader(&recorder).load_base_file(Path::new("/nonexistent/metaproc.toml"));
    assert_matches!(result, Err(Error::Config(_)));
}

#[test]
fn invalid_pattern_names_its_setting() {
    let lib = TestLibrary::new();
    let path = lib.write(
        "metaproc.toml",
        &format!("DIRS_TO_PROCESS = []\n{BASE_SETTINGS}\nEXTRA_REGEXP = '(unclosed'\n"),
    );

    let recorder = RecordingProcessor::new();
    let result = loader(&recorder).load_base_file(&path);
    assert_matches!(result, Err(Error::Config(ref msg)) if msg.contains("EXTRA_REGEXP"));
}

#[test]
fn unknown_processor_is_a_config_error() {
    let lib = TestLibrary::new();
    let source = format!("DIRS_TO_PROCESS = []\n{BASE_SETTINGS}").replace("\"recording\"", "\"xbmc\"");
    let path = lib.write("metaproc.toml", &source);

    let recorder = RecordingProcessor::new();
    let result = loader(&recorder).load_base_file(&path);
    assert_matches!(result, Err(Error::Config(ref msg)) if msg.contains("xbmc"));
}

#[test]
fn override_layers_stack() {
    let lib = TestLibrary::new();
    lib.write(
        "TV/.metaproc-override",
        "TV_SEASON_FACTS_REGEXPS = ['^S(?P<season_number>\\d+)$', \"${TV_SEASON_FACTS_REGEXPS}\"]\n[facts]\ntype = \"tv\"\n",
    );
    lib.write(
        "TV/Show/.metaproc-override",
        "PATH_INCLUDE_REGEXPS = []\n[facts]\nseries_title = \"The Show\"\n",
    );

    let recorder = RecordingProcessor::new();
    let loader = loader(&recorder);
    let base = loader.load_base_file(&lib.settings(&["TV"], "")).unwrap();

    let mut found = Facts::new();
    let tv = loader
        .apply_override(&lib.path("TV/.metaproc-override"), &base, &mut found)
        .unwrap();
    let show = loader
        .apply_override(&lib.path("TV/Show/.metaproc-override"), &tv, &mut found)
        .unwrap();

    assert_eq!(found, facts(&[("type", "tv"), ("series_title", "The Show")]));

    let seasons: Vec<_> = show
        .patterns(keys::TV_SEASON_FACTS_REGEXPS)
        .map(Pattern::as_str)
        .collect();
    assert_eq!(seasons, vec![r"^S(?P<season_number>\d+)$", r"season\s*(?P<season_number>\d+)"]);
    assert_eq!(show.patterns(keys::PATH_INCLUDE_REGEXPS).count(), 0);
    assert_eq!(tv.patterns(keys::PATH_INCLUDE_REGEXPS).count(), 1);
    assert!(!show.contains(keys::FACTS_BLOCK));
}

#[test]
fn absent_override_leaves_configuration_untouched() {
    let lib = TestLibrary::new();
    let recorder = RecordingProcessor::new();
    let loader = loader(&recorder);
    let base = loader.load_base_file(&lib.settings(&["TV"], "")).unwrap();

    let mut found = Facts::new();
    let same = loader
        .apply_override(&lib.path("TV/.metaproc-override"), &base, &mut found)
        .unwrap();

    assert!(same.shares_storage_with(&base));
    assert!(found.is_empty());
}

#[test]
fn override_may_switch_processor() {
    let lib = TestLibrary::new();
    let recorder = RecordingProcessor::new();
    let loader = loader(&recorder);
    let base = loader.load_base_file(&lib.settings(&["TV"], "")).unwrap();

    let layered = loader
        .load_layer(
            "PROCESSOR = \"mediabrowser\"\nTMDB_API_KEY = \"test-key\"\nDOWNLOAD_IMAGES = false\nMAX_NUMBER_OF_BACKDROPS = 1\n",
            Path::new("layer"),
            &base,
        )
        .unwrap();

    assert_eq!(layered.processor().unwrap().name(), "mediabrowser");
    assert_eq!(base.processor().unwrap().name(), "recording");
}

#[test]
fn mediabrowser_settings_are_required() {
    let lib = TestLibrary::new();
    let source = format!("DIRS_TO_PROCESS = []\n{BASE_SETTINGS}\nTMDB_API_KEY = \"test-key\"\n")
        .replace("\"recording\"", "\"mediabrowser\"");
    let path = lib.write("metaproc.toml", &source);

    let result = ConfigLoader::default().load_base_file(&path);
    assert_matches!(
        result,
        Err(Error::Config(ref msg)) if msg.contains("DOWNLOAD_IMAGES") && msg.contains("MAX_NUMBER_OF_BACKDROPS")
    );
}

#[test]
fn builtin_loader_resolves_mediabrowser() {
    let lib = TestLibrary::new();
    let source = format!(
        "DIRS_TO_PROCESS = []\n{BASE_SETTINGS}\nTMDB_API_KEY = \"test-key\"\nDOWNLOAD_IMAGES = true\nMAX_NUMBER_OF_BACKDROPS = 2\n"
    )
    .replace("\"recording\"", "\"processors.mediabrowser\"");
    let path = lib.write("metaproc.toml", &source);

    let base = ConfigLoader::default().load_base_file(&path).unwrap();
    assert_eq!(base.processor().unwrap().name(), "mediabrowser");
    assert_eq!(base.bool(keys::DOWNLOAD_IMAGES), Some(true));
}
