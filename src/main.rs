mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use metaproc::config::{self, keys, ConfigLoader, Configuration};
use metaproc::walker::TreeWalker;

fn load_settings(loader: &ConfigLoader, config_path: Option<&Path>) -> Result<(PathBuf, Configuration)> {
    let path = config::locate_settings_file(config_path)?;
    let base = loader
        .load_base_file(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    Ok((path, base))
}

fn process(config_path: Option<&Path>, dirs: Vec<PathBuf>) -> Result<()> {
    let loader = ConfigLoader::default();
    let (_, base) = load_settings(&loader, config_path)?;

    let dirs = if dirs.is_empty() {
        config::dirs_to_process(&base)?
    } else {
        dirs
    };

    TreeWalker::new(&loader).run_process(&base, &dirs)?;
    tracing::info!("metaproc done");
    Ok(())
}

fn clean(config_path: Option<&Path>, target: &Path, recursive: bool) -> Result<()> {
    let loader = ConfigLoader::default();
    let (_, base) = load_settings(&loader, config_path)?;
    let roots = config::dirs_to_process(&base)?;

    TreeWalker::new(&loader).run_clean(&base, &roots, target, recursive)?;
    tracing::info!("metaproc done");
    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let loader = ConfigLoader::default();
    let (path, base) = load_settings(&loader, config_path)?;

    println!("Validating settings: {}", path.display());
    println!("✓ Settings are valid");
    println!("  Processor: {}", base.processor()?.name());
    println!("  Fact function: {}", base.fact_deriver()?.name());
    println!("  Directories:");
    for dir in config::dirs_to_process(&base)? {
        let state = if dir.is_dir() { "" } else { " (missing)" };
        println!("    {}{state}", dir.display());
    }
    println!(
        "  Include patterns: {}",
        base.patterns(keys::PATH_INCLUDE_REGEXPS).count()
    );
    println!(
        "  Exclude patterns: {}",
        base.patterns(keys::PATH_EXCLUDE_REGEXPS).count()
    );
    Ok(())
}

/// Exit status for a failed run.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    let code = err
        .downcast_ref::<metaproc_common::Error>()
        .map(metaproc_common::Error::exit_code)
        .unwrap_or(1);
    ExitCode::from(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "metaproc=debug,metaproc_common=debug,reqwest=info".to_string()
        } else {
            "metaproc=info,metaproc_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let result = match cli.command {
        Commands::Process { dirs } => process(cli.config.as_deref(), dirs),
        Commands::Clean { path, recursive } => clean(cli.config.as_deref(), &path, recursive),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("metaproc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    }
}
