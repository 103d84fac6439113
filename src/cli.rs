use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "metaproc")]
#[command(author, version, about = "Media library metadata processor")]
pub struct Cli {
    /// Path to settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk media directories and write missing metadata
    Process {
        /// Directories to walk (defaults to DIRS_TO_PROCESS)
        dirs: Vec<PathBuf>,
    },

    /// Remove the metadata written for a path
    Clean {
        /// File or directory to clean
        #[arg(required = true)]
        path: PathBuf,

        /// Also clean everything below the path
        #[arg(short, long)]
        recursive: bool,
    },

    /// Validate settings file
    Validate {
        /// Settings file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
