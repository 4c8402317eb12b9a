//! Command-line interface for codeweave

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod output;

pub use output::Output;

use commands::{config, languages, weave};

#[derive(Parser)]
#[command(
    name = "codeweave",
    version = env!("CARGO_PKG_VERSION"),
    about = "Weave the source files of a repository into one AI-readable document",
    propagate_version = true
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Concatenate the matching files of a folder into one document
    Weave(weave::WeaveArgs),
    /// List the supported language identifiers and their extensions
    Languages(languages::LanguagesArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("cannot change directory to {}", dir.display()))?;
        }

        setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.verbose > 0, self.quiet);

        match self.command {
            Commands::Weave(args) => weave::execute(args, self.config.as_deref(), &output),
            Commands::Languages(args) => languages::execute(args),
            Commands::Config(args) => config::execute(args, self.config.as_deref()),
        }
    }
}

pub fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"), // -vvv shows everything including globset
        }
    });

    // try_init: tests may drive `run` more than once per process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
