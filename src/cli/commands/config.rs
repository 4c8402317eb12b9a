use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use crate::config::{ExportFormat, WeaveConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormat,
    },
    /// Load the configuration and check every value converts cleanly
    Validate,
}

pub fn execute(args: ConfigArgs, custom_config: Option<&Path>) -> Result<()> {
    let config = WeaveConfig::load(custom_config, None::<&()>)?;

    match args.command {
        ConfigCommand::Show { format } => {
            println!("{}", format.export(&config)?.trim_end());
        }
        ConfigCommand::Validate => {
            config.filter_spec()?;
            config.transform_options()?;
            config.execution_settings()?;
            println!("configuration is valid");
        }
    }
    Ok(())
}
