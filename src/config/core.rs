use super::WeaveConfig;
use super::formats;
use super::overrides::prune_unset;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use std::path::{Path, PathBuf};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const FILE_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

pub const ENV_PREFIX: &str = "CODEWEAVE_";

/// Where each configuration layer is read from. `None` skips the layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Directory holding `config.{toml,json,yaml,yml}`
    pub user_dir: Option<PathBuf>,
    /// Directory holding `codeweave.{toml,json,yaml,yml}`
    pub repo_dir: Option<PathBuf>,
    pub custom: Option<PathBuf>,
    pub env: bool,
}

impl ConfigSources {
    /// The standard layers for a run from the current directory.
    pub fn discover(custom: Option<&Path>) -> Self {
        Self {
            user_dir: dirs::config_dir().map(|dir| dir.join("codeweave")),
            repo_dir: Some(PathBuf::from(".")),
            custom: custom.map(Path::to_path_buf),
            env: true,
        }
    }

    pub fn defaults_only() -> Self {
        Self::default()
    }
}

impl WeaveConfig {
    pub fn load<T: Serialize>(custom_config: Option<&Path>, cli_overrides: Option<&T>) -> Result<Self> {
        load_layers(&ConfigSources::discover(custom_config), cli_overrides)
    }
}

/// Merge every layer, lowest priority first, and extract the result.
pub fn load_layers<T: Serialize>(sources: &ConfigSources, cli_overrides: Option<&T>) -> Result<WeaveConfig> {
    tracing::trace!(?sources, "loading configuration");

    let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));
    if let Some(dir) = &sources.user_dir {
        figment = merge_family(figment, &dir.join("config"));
    }
    if let Some(dir) = &sources.repo_dir {
        figment = merge_family(figment, &dir.join("codeweave"));
    }
    if let Some(custom) = &sources.custom {
        if !custom.is_file() {
            anyhow::bail!("config file not found: {}", custom.display());
        }
        figment = figment.merge(formats::auto(custom));
    }
    if sources.env {
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    }
    if let Some(overrides) = cli_overrides {
        figment = figment.merge(Serialized::defaults(prune_unset(overrides)));
    }

    let config: WeaveConfig = figment.extract().context("invalid configuration")?;
    tracing::debug!(languages = ?config.filter.languages, "configuration loaded");
    Ok(config)
}

/// Merge `<base>.toml`, `.json`, `.yaml` and `.yml`, whichever exist.
fn merge_family(mut figment: Figment, base: &Path) -> Figment {
    for extension in FILE_EXTENSIONS {
        figment = figment.merge(formats::auto(base.with_extension(extension)));
    }
    figment
}
