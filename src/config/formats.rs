use anyhow::Result;
use figment::providers::{Data, Format, Json, Toml, Yaml};
use figment::value::{Dict, Map};
use figment::{Error, Metadata, Profile, Provider};
use std::path::Path;

/// Formats a configuration file can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Format implied by a file extension; anything unknown reads as TOML.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "json" => ConfigFormat::Json,
            "yaml" | "yml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }

    pub fn file(self, path: &Path) -> FileProvider {
        match self {
            ConfigFormat::Toml => FileProvider::Toml(Toml::file_exact(path)),
            ConfigFormat::Json => FileProvider::Json(Json::file_exact(path)),
            ConfigFormat::Yaml => FileProvider::Yaml(Yaml::file_exact(path)),
        }
    }
}

/// Formats `config show` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Toml,
    Json,
}

impl ExportFormat {
    /// Render a configuration value for display.
    pub fn export<T: serde::Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            ExportFormat::Toml => toml::to_string_pretty(value)?,
            ExportFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }
}

/// A config file provider whose format was picked from its extension.
pub enum FileProvider {
    Toml(Data<Toml>),
    Json(Data<Json>),
    Yaml(Data<Yaml>),
}

/// Provider for `path`, format chosen by extension.
pub fn auto<P: AsRef<Path>>(path: P) -> FileProvider {
    let path = path.as_ref();
    ConfigFormat::from_path(path).file(path)
}

impl Provider for FileProvider {
    fn metadata(&self) -> Metadata {
        match self {
            FileProvider::Toml(p) => p.metadata(),
            FileProvider::Json(p) => p.metadata(),
            FileProvider::Yaml(p) => p.metadata(),
        }
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        match self {
            FileProvider::Toml(p) => p.data(),
            FileProvider::Json(p) => p.data(),
            FileProvider::Yaml(p) => p.data(),
        }
    }
}
