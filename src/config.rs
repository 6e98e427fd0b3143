use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::storage::StorageConfig;

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("ITEMLIST_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ITEMLIST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Resolve the storage backend configuration.
    pub fn storage_runtime(&self) -> Result<StorageConfig> {
        self.storage.to_runtime()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackendKind,
    pub local: Option<LocalStorageSection>,
}

impl StorageSection {
    pub fn to_runtime(&self) -> Result<StorageConfig> {
        match self.backend {
            StorageBackendKind::Local => {
                let local = self.local.clone().unwrap_or_default();

                if local.root_path.trim().is_empty() {
                    bail!("storage.local.root_path must be specified");
                }

                Ok(StorageConfig::Local {
                    root_path: local.root_path,
                })
            }
            StorageBackendKind::Memory => Ok(StorageConfig::Memory),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            local: Some(LocalStorageSection::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Local,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalStorageSection {
    pub root_path: String,
}

impl Default for LocalStorageSection {
    fn default() -> Self {
        Self {
            root_path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
