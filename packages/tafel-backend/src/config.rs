/// Configuration for the Tafel backend.
/// Reads server.json from ~/.config/tafel/server.json (or platform equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tafel_core::config::PersistenceSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_store_file")]
    pub store_file: String,
    /// Managed attachments directory; `<dataDir>/attachments` when unset.
    #[serde(default)]
    pub attachments_dir: Option<PathBuf>,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

fn default_port() -> u16 {
    4377
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tafel")
}

fn default_store_file() -> String {
    "tafel-store.json".to_string()
}

impl ServerConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn attachments_path(&self) -> PathBuf {
        self.attachments_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("attachments"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
            store_file: default_store_file(),
            attachments_dir: None,
            persistence: PersistenceSettings::default(),
        }
    }
}

/// Default config path: ~/.config/tafel/server.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tafel")
        .join("server.json")
}

/// Load config from path. Returns default if the file doesn't exist or
/// doesn't parse.
pub fn load_config(path: &Path) -> ServerConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(target: "tafel.config", "Failed to parse config {}: {}", path.display(), e);
            ServerConfig::default()
        }),
        Err(_) => {
            log::info!(target: "tafel.config", "No config at {}, using defaults", path.display());
            ServerConfig::default()
        }
    }
}
