// src/config.rs v2
//! Configuration management with file-based storage

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};

/// Remote document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub collection: String,
    pub auth_token: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: "plant-scout".to_string(),
            collection: "plant_details".to_string(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    pub store: StoreConfig,
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    /// Poller cadence on the UI/event thread.
    pub poll_interval_ms: u64,
    /// Base interval between marker refresh cycles.
    pub refresh_interval_secs: u64,
    /// Upper bound for the failure backoff between refresh cycles.
    pub refresh_backoff_cap_secs: u64,
    /// Overall deadline for one GPS fix acquisition.
    pub fix_timeout_secs: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            serial_port: None,
            serial_baudrate: 9600,
            poll_interval_ms: 100,
            refresh_interval_secs: 300,
            refresh_backoff_cap_secs: 3600,
            fix_timeout_secs: 90,
        }
    }
}

impl ScoutConfig {
    /// Load configuration from the config file, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| ScoutError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ScoutError::Other(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScoutError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScoutError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| ScoutError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config_path() -> Result<std::path::PathBuf> {
        use std::path::PathBuf;

        let home = std::env::var("HOME")
            .map_err(|_| ScoutError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("plant-scout")
            .join("config.json"))
    }

    /// Update serial port settings.
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
    }

    /// Update store settings.
    pub fn update_store(&mut self, base_url: String, project_id: String) {
        self.store.base_url = base_url;
        self.store.project_id = project_id;
    }
}
