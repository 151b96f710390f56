use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::paths;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Server configuration, loaded from ~/.tangent/config.json and overridden
/// by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let mut config = Config {
            api_key: None,
            api_base: None,
            model: None,
            database_path: None,
        };

        let json_path = paths::config_json_path();
        if json_path.exists() {
            match std::fs::read_to_string(&json_path) {
                Ok(content) => match serde_json::from_str::<Config>(&content) {
                    Ok(file_config) => config = file_config,
                    Err(e) => log::warn!("Ignoring malformed config.json: {}", e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", json_path.display(), e),
            }
        }

        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Ok(api_base) = std::env::var("GEMINI_API_BASE") {
            config.api_base = Some(api_base);
        }
        if let Ok(model) = std::env::var("TANGENT_MODEL") {
            config.model = Some(model);
        }
        if let Ok(path) = std::env::var("TANGENT_DB") {
            config.database_path = Some(PathBuf::from(path));
        }

        config
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(paths::database_path)
    }
}
