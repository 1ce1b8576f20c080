//! User configuration for the Fleet CLI
//!
//! Stores the API URL and token in the system config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration stored on disk
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    /// Account the token was issued to, when known
    pub user: Option<String>,
}

impl CliConfig {
    /// Location of the config file: `<config dir>/fleet/config.toml`
    pub fn default_path() -> Result<PathBuf, String> {
        let config_dir = dirs::config_dir().ok_or("Failed to get system config directory")?;
        Ok(config_dir.join("fleet").join("config.toml"))
    }

    /// Read the config file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let buf = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        toml::from_str(&buf)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Write the config file, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let toml =
            toml::to_string(&self).map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, toml).map_err(|e| format!("Failed to write config file: {}", e))
    }

    /// Forget the stored credentials, keeping the rest
    pub fn clear_credentials(&mut self) {
        self.token = None;
        self.user = None;
    }
}

/// Token shortened for display
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
