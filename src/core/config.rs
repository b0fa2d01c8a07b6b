//! # Core Configuration
//!
//! Environment-driven configuration for the agent process. All values are
//! read once at startup; the `.env` file is loaded by the binary before
//! `Config::from_env` runs.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{Context, Result};

/// Runtime configuration for the agent
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the finance backend, e.g. `http://192.168.1.100:3000/api`
    pub api_base_url: String,

    /// Previously issued session token, if any (the session manager decides
    /// whether it is still valid)
    pub auth_token: Option<String>,

    /// Log filter passed to env_logger (e.g. "info", "monedero=debug")
    pub log_level: String,

    /// Directory holding the bundled notification sound files
    pub sound_dir: String,

    /// Path to the YAML audio player configuration
    pub player_config_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("MONEDERO_API_URL")
            .context("MONEDERO_API_URL must be set to the backend base URL")?;

        let auth_token = std::env::var("MONEDERO_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let log_level = std::env::var("MONEDERO_LOG").unwrap_or_else(|_| "info".to_string());

        let sound_dir =
            std::env::var("MONEDERO_SOUND_DIR").unwrap_or_else(|_| "sounds".to_string());

        let player_config_path =
            std::env::var("MONEDERO_PLAYER_CONFIG").unwrap_or_else(|_| "player.yaml".to_string());

        Ok(Config {
            api_base_url: normalize_base_url(&api_base_url),
            auth_token,
            log_level,
            sound_dir,
            player_config_path,
        })
    }
}

/// Trim trailing slashes so paths can be appended with a single `/`
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:3000/api/"),
            "http://localhost:3000/api"
        );
        assert_eq!(
            normalize_base_url("http://localhost:3000/api"),
            "http://localhost:3000/api"
        );
    }

    #[test]
    fn test_normalize_base_url_trims_whitespace() {
        assert_eq!(
            normalize_base_url("  http://localhost:3000 "),
            "http://localhost:3000"
        );
    }
}
