use crate::PlatformError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Endpoint configuration for the remote control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl PlatformConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// Load config from `~/.config/crondeck/platform.json`.
    pub fn load_default() -> Result<Self, PlatformError> {
        let path = default_config_path()?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, PlatformError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PlatformError::Config(format!("invalid platform config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), PlatformError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PlatformError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, PlatformError> {
    let home =
        std::env::var("HOME").map_err(|_| PlatformError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/crondeck/platform.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.json");

        let config = PlatformConfig::new("https://control.example.com/v1").with_token("secret123");
        config.save(&path).unwrap();

        let loaded = PlatformConfig::load(&path).unwrap();
        assert_eq!(loaded.url, "https://control.example.com/v1");
        assert_eq!(loaded.auth_token.as_deref(), Some("secret123"));
    }

    #[test]
    fn config_strips_trailing_slash() {
        let config = PlatformConfig::new("https://example.com/");
        assert_eq!(config.url, "https://example.com");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlatformConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(PlatformError::Io(_))));
    }
}
