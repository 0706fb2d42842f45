//! Configuration directory helpers for the harvester
//!
//! Settings and the checkpoint database live in ~/.config/harvest/ unless
//! an explicit path is given. Call [`init`] at startup so the directory
//! exists before the checkpoint database is opened in it.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the application directory inside the platform config dir
const APP_DIR: &str = "harvest";

/// Create ~/.config/harvest/ if needed and return it
pub fn init() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// The harvester config directory (~/.config/harvest/)
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR))
        .context("Could not determine config directory")
}

/// Path of a file within the harvester config directory
pub fn config_path(filename: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join(filename))
}

/// Load and parse a JSON file from the harvester config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    load_json_file(&config_path(filename)?)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        size: u32,
    }

    #[test]
    fn test_config_dir() {
        let dir = config_dir().unwrap();
        assert!(dir.ends_with("harvest"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("harvest.json").unwrap();
        assert!(path.ends_with("harvest/harvest.json"));
    }

    #[test]
    fn test_load_json_file() {
        let dir = std::env::temp_dir().join(format!("harvest-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.json");
        std::fs::write(&path, r#"{ "name": "inbox", "size": 5 }"#).unwrap();

        let sample: Sample = load_json_file(&path).unwrap();
        assert_eq!(sample.name, "inbox");
        assert_eq!(sample.size, 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_json_file_missing() {
        let err = load_json_file::<Sample>(Path::new("/nonexistent/harvest.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
