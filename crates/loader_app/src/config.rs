use std::fs;
use std::path::Path;

use loader_logging::{loader_info, loader_warn};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "loader.ron";

/// Optional settings read from a RON file, e.g.
///
/// ```ron
/// (update_interval_ms: 250, extensions: ["epub", "fb2"], item_delay_ms: 0)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub update_interval_ms: u64,
    /// Book extensions to list; empty keeps the built-in set.
    pub extensions: Vec<String>,
    /// Artificial pause after each discovered book, to watch batching live.
    pub item_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 1000,
            extensions: Vec::new(),
            item_delay_ms: 0,
        }
    }
}

/// Reads the config at `path`. Falls back to defaults when the file is
/// missing or broken.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppConfig::default();
        }
        Err(err) => {
            loader_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            loader_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            loader_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join(DEFAULT_CONFIG_FILENAME));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, r#"(update_interval_ms: 250, extensions: ["epub"])"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.update_interval_ms, 250);
        assert_eq!(config.extensions, vec!["epub".to_string()]);
        assert_eq!(config.item_delay_ms, 0);
    }

    #[test]
    fn broken_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, "(update_interval_ms: ").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
    }
}
