//! Engine configuration: checker endpoint, request options, the personal
//! dictionary, and its synchronization snapshot.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use redline_check::{CheckOptions, Credentials};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const DEFAULT_ENDPOINT: &str = "https://api.languagetool.org";
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The base URL for the checker endpoint.
    pub endpoint: String,
    /// Premium account credentials, when the user has them.
    pub credentials: Option<Credentials>,
    /// Options forwarded on every check request.
    pub options: CheckOptions,
    /// The personal dictionary.
    pub dictionary: BTreeSet<String>,
    /// Whether the dictionary also syncs to the checker account.
    pub sync_dictionary: bool,
    /// The dictionary as of the last successful sync; the merge ancestor.
    pub last_synced: BTreeSet<String>,
    /// Quiet period after the last edit before a check fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            credentials: None,
            options: CheckOptions::default(),
            dictionary: BTreeSet::new(),
            sync_dictionary: false,
            last_synced: BTreeSet::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, EngineError> {
        loader.load().await
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), EngineError> {
        saver.save(self).await
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<Config, EngineError>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    fn save(&self, config: &Config) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// A [`Loader`] and [`Saver`] backed by a JSON file. A missing file loads
/// as the default configuration.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<Config, EngineError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &Config) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.debounce_ms, 1000);
        assert!(!config.sync_dictionary);
        assert!(config.dictionary.is_empty());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"dictionary":["obsidian"]}"#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.debounce_ms, 1000);
        assert!(config.dictionary.contains("obsidian"));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("redline.json"));

        // Missing file loads as defaults.
        let loaded = Config::load(&store).await.unwrap();
        assert_eq!(loaded.endpoint, DEFAULT_ENDPOINT);

        let mut config = Config::default();
        config.dictionary.insert("smolstr".to_owned());
        config.sync_dictionary = true;
        config.save(&store).await.unwrap();

        let loaded = Config::load(&store).await.unwrap();
        assert!(loaded.dictionary.contains("smolstr"));
        assert!(loaded.sync_dictionary);
    }
}
