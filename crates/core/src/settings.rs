//! Persisted key-value settings.
//!
//! A flat JSON object of string values kept on disk and mirrored in memory.
//! The relay reads it on every request, so edits made through the settings
//! route take effect without a restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

/// HTTP base URL of the generation backend.
pub const BACKEND_URL_KEY: &str = "backendUrl";

/// Explicit push-channel URL, overriding the derived one.
pub const BACKEND_WS_KEY: &str = "backendWs";

/// Snapshot of all stored settings.
pub type Settings = BTreeMap<String, String>;

/// Errors raised while loading or persisting settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings store, optionally backed by a JSON file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: RwLock<Settings>,
}

impl SettingsStore {
    /// An in-memory store seeded with the given values.
    pub fn with_values(values: Settings) -> Self {
        Self {
            path: None,
            values: RwLock::new(values),
        }
    }

    /// Load settings from `path`. A missing file yields an empty store that
    /// will be created on the first update.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<Settings>(&text).map_err(|source| {
                SettingsError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No settings file yet, starting empty");
                Settings::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    pub async fn snapshot(&self) -> Settings {
        self.values.read().await.clone()
    }

    /// Apply a batch of changes and persist the result.
    ///
    /// `None` or an empty string removes the key. The in-memory copy is
    /// only replaced once the file write succeeded.
    pub async fn update<I>(&self, changes: I) -> Result<Settings, SettingsError>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut values = self.values.write().await;
        let mut next = values.clone();
        for (key, value) in changes {
            match value.filter(|v| !v.is_empty()) {
                Some(v) => {
                    next.insert(key, v);
                }
                None => {
                    next.remove(&key);
                }
            }
        }

        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }

        *values = next.clone();
        Ok(next)
    }
}

async fn persist(path: &Path, values: &Settings) -> Result<(), SettingsError> {
    let text = serde_json::to_string_pretty(values).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, text)
        .await
        .map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
}
