use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The persisted record: the folder picked last time.
///
/// Keys this version does not know about are kept in `extra` and written
/// back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(default)]
    pub default_path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigRecord {
    /// The remembered folder, if one was ever picked.
    pub fn default_folder(&self) -> Option<PathBuf> {
        if self.default_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.default_path))
        }
    }
}

/// Reads and writes the [`ConfigRecord`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/txt-viewer/config.json`, or `config.json` in the
    /// working directory when the platform has no config directory.
    pub fn default_location() -> Self {
        let path = dirs::config_dir()
            .map(|dir| dir.join("txt-viewer").join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or corrupt files yield the default record.
    pub fn load(&self) -> Result<ConfigRecord, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(ConfigRecord::default());
            }
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        match serde_json::from_str::<ConfigRecord>(&raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "config file is not a valid JSON object, resetting to defaults"
                );
                Ok(ConfigRecord::default())
            }
        }
    }

    /// Replaces the file in full via a temp file and rename.
    pub fn save(&self, record: &ConfigRecord) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &content).map_err(|e| ConfigError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ConfigError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn get_config(state: tauri::State<'_, crate::state::AppState>) -> Result<ConfigRecord, String> {
    let config = state.config.lock().unwrap_or_else(|e| e.into_inner());
    Ok(config.clone())
}
