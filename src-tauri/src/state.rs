use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::commands::catalog::{Catalog, CatalogError, CatalogView};
use crate::commands::settings::{ConfigRecord, ConfigStore};

/// Result of picking a new folder. `unsaved` holds the error that kept the
/// old folder's edits from being written; those edits are gone.
#[derive(Debug)]
pub struct FolderSwitch {
    pub view: CatalogView,
    pub unsaved: Option<CatalogError>,
}

/// What to do with a close request.
#[derive(Debug)]
pub enum CloseOutcome {
    /// Everything was written.
    Saved(usize),
    /// Saving failed; keep the window open so the user can retry.
    Retry(CatalogError),
    /// Saving failed again; close without saving.
    GiveUp(CatalogError),
}

pub struct AppState {
    pub config_store: ConfigStore,
    pub config: Mutex<ConfigRecord>,
    pub catalog: Mutex<Catalog>,
    pub close_failed: Mutex<bool>,
}

impl AppState {
    /// Loads the config record; an unreadable config or a remembered folder
    /// that can no longer be read leaves the app without a folder.
    pub fn new(config_store: ConfigStore) -> Self {
        let config = config_store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read config, using defaults");
            ConfigRecord::default()
        });
        let mut catalog = Catalog::new();

        if let Some(folder) = config.default_folder() {
            if let Err(e) = catalog.load_files(&folder) {
                tracing::warn!(folder = %folder.display(), error = %e, "could not reopen last folder");
            }
        }

        Self {
            config_store,
            config: Mutex::new(config),
            catalog: Mutex::new(catalog),
            close_failed: Mutex::new(false),
        }
    }

    pub fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Saves the old folder's edits, loads `folder` and remembers it.
    ///
    /// Only a failure to read `folder` aborts the switch. Edits that cannot
    /// be written to the old folder are dropped and reported in
    /// [`FolderSwitch::unsaved`]; a config that cannot be written is logged.
    pub fn switch_folder(&self, folder: &Path) -> Result<FolderSwitch, CatalogError> {
        let (view, unsaved) = {
            let mut catalog = self.catalog();
            let unsaved = catalog.flush_all().err();
            if let Some(e) = &unsaved {
                tracing::warn!(error = %e, "could not save the previous folder, dropping its edits");
            }
            catalog.load_files(folder)?;
            (catalog.view(), unsaved)
        };

        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        config.default_path = folder.to_string_lossy().to_string();
        if let Err(e) = self.config_store.save(&config) {
            tracing::warn!(error = %e, "could not remember the selected folder");
        }

        Ok(FolderSwitch { view, unsaved })
    }

    /// Writes all edits to disk and closes the catalog.
    pub fn shutdown(&self) -> Result<usize, CatalogError> {
        self.catalog().shutdown()
    }

    /// Saves everything for a close request. The first failure asks for a
    /// retry, the next one gives up.
    pub fn close(&self) -> CloseOutcome {
        let err = match self.shutdown() {
            Ok(written) => return CloseOutcome::Saved(written),
            Err(e) => e,
        };

        let mut close_failed = self.close_failed.lock().unwrap_or_else(|e| e.into_inner());
        if *close_failed {
            CloseOutcome::GiveUp(err)
        } else {
            *close_failed = true;
            CloseOutcome::Retry(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn starts_empty_without_config() {
        let dir = tempdir().unwrap();
        let state = AppState::new(ConfigStore::new(dir.path().join("config.json")));

        assert!(state.catalog().folder().is_none());
        assert_eq!(state.config.lock().unwrap().default_path, "");
    }

    #[test]
    fn reopens_remembered_folder() {
        let dir = tempdir().unwrap();
        let texts = dir.path().join("texts");
        fs::create_dir(&texts).unwrap();
        fs::write(texts.join("a.txt"), "a").unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store
            .save(&ConfigRecord {
                default_path: texts.to_string_lossy().to_string(),
                ..ConfigRecord::default()
            })
            .unwrap();

        let state = AppState::new(store);

        assert_eq!(state.catalog().content("a.txt"), Some("a"));
    }

    #[test]
    fn missing_remembered_folder_is_not_fatal() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store
            .save(&ConfigRecord {
                default_path: dir.path().join("gone").to_string_lossy().to_string(),
                ..ConfigRecord::default()
            })
            .unwrap();

        let state = AppState::new(store);

        assert!(state.catalog().folder().is_none());
    }

    #[test]
    fn switching_folder_saves_edits_and_remembers_path() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        fs::write(first.join("a.txt"), "a").unwrap();
        fs::write(second.join("b.txt"), "b").unwrap();
        let config_path = dir.path().join("config.json");
        let state = AppState::new(ConfigStore::new(&config_path));

        state.switch_folder(&first).unwrap();
        {
            let mut catalog = state.catalog();
            catalog.open_file("a.txt").unwrap();
            catalog.update_buffer("a edited").unwrap();
        }
        let switched = state.switch_folder(&second).unwrap();
        let view = switched.view;

        assert!(switched.unsaved.is_none());
        assert_eq!(fs::read_to_string(first.join("a.txt")).unwrap(), "a edited");
        assert_eq!(view.files.len(), 1);
        assert_eq!(view.files[0].name, "b.txt");
        let saved = ConfigStore::new(&config_path).load().unwrap();
        assert_eq!(saved.default_folder(), Some(second.clone()));
    }

    #[test]
    fn switching_away_from_a_removed_folder_still_loads_the_new_one() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        fs::write(first.join("a.txt"), "a").unwrap();
        fs::write(second.join("b.txt"), "b").unwrap();
        let config_path = dir.path().join("config.json");
        let state = AppState::new(ConfigStore::new(&config_path));
        state.switch_folder(&first).unwrap();
        fs::remove_dir_all(&first).unwrap();

        let switched = state.switch_folder(&second).unwrap();

        assert!(matches!(switched.unsaved, Some(CatalogError::Io { .. })));
        assert_eq!(switched.view.files[0].name, "b.txt");
        assert_eq!(state.catalog().folder(), Some(second.as_path()));
        assert!(!first.exists());
        let saved = ConfigStore::new(&config_path).load().unwrap();
        assert_eq!(saved.default_folder(), Some(second.clone()));

        let again = state.switch_folder(&second).unwrap();
        assert!(again.unsaved.is_none());
    }

    #[test]
    fn unreadable_folder_is_not_remembered() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let state = AppState::new(ConfigStore::new(&config_path));

        let err = state.switch_folder(&dir.path().join("missing")).unwrap_err();

        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(!config_path.exists());
    }

    #[test]
    fn shutdown_flushes_open_buffer() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let state = AppState::new(ConfigStore::new(dir.path().join("config.json")));
        state.switch_folder(dir.path()).unwrap();
        {
            let mut catalog = state.catalog();
            catalog.open_file("a.txt").unwrap();
            catalog.update_buffer("closing text").unwrap();
        }

        assert_eq!(state.shutdown().unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "closing text"
        );
    }

    #[test]
    fn close_saves_the_last_buffer_update() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let state = AppState::new(ConfigStore::new(dir.path().join("config.json")));
        state.switch_folder(dir.path()).unwrap();
        {
            let mut catalog = state.catalog();
            catalog.open_file("a.txt").unwrap();
            catalog.update_buffer("first keystrokes").unwrap();
            catalog.update_buffer("first keystrokes and the last ones").unwrap();
        }

        assert!(matches!(state.close(), CloseOutcome::Saved(1)));
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "first keystrokes and the last ones"
        );
    }

    #[test]
    fn close_retries_once_then_gives_up() {
        let dir = tempdir().unwrap();
        let texts = dir.path().join("texts");
        fs::create_dir(&texts).unwrap();
        fs::write(texts.join("a.txt"), "a").unwrap();
        let state = AppState::new(ConfigStore::new(dir.path().join("config.json")));
        state.switch_folder(&texts).unwrap();
        fs::remove_dir_all(&texts).unwrap();

        assert!(matches!(state.close(), CloseOutcome::Retry(CatalogError::Io { .. })));
        assert!(matches!(state.close(), CloseOutcome::GiveUp(CatalogError::Io { .. })));
    }
}
