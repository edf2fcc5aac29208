use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::folders::{label_for, list_text_files, validate_name, TEXT_SUFFIX};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No folder selected")]
    NoFolder,

    #[error("Files were already saved and the catalog is closed")]
    Closed,

    #[error("Unknown file: {0}")]
    UnknownFile(String),

    #[error("{0}")]
    InvalidName(String),

    #[error("A file named {0} already exists")]
    DuplicateName(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the edit lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NoFolder,
    FolderLoaded,
    FileOpen,
    Flushed,
}

/// One row of the file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub label: String,
}

/// Everything the frontend needs to redraw itself.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogView {
    pub folder: Option<String>,
    pub phase: Phase,
    pub files: Vec<FileEntry>,
    pub current: Option<String>,
    pub skipped: Vec<String>,
}

/// In-memory copy of every `.txt` file of one folder, plus the edit buffer
/// of the file being shown.
///
/// Edits only reach disk through [`Catalog::flush_all`] (or
/// [`Catalog::shutdown`]); switching between files moves the buffer into
/// the in-memory entry.
#[derive(Debug, Default)]
pub struct Catalog {
    folder: Option<PathBuf>,
    files: BTreeMap<String, String>,
    current: Option<String>,
    buffer: String,
    // entries edited in memory since the last flush
    dirty: BTreeSet<String>,
    skipped: Vec<String>,
    closed: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn content(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files of the last load left out because they are not UTF-8.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn phase(&self) -> Phase {
        if self.closed {
            Phase::Flushed
        } else if self.current.is_some() {
            Phase::FileOpen
        } else if self.folder.is_some() {
            Phase::FolderLoaded
        } else {
            Phase::NoFolder
        }
    }

    /// The file list to display, in name order.
    pub fn entries(&self) -> Vec<FileEntry> {
        self.files
            .keys()
            .map(|name| FileEntry {
                name: name.clone(),
                label: label_for(name).to_string(),
            })
            .collect()
    }

    pub fn view(&self) -> CatalogView {
        CatalogView {
            folder: self
                .folder
                .as_ref()
                .map(|f| f.to_string_lossy().to_string()),
            phase: self.phase(),
            files: self.entries(),
            current: self.current.clone(),
            skipped: self.skipped.clone(),
        }
    }

    /// Replaces the catalog with the `.txt` files of `folder`.
    ///
    /// The selection and edit buffer are cleared. On error the previous
    /// catalog is left untouched.
    pub fn load_files(&mut self, folder: &Path) -> Result<(), CatalogError> {
        self.ensure_open()?;

        let (files, skipped) = read_folder(folder)?;

        self.folder = Some(folder.to_path_buf());
        self.files = files;
        self.skipped = skipped;
        self.current = None;
        self.buffer.clear();
        self.dirty.clear();

        tracing::info!(
            folder = %folder.display(),
            loaded = self.files.len(),
            skipped = self.skipped.len(),
            "catalog loaded"
        );
        Ok(())
    }

    /// Shows `name` in the edit buffer and returns its content.
    pub fn open_file(&mut self, name: &str) -> Result<&str, CatalogError> {
        self.ensure_open()?;
        let Some(content) = self.files.get(name) else {
            return Err(CatalogError::UnknownFile(name.to_string()));
        };
        let content = content.clone();

        self.capture_buffer();
        self.current = Some(name.to_string());
        self.buffer = content;

        tracing::debug!(file = name, "file opened");
        Ok(self.buffer.as_str())
    }

    /// Replaces the edit buffer with what the editor currently shows.
    pub fn update_buffer(&mut self, text: impl Into<String>) -> Result<(), CatalogError> {
        self.ensure_open()?;
        self.buffer = text.into();
        Ok(())
    }

    /// Creates `<name>.txt` empty on disk and reloads the catalog.
    ///
    /// The current selection and any unsaved edits survive the reload.
    /// Returns the new file name.
    pub fn create_new_file(&mut self, name: &str) -> Result<String, CatalogError> {
        self.ensure_open()?;
        let folder = self.folder.clone().ok_or(CatalogError::NoFolder)?;

        let name = name.trim();
        validate_name(name).map_err(CatalogError::InvalidName)?;
        let file_name = format!("{}{}", name, TEXT_SUFFIX);
        if self.files.contains_key(&file_name) {
            return Err(CatalogError::DuplicateName(file_name));
        }

        // create_new fails if the file appeared since the check above
        let path = folder.join(&file_name);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => CatalogError::DuplicateName(file_name.clone()),
                _ => CatalogError::io(&path, e),
            })?;

        self.capture_buffer();
        self.files.insert(file_name.clone(), String::new());
        tracing::info!(file = %file_name, "file created");

        self.reload()?;
        Ok(file_name)
    }

    /// Re-reads the folder from disk, keeping unsaved edits of files that
    /// still exist and the current selection if it still exists.
    pub fn reload(&mut self) -> Result<(), CatalogError> {
        self.ensure_open()?;
        let folder = self.folder.clone().ok_or(CatalogError::NoFolder)?;

        self.capture_buffer();
        let pending: Vec<(String, String)> = self
            .dirty
            .iter()
            .filter_map(|name| Some((name.clone(), self.files.get(name)?.clone())))
            .collect();
        let current = self.current.take();
        let buffer = mem::take(&mut self.buffer);

        if let Err(e) = self.load_files(&folder) {
            self.current = current;
            self.buffer = buffer;
            return Err(e);
        }

        for (name, content) in pending {
            match self.files.get_mut(&name) {
                Some(entry) => {
                    *entry = content;
                    self.dirty.insert(name);
                }
                None => tracing::warn!(file = %name, "file vanished from disk, dropping unsaved edits"),
            }
        }

        if let Some(name) = current.filter(|name| self.files.contains_key(name)) {
            self.current = Some(name);
            self.buffer = buffer;
        }

        Ok(())
    }

    /// Writes every entry back to its file, after moving the edit buffer
    /// into the current entry. Returns the number of files written.
    pub fn flush_all(&mut self) -> Result<usize, CatalogError> {
        self.ensure_open()?;
        let Some(folder) = self.folder.clone() else {
            return Ok(0);
        };

        self.capture_buffer();
        for (name, content) in &self.files {
            let path = folder.join(name);
            fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
        }
        self.dirty.clear();

        tracing::info!(folder = %folder.display(), written = self.files.len(), "catalog flushed");
        Ok(self.files.len())
    }

    /// Flushes and closes the catalog; later mutations fail with
    /// [`CatalogError::Closed`]. Calling it again writes nothing.
    pub fn shutdown(&mut self) -> Result<usize, CatalogError> {
        if self.closed {
            return Ok(0);
        }
        let written = self.flush_all()?;
        self.closed = true;
        Ok(written)
    }

    fn capture_buffer(&mut self) {
        let Some(name) = self.current.as_ref() else {
            return;
        };
        if let Some(entry) = self.files.get_mut(name) {
            if *entry != self.buffer {
                entry.clone_from(&self.buffer);
                self.dirty.insert(name.clone());
            }
        }
    }

    fn ensure_open(&self) -> Result<(), CatalogError> {
        if self.closed {
            Err(CatalogError::Closed)
        } else {
            Ok(())
        }
    }
}

fn read_folder(folder: &Path) -> Result<(BTreeMap<String, String>, Vec<String>), CatalogError> {
    let listing = list_text_files(folder).map_err(|e| CatalogError::io(folder, e))?;

    let mut files = BTreeMap::new();
    let mut skipped = Vec::new();
    for (name, path) in listing {
        let bytes = fs::read(&path).map_err(|e| CatalogError::io(&path, e))?;
        match String::from_utf8(bytes) {
            Ok(content) => {
                files.insert(name, content);
            }
            Err(_) => {
                tracing::warn!(file = %path.display(), "skipping file that is not valid UTF-8");
                skipped.push(name);
            }
        }
    }

    Ok((files, skipped))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn get_catalog(state: tauri::State<'_, crate::state::AppState>) -> Result<CatalogView, String> {
    let catalog = state.catalog();
    Ok(catalog.view())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn open_file(
    state: tauri::State<'_, crate::state::AppState>,
    name: String,
) -> Result<String, String> {
    let mut catalog = state.catalog();
    let content = catalog.open_file(&name).map_err(|e| e.to_string())?;
    Ok(content.to_string())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn update_buffer(
    state: tauri::State<'_, crate::state::AppState>,
    content: String,
) -> Result<(), String> {
    let mut catalog = state.catalog();
    catalog.update_buffer(content).map_err(|e| e.to_string())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn create_new_file(
    app: tauri::AppHandle,
    state: tauri::State<'_, crate::state::AppState>,
    name: String,
) -> Result<CatalogView, String> {
    let result = {
        let mut catalog = state.catalog();
        catalog.create_new_file(&name).map(|_| catalog.view())
    };

    // Blocking dialog; the catalog lock is released by now.
    result.map_err(|e| {
        crate::windows::show_error(&app, &e);
        e.to_string()
    })
}
