use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::settings::ConfigRecord;

/// Suffix a file name must end with to be managed.
pub const TEXT_SUFFIX: &str = ".txt";

/// Rejects new file names that could escape the selected folder.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err("Invalid name: must not contain '..', '/', '\\', or null bytes".to_string());
    }
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    Ok(())
}

/// Button label for a managed file: the name without its `.txt` suffix.
pub fn label_for(file_name: &str) -> &str {
    file_name.strip_suffix(TEXT_SUFFIX).unwrap_or(file_name)
}

/// Regular files directly inside `folder` whose names end in `.txt`,
/// sorted by name. Names that are not valid UTF-8 are left out.
pub fn list_text_files(folder: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files: Vec<(String, PathBuf)> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            name.ends_with(TEXT_SUFFIX).then(|| (name, entry.path()))
        })
        .collect();

    files.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(files)
}

/// Where the folder picker opens: the remembered folder, else the working
/// directory.
pub fn picker_start(config: &ConfigRecord) -> PathBuf {
    config
        .default_folder()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn select_folder(
    app: tauri::AppHandle,
    state: tauri::State<'_, crate::state::AppState>,
) -> Result<Option<super::catalog::CatalogView>, String> {
    use tauri_plugin_dialog::DialogExt;

    let start = {
        let config = state.config.lock().unwrap_or_else(|e| e.into_inner());
        picker_start(&config)
    };

    let Some(picked) = app
        .dialog()
        .file()
        .set_title("Select folder")
        .set_directory(&start)
        .blocking_pick_folder()
    else {
        return Ok(None);
    };
    let folder = picked.into_path().map_err(|e| e.to_string())?;

    let switched = state.switch_folder(&folder).map_err(|e| {
        crate::windows::show_error(&app, &e);
        e.to_string()
    })?;

    if let Some(e) = &switched.unsaved {
        crate::windows::show_error(
            &app,
            &format!("Edits in the previous folder were not saved: {}", e),
        );
    }

    Ok(Some(switched.view))
}
