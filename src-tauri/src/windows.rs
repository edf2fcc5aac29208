use std::fmt::Display;

use tauri::{AppHandle, State, Window};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::state::{AppState, CloseOutcome};

/// Modal error dialog. Blocks until dismissed, so only call it off the
/// main thread (async commands).
pub fn show_error<E: Display + ?Sized>(app: &AppHandle, error: &E) {
    tracing::warn!(error = %error, "reporting error to user");
    app.dialog()
        .message(error.to_string())
        .title("Error")
        .kind(MessageDialogKind::Error)
        .blocking_show();
}

/// Called by the frontend once its last buffer update has landed. Saves
/// every file and destroys the window; if saving fails the window stays
/// open the first time so the user can fix the problem.
#[tauri::command]
pub fn close_main_window(window: Window, state: State<'_, AppState>) -> Result<(), String> {
    match state.close() {
        CloseOutcome::Saved(written) => {
            tracing::info!(written, "files saved, closing");
        }
        CloseOutcome::GiveUp(err) => {
            tracing::error!(error = %err, "files could not be saved, closing anyway");
        }
        CloseOutcome::Retry(err) => {
            tracing::error!(error = %err, "files could not be saved, close cancelled");
            window
                .dialog()
                .message(format!(
                    "Could not save files: {}\n\nClose the window again to quit without saving.",
                    err
                ))
                .title("Save failed")
                .kind(MessageDialogKind::Error)
                .show(|_| {});
            return Ok(());
        }
    }

    window.destroy().map_err(|e| e.to_string())
}
