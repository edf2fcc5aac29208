pub mod commands;
pub mod state;
#[cfg(feature = "desktop")]
mod windows;

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
pub fn run() {
    use commands::settings::ConfigStore;
    use commands::{catalog, folders, settings};
    use state::AppState;
    use tauri::Manager;

    init_tracing();

    let config_store = ConfigStore::default_location();
    tracing::info!(config = %config_store.path().display(), "starting");

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(AppState::new(config_store))
        .invoke_handler(tauri::generate_handler![
            catalog::get_catalog,
            catalog::open_file,
            catalog::update_buffer,
            catalog::create_new_file,
            folders::select_folder,
            settings::get_config,
            windows::close_main_window,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        // Covers quitting without going through the frontend; a no-op after
        // a successful close.
        if let tauri::RunEvent::Exit = event {
            if let Err(e) = app.state::<AppState>().shutdown() {
                tracing::error!(error = %e, "could not save files on exit");
            }
        }
    });
}
