mod backend;
mod commands;
mod config;
mod format;
mod session;
mod types;

use backend::BackendClient;
use commands::AppState;
use session::ScanSession;
use std::sync::Mutex;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir().map_err(|e| e.to_string())?;
            // Load .env from the app data dir so users can point the app at
            // another backend without rebuilding (Settings -> Open app data folder)
            let env_path = data_dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
            let client = BackendClient::from_env()?;
            app.manage(AppState {
                session: Mutex::new(ScanSession::default()),
                client,
                data_dir,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_version,
            commands::get_app_data_path,
            commands::open_app_data_folder,
            commands::get_backend_url,
            commands::get_sheet_url,
            commands::save_sheet_url,
            commands::get_session,
            commands::select_file,
            commands::clear_file,
            commands::scan_document,
            commands::update_review_field,
            commands::update_review_item,
            commands::submit_review,
            commands::discard_review,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
