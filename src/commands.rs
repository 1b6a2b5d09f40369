use crate::backend::{self, BackendClient};
use crate::config;
use crate::session::{ScanSession, SessionSnapshot};
use crate::types::{DocumentFields, FileInfo, LineItem, ScanResult, ScanType};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tauri::{AppHandle, Manager, State};

pub const SHEET_NOT_CONFIGURED: &str =
    "Google Sheets is not configured. Add a sheet link in Settings first.";
pub const SCAN_FAILED: &str = "Could not process the file.";
pub const SEND_FAILED: &str = "Could not send data.";

pub struct AppState {
    pub session: Mutex<ScanSession>,
    pub client: BackendClient,
    pub data_dir: PathBuf,
}

fn lock(session: &Mutex<ScanSession>) -> Result<std::sync::MutexGuard<'_, ScanSession>, String> {
    session.lock().map_err(|_| "Session state poisoned.".to_string())
}

/// Validate a picked file before it replaces the current selection: it must
/// exist and be an image or a PDF. Pickers do not always report a name or
/// MIME type, so both fall back to the path.
fn validate_selection(
    path: &str,
    name: Option<String>,
    size: Option<u64>,
    mime_type: Option<String>,
) -> Result<FileInfo, String> {
    let meta = fs::metadata(path).map_err(|_| "File not found.".to_string())?;
    if !meta.is_file() {
        return Err("Not a file.".to_string());
    }
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| {
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string()
    });
    let mime = mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| backend::mime_from_name(&name).to_string());
    if !(mime.starts_with("image/") || mime == "application/pdf") {
        return Err("Unsupported file type. Pick an image or a PDF.".to_string());
    }
    Ok(FileInfo {
        uri: path.to_string(),
        name,
        size: size.or(Some(meta.len())),
        mime_type: Some(mime),
    })
}

/// Scan precondition and dispatch. The sheet guard runs before anything
/// else; on `None` from the scanner the session falls back to
/// `FileSelected` and a generic failure is reported. The session lock is
/// not held across the scan call.
fn scan_with<F>(
    session: &Mutex<ScanSession>,
    data_dir: &Path,
    scan: F,
) -> Result<SessionSnapshot, String>
where
    F: FnOnce(&FileInfo) -> Option<ScanResult>,
{
    if config::sheet_url(data_dir).is_none() {
        return Err(SHEET_NOT_CONFIGURED.to_string());
    }
    let file = lock(session)?.begin_scan()?;
    let result = scan(&file);
    let mut session = lock(session)?;
    match result {
        Some(result) => Ok(session.scan_succeeded(result)),
        None => {
            session.scan_failed();
            Err(SCAN_FAILED.to_string())
        }
    }
}

/// Append precondition and dispatch. The sheet guard runs before the
/// sender is consulted, so an unconfigured target makes zero network
/// calls. Failure falls back to `Reviewing` with edits kept.
fn submit_with<F>(session: &Mutex<ScanSession>, data_dir: &Path, send: F) -> Result<(), String>
where
    F: FnOnce(&DocumentFields, &[LineItem]) -> bool,
{
    if config::sheet_url(data_dir).is_none() {
        return Err(SHEET_NOT_CONFIGURED.to_string());
    }
    let (fields, items) = lock(session)?.begin_submit()?;
    let ok = send(&fields, &items);
    let mut session = lock(session)?;
    if ok {
        session.submit_succeeded();
        Ok(())
    } else {
        session.submit_failed();
        Err(SEND_FAILED.to_string())
    }
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
pub fn get_app_data_path(app: AppHandle) -> Result<String, String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path".to_string())
}

#[tauri::command]
pub fn open_app_data_folder(app: AppHandle) -> Result<(), String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    opener::open(&path).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_backend_url(state: State<AppState>) -> String {
    state.client.base_url().to_string()
}

#[tauri::command]
pub fn get_sheet_url(state: State<AppState>) -> Option<String> {
    config::sheet_url(&state.data_dir)
}

#[tauri::command]
pub fn save_sheet_url(state: State<AppState>, input: String) -> Result<String, String> {
    config::save_sheet_url(&state.data_dir, &input)
}

#[tauri::command]
pub fn get_session(state: State<AppState>) -> Result<SessionSnapshot, String> {
    Ok(lock(&state.session)?.snapshot())
}

#[tauri::command]
pub fn select_file(
    state: State<AppState>,
    path: String,
    name: Option<String>,
    size: Option<u64>,
    mime_type: Option<String>,
) -> Result<SessionSnapshot, String> {
    let file = validate_selection(&path, name, size, mime_type)?;
    let mut session = lock(&state.session)?;
    session.select_file(file)?;
    Ok(session.snapshot())
}

#[tauri::command]
pub fn clear_file(state: State<AppState>) -> Result<SessionSnapshot, String> {
    let mut session = lock(&state.session)?;
    session.clear_file()?;
    Ok(session.snapshot())
}

/// Blocking by design: tauri runs sync commands off the main thread, and
/// the session lock is released while the request is in flight.
#[tauri::command]
pub fn scan_document(
    state: State<AppState>,
    scan_type: ScanType,
) -> Result<SessionSnapshot, String> {
    scan_with(&state.session, &state.data_dir, |file| {
        state.client.call_backend(file, scan_type)
    })
}

#[tauri::command]
pub fn update_review_field(
    state: State<AppState>,
    key: String,
    value: String,
) -> Result<String, String> {
    lock(&state.session)?.update_field(&key, &value)
}

#[tauri::command]
pub fn update_review_item(
    state: State<AppState>,
    index: usize,
    key: String,
    value: String,
) -> Result<String, String> {
    lock(&state.session)?.update_item(index, &key, &value)
}

#[tauri::command]
pub fn submit_review(state: State<AppState>) -> Result<SessionSnapshot, String> {
    submit_with(&state.session, &state.data_dir, |fields, items| {
        state.client.append_data(fields, items)
    })?;
    Ok(lock(&state.session)?.snapshot())
}

#[tauri::command]
pub fn discard_review(state: State<AppState>) -> Result<SessionSnapshot, String> {
    let mut session = lock(&state.session)?;
    session.discard()?;
    Ok(session.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Stage;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn reviewing_session() -> Mutex<ScanSession> {
        let mut session = ScanSession::default();
        session
            .select_file(FileInfo {
                uri: "/tmp/invoice.pdf".to_string(),
                name: "invoice.pdf".to_string(),
                size: None,
                mime_type: Some("application/pdf".to_string()),
            })
            .unwrap();
        session.begin_scan().unwrap();
        session.scan_succeeded(ScanResult {
            fields: DocumentFields {
                cnpj: "12345678000199".to_string(),
                data_emissao: "01012024".to_string(),
                valor_total: "100,00".to_string(),
                extra: BTreeMap::new(),
            },
            items: vec![],
        });
        Mutex::new(session)
    }

    fn configured_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        config::save_sheet_url(
            dir.path(),
            "https://docs.google.com/spreadsheets/d/1FVcGb3GG1eii4JReZ9SVKIfKS20DW6p2oCAMQ0VHPdU",
        )
        .unwrap();
        dir
    }

    #[test]
    fn unconfigured_submit_makes_zero_send_calls() {
        let dir = tempfile::tempdir().unwrap();
        let session = reviewing_session();
        let called = Cell::new(false);
        let err = submit_with(&session, dir.path(), |_, _| {
            called.set(true);
            true
        })
        .unwrap_err();
        assert_eq!(err, SHEET_NOT_CONFIGURED);
        assert!(!called.get());
        // Guard fires before the state machine moves.
        assert_eq!(session.lock().unwrap().stage(), Stage::Reviewing);
    }

    #[test]
    fn unconfigured_scan_makes_zero_backend_calls() {
        let dir = tempfile::tempdir().unwrap();
        let session = reviewing_session();
        let called = Cell::new(false);
        let err = scan_with(&session, dir.path(), |_| {
            called.set(true);
            None
        })
        .unwrap_err();
        assert_eq!(err, SHEET_NOT_CONFIGURED);
        assert!(!called.get());
    }

    #[test]
    fn failed_send_returns_to_reviewing() {
        let dir = configured_dir();
        let session = reviewing_session();
        let err = submit_with(&session, dir.path(), |_, _| false).unwrap_err();
        assert_eq!(err, SEND_FAILED);
        assert_eq!(session.lock().unwrap().stage(), Stage::Reviewing);
    }

    #[test]
    fn successful_send_resets_the_cycle() {
        let dir = configured_dir();
        let session = reviewing_session();
        let seen = Cell::new(false);
        submit_with(&session, dir.path(), |fields, _| {
            seen.set(true);
            // Normalized at scan receipt, sent in canonical form.
            assert_eq!(fields.cnpj, "12.345.678/0001-99");
            true
        })
        .unwrap();
        assert!(seen.get());
        let session = session.lock().unwrap();
        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.file().is_none());
    }

    #[test]
    fn failed_scan_keeps_the_file() {
        let dir = configured_dir();
        let session = Mutex::new(ScanSession::default());
        session
            .lock()
            .unwrap()
            .select_file(FileInfo {
                uri: "/tmp/nota.png".to_string(),
                name: "nota.png".to_string(),
                size: None,
                mime_type: Some("image/png".to_string()),
            })
            .unwrap();
        let err = scan_with(&session, dir.path(), |_| None).unwrap_err();
        assert_eq!(err, SCAN_FAILED);
        let session = session.lock().unwrap();
        assert_eq!(session.stage(), Stage::FileSelected);
        assert!(session.file().is_some());
    }

    #[test]
    fn successful_scan_normalizes_before_review() {
        let dir = configured_dir();
        let session = Mutex::new(ScanSession::default());
        session
            .lock()
            .unwrap()
            .select_file(FileInfo {
                uri: "/tmp/invoice.pdf".to_string(),
                name: "invoice.pdf".to_string(),
                size: None,
                mime_type: None,
            })
            .unwrap();
        let snapshot = scan_with(&session, dir.path(), |file| {
            assert_eq!(file.name, "invoice.pdf");
            Some(ScanResult {
                fields: DocumentFields {
                    cnpj: "12345678000199".to_string(),
                    ..Default::default()
                },
                items: vec![],
            })
        })
        .unwrap();
        assert_eq!(snapshot.fields.unwrap().cnpj, "12.345.678/0001-99");
        assert_eq!(session.lock().unwrap().stage(), Stage::Reviewing);
    }

    #[test]
    fn selection_validation() {
        let mut tmp = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        tmp.write_all(b"%PDF-1.4").unwrap();
        let path = tmp.path().to_str().unwrap();

        let file = validate_selection(path, None, None, None).unwrap();
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.kind(), crate::types::FileKind::Pdf);
        assert!(file.size.unwrap() > 0);

        assert!(validate_selection("/no/such/file.png", None, None, None).is_err());
        assert!(validate_selection(
            path,
            Some("notes.txt".to_string()),
            None,
            Some("text/plain".to_string())
        )
        .is_err());
    }
}
