//! Persisted user options (`options.json` in the app data dir). The only
//! option today is the destination Google Sheets link. Reading fails open:
//! a missing file, unreadable JSON, or a blank value all mean "not
//! configured", never an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const OPTIONS_FILE: &str = "options.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(rename = "sheetUrl", default)]
    pub sheet_url: Option<String>,
}

pub fn options_path(data_dir: &Path) -> PathBuf {
    data_dir.join(OPTIONS_FILE)
}

/// Configuration guard. Callers must check this before any scan or append
/// network call and redirect the user to settings on `None`.
pub fn sheet_url(data_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(options_path(data_dir)).ok()?;
    let options: ScanOptions = serde_json::from_str(&content).ok()?;
    let url = options.sheet_url?;
    let url = url.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Accepts either a full `docs.google.com/spreadsheets/d/...` link or a bare
/// spreadsheet ID and returns the canonical sheet URL.
pub fn normalize_sheet_input(input: &str) -> Result<String, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Sheet link or ID is empty.".to_string());
    }
    let link_re =
        Regex::new(r"docs\.google\.com/spreadsheets/d/[A-Za-z0-9_-]+").expect("sheet link regex");
    if link_re.is_match(input) {
        return Ok(input.to_string());
    }
    // Spreadsheet IDs are 44-char base64url-ish tokens.
    let id_re = Regex::new(r"^[A-Za-z0-9_-]{44,}$").expect("sheet id regex");
    if id_re.is_match(input) {
        return Ok(format!("https://docs.google.com/spreadsheets/d/{}", input));
    }
    Err("Not a Google Sheets link or spreadsheet ID.".to_string())
}

/// Validates, canonicalizes and persists the sheet link. Returns the stored
/// URL.
pub fn save_sheet_url(data_dir: &Path, input: &str) -> Result<String, String> {
    let url = normalize_sheet_input(input)?;
    fs::create_dir_all(data_dir).map_err(|e| e.to_string())?;
    let options = ScanOptions {
        sheet_url: Some(url.clone()),
    };
    let json = serde_json::to_string_pretty(&options).map_err(|e| e.to_string())?;
    fs::write(options_path(data_dir), json).map_err(|e| e.to_string())?;
    Ok(url)
}
