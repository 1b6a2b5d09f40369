//! HTTP client for the OCR/sheets backend. The client never raises across
//! its boundary: scans come back as `Option<ScanResult>` and appends as a
//! plain `bool`; the caller shows a generic failure message because the
//! backend's error vocabulary is not a stable contract.

use crate::types::{DocumentFields, FileInfo, LineItem, ScanResult, ScanType};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::blocking::{multipart, Client, Response};
use serde_json::Value;
use std::fs;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const APPEND_ENDPOINT: &str = "/append";

/// Wire encoding for scan uploads, chosen once per process. Desktop uses
/// multipart; the base64-JSON shape matches what a browser-hosted front end
/// sends and stays selectable for backends that only accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Multipart,
    Base64Json,
}

impl PayloadEncoding {
    pub fn from_env() -> Self {
        match std::env::var("SCANNER_PAYLOAD_ENCODING") {
            Ok(v) if v.trim().eq_ignore_ascii_case("base64") => PayloadEncoding::Base64Json,
            _ => PayloadEncoding::Multipart,
        }
    }
}

/// Backend base URL: `SCANNER_BACKEND_URL` from the environment or `.env`,
/// falling back to the local default.
pub fn base_url_from_env() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("SCANNER_BACKEND_URL")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// A scan request body, built before any socket is touched so the wire
/// shape is testable on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    Json {
        image: String,
    },
    Multipart {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// MIME type from the file extension, for pickers that do not report one.
pub fn mime_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Encode a selected file for transport. A `data:` URI already carries its
/// base64 payload and contributes it verbatim; plain paths are read from
/// disk.
pub fn encode_file(file: &FileInfo, encoding: PayloadEncoding) -> Result<ScanPayload, String> {
    match encoding {
        PayloadEncoding::Base64Json => {
            let image = if file.uri.starts_with("data:") {
                match file.uri.split_once(',') {
                    Some((_, b64)) => b64.to_string(),
                    None => return Err("Malformed data URI.".to_string()),
                }
            } else {
                let bytes =
                    fs::read(&file.uri).map_err(|e| format!("Could not read file: {}", e))?;
                BASE64.encode(&bytes)
            };
            Ok(ScanPayload::Json { image })
        }
        PayloadEncoding::Multipart => {
            let bytes = fs::read(&file.uri).map_err(|e| format!("Could not read file: {}", e))?;
            let mime_type = file
                .mime_type
                .clone()
                .unwrap_or_else(|| mime_from_name(&file.name).to_string());
            Ok(ScanPayload::Multipart {
                file_name: file.name.clone(),
                mime_type,
                bytes,
            })
        }
    }
}

/// Canonical scan response contract:
/// `{"success": true, "fields": {...}, "itens": [...]}` (flat). The parser
/// also tolerates the variants older backend builds produce: the data
/// nested under `results[0]`, and `items` as an alias for `itens`.
/// Anything else, or `success != true`, parses to `None`.
pub fn parse_scan_response(json: &Value) -> Option<ScanResult> {
    if !json.get("success").and_then(|s| s.as_bool()).unwrap_or(false) {
        return None;
    }
    let data = match json.get("results").and_then(|r| r.as_array()) {
        Some(results) => results.first()?,
        None => json,
    };
    let fields_obj = data.get("fields")?.as_object()?;
    let mut fields = DocumentFields::default();
    for (key, value) in fields_obj {
        let value = value_to_string(value);
        match key.as_str() {
            "cnpj" => fields.cnpj = value,
            "data_emissao" => fields.data_emissao = value,
            "valor_total" => fields.valor_total = value,
            _ => {
                fields.extra.insert(key.clone(), value);
            }
        }
    }
    let empty: Vec<Value> = vec![];
    let raw_items = data
        .get("itens")
        .or_else(|| data.get("items"))
        .and_then(|i| i.as_array())
        .unwrap_or(&empty);
    let mut items = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        items.push(LineItem {
            descricao: raw.get("descricao").map(value_to_string).unwrap_or_default(),
            quantidade: raw
                .get("quantidade")
                .map(value_to_string)
                .unwrap_or_default(),
            preco_total: raw
                .get("preco_total")
                .map(value_to_string)
                .unwrap_or_default(),
        });
    }
    Some(ScanResult { fields, items })
}

/// OCR backends stringify loosely; numbers and booleans are kept as their
/// display form rather than dropped.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    encoding: PayloadEncoding,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, encoding: PayloadEncoding) -> Result<Self, String> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            encoding,
            http,
        })
    }

    pub fn from_env() -> Result<Self, String> {
        Self::new(base_url_from_env(), PayloadEncoding::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// Dispatch a file to the OCR endpoint for `scan_type`. Transport
    /// errors, non-2xx statuses, unparseable JSON and backend-reported
    /// failure all collapse to `None`.
    pub fn call_backend(&self, file: &FileInfo, scan_type: ScanType) -> Option<ScanResult> {
        let url = format!("{}{}", self.base_url, scan_type.endpoint());
        let payload = match encode_file(file, self.encoding) {
            Ok(p) => p,
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("[scan] encode failed: {}", _e);
                return None;
            }
        };
        let response = match self.send_scan(&url, payload) {
            Ok(r) => r,
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("[scan] request to {} failed: {}", url, _e);
                return None;
            }
        };
        if !response.status().is_success() {
            #[cfg(debug_assertions)]
            eprintln!("[scan] backend returned {}", response.status());
            return None;
        }
        let json: Value = response.json().ok()?;
        parse_scan_response(&json)
    }

    fn send_scan(&self, url: &str, payload: ScanPayload) -> reqwest::Result<Response> {
        match payload {
            ScanPayload::Json { image } => self
                .http
                .post(url)
                .json(&serde_json::json!({ "image": image }))
                .send(),
            ScanPayload::Multipart {
                file_name,
                mime_type,
                bytes,
            } => {
                let part = multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)?;
                let form = multipart::Form::new().part("file", part);
                self.http.post(url).multipart(form).send()
            }
        }
    }

    /// Post the reviewed data to the append endpoint. Single attempt;
    /// returns the backend's `success` flag, or `false` on any failure.
    /// The sheet-configured guard belongs to the caller and must run
    /// before this.
    pub fn append_data(&self, fields: &DocumentFields, items: &[LineItem]) -> bool {
        let url = format!("{}{}", self.base_url, APPEND_ENDPOINT);
        let body = serde_json::json!({ "fields": fields, "itens": items });
        let response = match self.http.post(&url).json(&body).send() {
            Ok(r) => r,
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("[append] request to {} failed: {}", url, _e);
                return false;
            }
        };
        if !response.status().is_success() {
            #[cfg(debug_assertions)]
            eprintln!("[append] backend returned {}", response.status());
            return false;
        }
        let json: Value = match response.json() {
            Ok(j) => j,
            Err(_) => return false,
        };
        json.get("success").and_then(|s| s.as_bool()).unwrap_or(false)
    }
}
