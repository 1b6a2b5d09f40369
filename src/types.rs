use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized result of the platform file picker. Immutable once selected;
/// re-selecting replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileInfo {
    /// `.pdf` extension (case-insensitive) or an explicit PDF MIME type wins;
    /// everything else is treated as an image.
    pub fn kind(&self) -> FileKind {
        if self.name.to_lowercase().ends_with(".pdf")
            || self.mime_type.as_deref() == Some("application/pdf")
        {
            FileKind::Pdf
        } else {
            FileKind::Image
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

/// OCR backend variant. Each value maps 1:1 to a fixed endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    GoogleVision,
    Tesseract,
}

impl ScanType {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ScanType::GoogleVision => "/scan",
            ScanType::Tesseract => "/scan_tesseract",
        }
    }
}

/// Extracted document fields. The three fields the review form formats
/// specially are named; anything else the backend returns lands in `extra`
/// and is edited verbatim. The key set is frozen once a scan completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFields {
    #[serde(default)]
    pub cnpj: String,
    #[serde(default)]
    pub data_emissao: String,
    #[serde(default)]
    pub valor_total: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// One document line item. Quantities and prices stay formatted strings so
/// the review form shows exactly what gets appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub quantidade: String,
    #[serde(default)]
    pub preco_total: String,
}

/// Parsed payload of a successful scan response. Item order matches the
/// source document and is preserved through review edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub fields: DocumentFields,
    pub items: Vec<LineItem>,
}
