//! Per-window scan cycle:
//! `Idle -> FileSelected -> Scanning -> Reviewing -> Submitting -> Idle`.
//! A failed scan falls back to `FileSelected` with the file kept; a failed
//! submit falls back to `Reviewing` with edits kept. Discard, submit
//! success and clearing the selection all return to `Idle`. The stage
//! doubles as the busy flag: commands reject re-entry while a network call
//! is in flight.

use crate::format;
use crate::types::{DocumentFields, FileInfo, FileKind, LineItem, ScanResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    FileSelected,
    Scanning,
    Reviewing,
    Submitting,
}

/// What the frontend needs to render the current cycle state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FileKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<DocumentFields>,
    pub items: Vec<LineItem>,
}

#[derive(Debug)]
pub struct ScanSession {
    stage: Stage,
    file: Option<FileInfo>,
    review: Option<ScanResult>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            file: None,
            review: None,
        }
    }
}

impl ScanSession {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.stage,
            file: self.file.clone(),
            kind: self.file.as_ref().map(FileInfo::kind),
            fields: self.review.as_ref().map(|r| r.fields.clone()),
            items: self
                .review
                .as_ref()
                .map(|r| r.items.clone())
                .unwrap_or_default(),
        }
    }

    fn is_busy(&self) -> bool {
        matches!(self.stage, Stage::Scanning | Stage::Submitting)
    }

    /// Replace the current selection entirely. Picker cancellation never
    /// reaches this, so a kept file survives a cancelled re-pick.
    pub fn select_file(&mut self, file: FileInfo) -> Result<FileKind, String> {
        if self.is_busy() {
            return Err("A request is already in progress.".to_string());
        }
        let kind = file.kind();
        self.file = Some(file);
        self.review = None;
        self.stage = Stage::FileSelected;
        Ok(kind)
    }

    pub fn clear_file(&mut self) -> Result<(), String> {
        if self.is_busy() {
            return Err("A request is already in progress.".to_string());
        }
        self.file = None;
        self.review = None;
        self.stage = Stage::Idle;
        Ok(())
    }

    /// Enter `Scanning` and hand back the file for the network call. The
    /// caller must not hold the session lock while that call runs.
    pub fn begin_scan(&mut self) -> Result<FileInfo, String> {
        if self.is_busy() {
            return Err("A request is already in progress.".to_string());
        }
        match (&self.stage, &self.file) {
            (Stage::FileSelected, Some(file)) => {
                let file = file.clone();
                self.stage = Stage::Scanning;
                Ok(file)
            }
            _ => Err("No file selected.".to_string()),
        }
    }

    /// Scan failed: back to `FileSelected`, file kept for a retry.
    pub fn scan_failed(&mut self) {
        if self.stage == Stage::Scanning {
            self.stage = Stage::FileSelected;
        }
    }

    /// Scan succeeded: normalize every formatted field once on receipt so
    /// the review form never shows raw OCR output.
    pub fn scan_succeeded(&mut self, mut result: ScanResult) -> SessionSnapshot {
        format::normalize_fields(&mut result.fields);
        for item in &mut result.items {
            format::normalize_item(item);
        }
        self.review = Some(result);
        self.stage = Stage::Reviewing;
        self.snapshot()
    }

    /// Edit one field. The key set is frozen at scan time: named fields are
    /// always editable, overflow keys only if the scan produced them.
    pub fn update_field(&mut self, key: &str, value: &str) -> Result<String, String> {
        if self.stage != Stage::Reviewing {
            return Err("Nothing under review.".to_string());
        }
        let review = self.review.as_mut().ok_or("Nothing under review.")?;
        let formatted = format::format_field(key, value);
        match key {
            "cnpj" => review.fields.cnpj = formatted.clone(),
            "data_emissao" => review.fields.data_emissao = formatted.clone(),
            "valor_total" => review.fields.valor_total = formatted.clone(),
            _ => match review.fields.extra.get_mut(key) {
                Some(slot) => *slot = formatted.clone(),
                None => return Err(format!("Unknown field: {}", key)),
            },
        }
        Ok(formatted)
    }

    /// Edit one line item. The item list shape is frozen at scan time.
    pub fn update_item(&mut self, index: usize, key: &str, value: &str) -> Result<String, String> {
        if self.stage != Stage::Reviewing {
            return Err("Nothing under review.".to_string());
        }
        let review = self.review.as_mut().ok_or("Nothing under review.")?;
        let item = review
            .items
            .get_mut(index)
            .ok_or_else(|| format!("No item at index {}", index))?;
        let formatted = format::format_item_field(key, value);
        match key {
            "descricao" => item.descricao = formatted.clone(),
            "quantidade" => item.quantidade = formatted.clone(),
            "preco_total" => item.preco_total = formatted.clone(),
            _ => return Err(format!("Unknown item field: {}", key)),
        }
        Ok(formatted)
    }

    /// Enter `Submitting` and hand back the reviewed data for the append
    /// call.
    pub fn begin_submit(&mut self) -> Result<(DocumentFields, Vec<LineItem>), String> {
        if self.is_busy() {
            return Err("A request is already in progress.".to_string());
        }
        if self.stage != Stage::Reviewing {
            return Err("Nothing under review.".to_string());
        }
        let review = self.review.as_ref().ok_or("Nothing under review.")?;
        let data = (review.fields.clone(), review.items.clone());
        self.stage = Stage::Submitting;
        Ok(data)
    }

    /// Append failed: back to `Reviewing` with edits intact for a manual
    /// retry.
    pub fn submit_failed(&mut self) {
        if self.stage == Stage::Submitting {
            self.stage = Stage::Reviewing;
        }
    }

    /// Append accepted: the cycle is done, everything resets.
    pub fn submit_succeeded(&mut self) {
        self.file = None;
        self.review = None;
        self.stage = Stage::Idle;
    }

    /// Reject the reviewed data. Terminal: no undo, back to `Idle`.
    pub fn discard(&mut self) -> Result<(), String> {
        if self.is_busy() {
            return Err("A request is already in progress.".to_string());
        }
        self.file = None;
        self.review = None;
        self.stage = Stage::Idle;
        Ok(())
    }
}
