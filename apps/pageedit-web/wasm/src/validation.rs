//! PDF validation and info extraction
//!
//! Runs before a session is created, so the UI can reject a file early
//! and show what it is.

use lopdf::{Dictionary, Document, Object};
use pageedit_core::EditError;
use serde::Serialize;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default)]
pub struct PdfInfo {
    pub page_count: u32,
    /// Header version (e.g. "1.7")
    pub version: String,
    /// Encrypted files can be inspected but not edited
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

fn check_header(bytes: &[u8]) -> Result<(), EditError> {
    if bytes.len() < 8 {
        return Err(EditError::SourceCorrupt(
            "file too small to be a valid PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(EditError::SourceCorrupt("missing %PDF- header".into()));
    }
    Ok(())
}

/// Parse the document and report what the UI shows about it.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, EditError> {
    check_header(bytes)?;

    let document =
        Document::load_mem(bytes).map_err(|e| EditError::SourceCorrupt(e.to_string()))?;
    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(EditError::SourceCorrupt("PDF has no pages".into()));
    }

    let info = info_dict(&document);
    Ok(PdfInfo {
        page_count,
        version: extract_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: info.and_then(|d| text_entry(d, b"Title")),
        author: info.and_then(|d| text_entry(d, b"Author")),
    })
}

/// Version from the header, e.g. `%PDF-1.7`
fn extract_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

fn info_dict(document: &Document) -> Option<&Dictionary> {
    let id = document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    document.get_object(id).ok()?.as_dict().ok()
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) if !bytes.is_empty() => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        _ => None,
    }
}

/// Cheap structural check without parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), EditError> {
    check_header(bytes)?;

    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(EditError::SourceCorrupt(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }
    Ok(())
}
