//! WASM bindings for the page editing tools
//!
//! One session per opened document. All edit state lives in Rust; the page
//! previews are drawn by the browser's PDF renderer, and JavaScript only
//! forwards user actions and saves the built bytes.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PageEditSession } from './pkg/pageedit_wasm.js';
//!
//! await init();
//!
//! const session = new PageEditSession("crop", file.name, bytes);
//! const info = session.getPageInfo(0);
//! const rect = session.mapSelection(x, y, w, h, canvas.width, canvas.height);
//! session.recordCrop(0, rect.x, rect.y, rect.width, rect.height);
//! const result = session.build();
//! downloadBlob(result, session.suggestedFilename());
//! ```

pub mod page_info;
pub mod session;
pub mod validation;

#[cfg(test)]
mod test_support;

use wasm_bindgen::prelude::*;

pub use page_info::{PageInfo, PageOrientation};
pub use session::PageEditSession;
pub use validation::PdfInfo;

/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Names of the tools a session can be opened with
#[wasm_bindgen]
pub fn get_tools() -> Vec<String> {
    pageedit_core::Tool::ALL
        .iter()
        .map(|tool| tool.to_string())
        .collect()
}

/// Returns Ok(()) if the file looks like a complete PDF
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Detailed info without opening a session
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(info.page_count)
}
