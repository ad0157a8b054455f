//! Stateful page edit session
//!
//! Holds the loaded document and all pending edits in Rust. JavaScript
//! renders previews, forwards user actions, and saves the returned bytes.
//! Every action has an `_internal` twin returning [`EditError`] so it can
//! be tested natively.

use crate::page_info::PageInfo;
use pageedit_core::{
    fraction_of_preview, CropFraction, EditError, EditOp, Engine, EngineConfig, ExportArtifact,
    LopdfBackend, OpKind, Rect, SessionState, Size, TargetSize, Tool,
};
use tracing::debug;
use wasm_bindgen::prelude::*;

fn to_js(e: EditError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// One document opened in one tool
#[wasm_bindgen]
pub struct PageEditSession {
    tool: Tool,
    engine: Engine<LopdfBackend>,
    progress_callback: Option<js_sys::Function>,
}

impl PageEditSession {
    pub fn new_internal(
        tool: &str,
        name: &str,
        bytes: &[u8],
        config: EngineConfig,
    ) -> Result<Self, EditError> {
        let tool: Tool = tool.parse()?;
        let mut engine = Engine::new(LopdfBackend, config)?;
        engine.load(name, bytes)?;
        Ok(Self {
            tool,
            engine,
            progress_callback: None,
        })
    }

    fn page_count_internal(&self) -> usize {
        self.engine.session().map_or(0, |s| s.page_count())
    }

    pub fn page_info_internal(&self, index: usize) -> Result<PageInfo, EditError> {
        let geometry = self.engine.page_geometry(index)?;
        Ok(PageInfo::new(index, &geometry, self.engine.session()?))
    }

    /// Pixel selection on a preview, as fractions of that preview.
    pub fn map_selection_internal(
        &self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        preview_width: f64,
        preview_height: f64,
    ) -> Result<CropFraction, EditError> {
        fraction_of_preview(
            Rect::new(x, y, width, height),
            Size::new(preview_width, preview_height),
        )
    }

    pub fn apply_internal(&mut self, op: &EditOp) -> Result<(), EditError> {
        if !self.tool.permits(op) {
            return Err(EditError::InvalidState(format!(
                "the {} tool does not record {:?} edits",
                self.tool,
                op.kind()
            )));
        }
        self.engine.session_mut()?.apply(op)
    }

    pub fn record_crop_internal(&mut self, index: usize, rect: CropFraction) -> Result<(), EditError> {
        self.apply_internal(&EditOp::Crop { page: index, rect })
    }

    pub fn record_rotation_internal(&mut self, index: usize, delta: i64) -> Result<u16, EditError> {
        self.tool.check(OpKind::Rotate)?;
        self.engine.session_mut()?.record_rotation(index, delta)
    }

    pub fn rotate_all_internal(&mut self, delta: i64) -> Result<(), EditError> {
        self.tool.check(OpKind::Rotate)?;
        self.engine.session_mut()?.rotate_all(delta);
        Ok(())
    }

    pub fn record_resize_internal(&mut self, index: usize, target: &str) -> Result<(), EditError> {
        let target: TargetSize = target.parse()?;
        self.apply_internal(&EditOp::ResizeTo {
            page: index,
            target,
        })
    }

    pub fn set_order_internal(&mut self, order: &[usize]) -> Result<(), EditError> {
        self.tool.check(OpKind::Reorder)?;
        self.engine.session_mut()?.set_order(order)
    }

    pub fn toggle_exclude_internal(&mut self, index: usize) -> Result<bool, EditError> {
        self.tool.check(OpKind::Exclude)?;
        self.engine.session_mut()?.toggle_exclude(index)
    }

    pub fn remove_pages_internal(&mut self, indices: &[usize]) -> Result<(), EditError> {
        self.tool.check(OpKind::Exclude)?;
        self.engine.session_mut()?.remove(indices)
    }

    pub fn extract_pages_internal(&mut self, indices: &[usize]) -> Result<(), EditError> {
        self.tool.check(OpKind::Reorder)?;
        self.engine.session_mut()?.extract(indices)
    }

    pub fn order_internal(&self) -> Result<Vec<usize>, EditError> {
        Ok(self.engine.session()?.order())
    }

    pub fn plan_json_internal(&self) -> Result<String, EditError> {
        self.engine
            .session()?
            .finalize()
            .to_json()
            .map_err(|e| EditError::SerializationFailure(e.to_string()))
    }

    pub fn reset_internal(&mut self) -> Result<(), EditError> {
        self.engine.session_mut()?.reset();
        Ok(())
    }

    pub fn build_internal(&mut self) -> Result<ExportArtifact, EditError> {
        let artifact = self.engine.build(Some(self.tool.suffix()))?;
        debug!(
            tool = %self.tool,
            bytes = artifact.bytes.len(),
            "session built"
        );
        Ok(artifact)
    }

    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let _ = callback.call3(
                &JsValue::null(),
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}

#[wasm_bindgen]
impl PageEditSession {
    /// Open `bytes` for editing with `tool` ("crop", "rotate", "rearrange",
    /// "remove", "extract" or "resize").
    #[wasm_bindgen(constructor)]
    pub fn new(tool: &str, name: &str, bytes: &[u8]) -> Result<PageEditSession, JsValue> {
        Self::new_internal(tool, name, bytes, EngineConfig::default()).map_err(to_js)
    }

    /// Like the constructor, with engine settings as TOML text.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        tool: &str,
        name: &str,
        bytes: &[u8],
        config_toml: &str,
    ) -> Result<PageEditSession, JsValue> {
        let config = EngineConfig::from_toml_str(config_toml).map_err(to_js)?;
        Self::new_internal(tool, name, bytes, config).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn tool(&self) -> String {
        self.tool.to_string()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> usize {
        self.page_count_internal()
    }

    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    #[wasm_bindgen(js_name = getPageInfo)]
    pub fn get_page_info(&self, index: usize) -> Result<JsValue, JsValue> {
        serialize(&self.page_info_internal(index).map_err(to_js)?)
    }

    /// Convert a pixel selection on a preview into the stored fraction form.
    #[wasm_bindgen(js_name = mapSelection)]
    pub fn map_selection(
        &self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        preview_width: f64,
        preview_height: f64,
    ) -> Result<JsValue, JsValue> {
        let fraction = self
            .map_selection_internal(x, y, width, height, preview_width, preview_height)
            .map_err(to_js)?;
        serialize(&fraction)
    }

    /// Crop a page; the rectangle is fractions of its preview.
    #[wasm_bindgen(js_name = recordCrop)]
    pub fn record_crop(
        &mut self,
        index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), JsValue> {
        let rect = CropFraction::new(x, y, width, height).map_err(to_js)?;
        self.record_crop_internal(index, rect).map_err(to_js)
    }

    #[wasm_bindgen(js_name = clearCrop)]
    pub fn clear_crop(&mut self, index: usize) -> Result<(), JsValue> {
        self.apply_internal(&EditOp::ClearCrop { page: index })
            .map_err(to_js)
    }

    /// Returns the page's new rotation.
    #[wasm_bindgen(js_name = recordRotation)]
    pub fn record_rotation(&mut self, index: usize, delta: i32) -> Result<u16, JsValue> {
        self.record_rotation_internal(index, delta as i64)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = rotateAll)]
    pub fn rotate_all(&mut self, delta: i32) -> Result<(), JsValue> {
        self.rotate_all_internal(delta as i64).map_err(to_js)
    }

    /// `target` like "A4", "letter-landscape".
    #[wasm_bindgen(js_name = recordResize)]
    pub fn record_resize(&mut self, index: usize, target: &str) -> Result<(), JsValue> {
        self.record_resize_internal(index, target).map_err(to_js)
    }

    #[wasm_bindgen(js_name = clearResize)]
    pub fn clear_resize(&mut self, index: usize) -> Result<(), JsValue> {
        self.apply_internal(&EditOp::ClearResize { page: index })
            .map_err(to_js)
    }

    /// Pages not listed are left out of the output.
    #[wasm_bindgen(js_name = setOrder)]
    pub fn set_order(&mut self, order: &[usize]) -> Result<(), JsValue> {
        self.set_order_internal(order).map_err(to_js)
    }

    /// Returns true when the page is now excluded.
    #[wasm_bindgen(js_name = toggleExclude)]
    pub fn toggle_exclude(&mut self, index: usize) -> Result<bool, JsValue> {
        self.toggle_exclude_internal(index).map_err(to_js)
    }

    #[wasm_bindgen(js_name = removePages)]
    pub fn remove_pages(&mut self, indices: &[usize]) -> Result<(), JsValue> {
        self.remove_pages_internal(indices).map_err(to_js)
    }

    #[wasm_bindgen(js_name = extractPages)]
    pub fn extract_pages(&mut self, indices: &[usize]) -> Result<(), JsValue> {
        self.extract_pages_internal(indices).map_err(to_js)
    }

    /// Apply an edit given as JSON, e.g. `{"type":"RotateBy","page":0,"degrees":90}`.
    #[wasm_bindgen(js_name = applyOp)]
    pub fn apply_op(&mut self, json: &str) -> Result<(), JsValue> {
        let op: EditOp = serde_json::from_str(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid operation: {}", e)))?;
        self.apply_internal(&op).map_err(to_js)
    }

    /// Current output order as original page indices.
    #[wasm_bindgen(js_name = getOrder)]
    pub fn get_order(&self) -> Result<Vec<u32>, JsValue> {
        let order = self.order_internal().map_err(to_js)?;
        Ok(order.into_iter().map(|i| i as u32).collect())
    }

    #[wasm_bindgen(js_name = getPlan)]
    pub fn get_plan(&self) -> Result<String, JsValue> {
        self.plan_json_internal().map_err(to_js)
    }

    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.reset_internal().map_err(to_js)
    }

    #[wasm_bindgen(js_name = suggestedFilename)]
    pub fn suggested_filename(&self) -> Result<String, JsValue> {
        self.engine
            .suggested_filename(Some(self.tool.suffix()))
            .map_err(to_js)
    }

    /// Build the edited document.
    pub fn build(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        self.report_progress(0, 100, "Building...");
        let artifact = self.build_internal().map_err(to_js)?;
        self.report_progress(100, 100, "Complete");

        let array = js_sys::Uint8Array::new_with_length(artifact.bytes.len() as u32);
        array.copy_from(&artifact.bytes);
        Ok(array)
    }
}
