//! Page edit engine
//!
//! Crop, rotate, reorder, remove, extract and resize the pages of a PDF
//! entirely on the client, using lopdf.
//!
//! The pieces:
//! - [`EditSession`] records pending edits against immutable original
//!   page indices and produces a [`BuildPlan`].
//! - [`rebuild()`] turns a source document plus a plan into new bytes,
//!   atomically.
//! - [`coords`] maps selections between preview pixels and page points.
//! - [`Engine`] drives the load/edit/build/export lifecycle.
//! - [`render`] validates previews from a host-supplied rasterizer and,
//!   with the `async` feature, renders them on a bounded pool.

pub mod backend;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod lopdf_backend;
pub mod operations;
pub mod paper;
pub mod plan;
pub mod rebuild;
pub mod render;
pub mod session;
pub mod tools;

pub use backend::{DocumentBackend, PageGeometry};
pub use config::{EngineConfig, OutputConfig, RenderConfig};
pub use coords::{fraction_of_preview, to_page_rect, to_preview_rect, CropFraction};
pub use engine::{Engine, Epoch, ExportArtifact, ExportSink, SessionState};
pub use error::{EditError, ErrorCategory, Result};
pub use geometry::{fit_centered, Placement, Rect, Size};
pub use lopdf_backend::LopdfBackend;
pub use operations::{EditOp, OpKind};
pub use paper::{Orientation, PaperSize, TargetSize};
pub use plan::{BuildPlan, PageStrategy, PlanEntry};
pub use rebuild::rebuild;
pub use render::{Bitmap, PreviewPage, PreviewRenderer, Rasterizer};
pub use session::EditSession;
pub use tools::{suggested_filename, Tool};

#[cfg(feature = "async")]
pub use engine::PendingBuild;
#[cfg(feature = "async")]
pub use render::RenderPool;

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<usize> {
    let backend = LopdfBackend;
    let source = backend.open(bytes)?;
    Ok(backend.page_count(&source))
}
