//! Contract toward the document library
//!
//! The rebuilder only speaks this trait. [`crate::lopdf_backend::LopdfBackend`]
//! is the production implementation; tests may supply their own.

use crate::config::OutputConfig;
use crate::error::Result;
use crate::geometry::{Placement, Rect, Size};
use serde::Serialize;

/// Geometry of one source page, inherited attributes resolved
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PageGeometry {
    pub media_box: Rect,
    pub crop_box: Option<Rect>,
    /// Clockwise display rotation, one of 0, 90, 180, 270
    pub rotation: u16,
}

impl PageGeometry {
    /// Region a viewer shows: the crop box when present, else the media box.
    pub fn visible_box(&self) -> Rect {
        self.crop_box.unwrap_or(self.media_box)
    }

    /// Native page size in points.
    pub fn native_size(&self) -> Size {
        self.media_box.size()
    }

    /// Size as a viewer shows it, rotation applied.
    pub fn displayed_size(&self) -> Size {
        self.visible_box().size().rotated(self.rotation)
    }
}

/// Operations the rebuilder needs from a document library.
///
/// Output pages are appended in the order `copy_page` / `create_page`
/// are called.
pub trait DocumentBackend {
    /// Parsed, read-only source document
    type Source;
    /// Output document under construction
    type Output;
    /// Handle to a page in the output
    type PageRef: Copy;
    /// Handle to a source page embedded as a reusable drawing
    type Drawable: Copy;

    fn open(&self, bytes: &[u8]) -> Result<Self::Source>;

    fn page_count(&self, source: &Self::Source) -> usize;

    fn page_geometry(&self, source: &Self::Source, index: usize) -> Result<PageGeometry>;

    fn create_output(&self, source: &Self::Source) -> Result<Self::Output>;

    /// Append a copy of a source page.
    fn copy_page(
        &self,
        output: &mut Self::Output,
        source: &Self::Source,
        index: usize,
    ) -> Result<Self::PageRef>;

    /// Embed a source page, clipped to `clip` (page space), for drawing.
    fn embed_page(
        &self,
        output: &mut Self::Output,
        source: &Self::Source,
        index: usize,
        clip: Rect,
    ) -> Result<Self::Drawable>;

    fn set_rotation(
        &self,
        output: &mut Self::Output,
        page: Self::PageRef,
        degrees: u16,
    ) -> Result<()>;

    fn set_crop_box(&self, output: &mut Self::Output, page: Self::PageRef, rect: Rect)
        -> Result<()>;

    /// Append a blank page.
    fn create_page(&self, output: &mut Self::Output, size: Size) -> Result<Self::PageRef>;

    fn draw_embedded(
        &self,
        output: &mut Self::Output,
        page: Self::PageRef,
        drawable: Self::Drawable,
        placement: &Placement,
    ) -> Result<()>;

    fn save(&self, output: Self::Output, options: &OutputConfig) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_box_prefers_crop_box() {
        let geometry = PageGeometry {
            media_box: Rect::new(0.0, 0.0, 612.0, 792.0),
            crop_box: Some(Rect::new(10.0, 10.0, 300.0, 400.0)),
            rotation: 90,
        };
        assert_eq!(geometry.visible_box(), Rect::new(10.0, 10.0, 300.0, 400.0));
        assert_eq!(geometry.native_size(), Size::new(612.0, 792.0));
        assert_eq!(geometry.displayed_size(), Size::new(400.0, 300.0));
    }
}
