//! Per-page information for the editor UI

use pageedit_core::{CropFraction, EditSession, PageGeometry, TargetSize};
use serde::Serialize;

/// What the UI needs to draw one page tile
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Original page index (0-based)
    pub index: usize,
    /// Width in points as a viewer shows the source page
    pub width: f64,
    /// Height in points as a viewer shows the source page
    pub height: f64,
    /// The page's own rotation
    pub native_rotation: u16,
    /// Rotation recorded in this session, on top of the native one
    pub rotation: u16,
    pub orientation: PageOrientation,
    pub excluded: bool,
    pub crop: Option<CropFraction>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageOrientation {
    fn of(width: f64, height: f64) -> Self {
        if (width - height).abs() < 1.0 {
            PageOrientation::Square
        } else if width > height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }
}

impl PageInfo {
    pub fn new(index: usize, geometry: &PageGeometry, session: &EditSession) -> Self {
        let displayed = geometry.displayed_size();
        Self {
            index,
            width: displayed.width,
            height: displayed.height,
            native_rotation: geometry.rotation,
            rotation: session.rotation(index),
            orientation: PageOrientation::of(displayed.width, displayed.height),
            excluded: session.is_excluded(index),
            crop: session.crop(index),
            target: session.target_size(index).as_ref().map(TargetSize::to_string),
        }
    }
}
