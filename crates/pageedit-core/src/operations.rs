//! Page edit operations
//!
//! Each operation targets one page by its original index. Indices are
//! zero-based and never change for the lifetime of a loaded document.

use crate::coords::CropFraction;
use crate::paper::TargetSize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOp {
    /// Crop to a selection made on the preview (fractions of the preview)
    Crop { page: usize, rect: CropFraction },
    /// Remove a recorded crop
    ClearCrop { page: usize },
    /// Rotate clockwise by a delta; accumulates
    RotateBy { page: usize, degrees: i64 },
    /// Set whether the page is left out of the output
    Exclude { page: usize, excluded: bool },
    /// Redraw the page centered on a page of another size
    ResizeTo { page: usize, target: TargetSize },
    /// Remove a recorded resize
    ClearResize { page: usize },
}

/// Discriminant of [`EditOp`], used by tools to declare what they record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Crop,
    Rotate,
    Exclude,
    Reorder,
    Resize,
}

impl EditOp {
    pub fn page(&self) -> usize {
        match self {
            EditOp::Crop { page, .. }
            | EditOp::ClearCrop { page }
            | EditOp::RotateBy { page, .. }
            | EditOp::Exclude { page, .. }
            | EditOp::ResizeTo { page, .. }
            | EditOp::ClearResize { page } => *page,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            EditOp::Crop { .. } | EditOp::ClearCrop { .. } => OpKind::Crop,
            EditOp::RotateBy { .. } => OpKind::Rotate,
            EditOp::Exclude { .. } => OpKind::Exclude,
            EditOp::ResizeTo { .. } | EditOp::ClearResize { .. } => OpKind::Resize,
        }
    }
}

/// Accumulated edits for one original page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageEdits {
    /// Clockwise, normalized to 0..360
    #[serde(default)]
    pub rotation: u16,
    #[serde(default)]
    pub crop: Option<CropFraction>,
    #[serde(default)]
    pub target: Option<TargetSize>,
}

impl PageEdits {
    pub fn is_empty(&self) -> bool {
        self.rotation == 0 && self.crop.is_none() && self.target.is_none()
    }
}
