//! Coordinate transformation between preview bitmaps and PDF pages
//!
//! A preview is a bitmap rendered at some scale, with a top-left origin.
//! A page is measured in points with a bottom-left origin. Selections are
//! stored as fractions of the preview so they survive re-rendering at a
//! different resolution.

use crate::error::{EditError, Result};
use crate::geometry::{Rect, Size};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

/// Map a preview-space rectangle onto page space.
///
/// X and Y scale independently; the Y axis is flipped:
/// `page_y = page_h - (preview_y + preview_h) * scale_y`.
pub fn to_page_rect(preview_rect: Rect, preview_size: Size, page_size: Size) -> Result<Rect> {
    check_rect(&preview_rect)?;
    check_size(&preview_size, "preview")?;
    check_size(&page_size, "page")?;

    let scale_x = page_size.width / preview_size.width;
    let scale_y = page_size.height / preview_size.height;

    Ok(Rect {
        x: preview_rect.x * scale_x,
        y: page_size.height - (preview_rect.y + preview_rect.height) * scale_y,
        width: preview_rect.width * scale_x,
        height: preview_rect.height * scale_y,
    })
}

/// Map a page-space rectangle back onto the preview. Inverse of [`to_page_rect`].
pub fn to_preview_rect(page_rect: Rect, preview_size: Size, page_size: Size) -> Result<Rect> {
    check_rect(&page_rect)?;
    check_size(&preview_size, "preview")?;
    check_size(&page_size, "page")?;

    let scale_x = preview_size.width / page_size.width;
    let scale_y = preview_size.height / page_size.height;

    Ok(Rect {
        x: page_rect.x * scale_x,
        y: (page_size.height - page_rect.y - page_rect.height) * scale_y,
        width: page_rect.width * scale_x,
        height: page_rect.height * scale_y,
    })
}

/// Express a preview selection as fractions of the preview.
pub fn fraction_of_preview(preview_rect: Rect, preview_size: Size) -> Result<CropFraction> {
    check_rect(&preview_rect)?;
    check_size(&preview_size, "preview")?;
    CropFraction::new(
        preview_rect.x / preview_size.width,
        preview_rect.y / preview_size.height,
        preview_rect.width / preview_size.width,
        preview_rect.height / preview_size.height,
    )
}

fn check_rect(rect: &Rect) -> Result<()> {
    if rect.is_degenerate() {
        return Err(EditError::InvalidSelection(format!(
            "rectangle {}x{} has no area",
            rect.width, rect.height
        )));
    }
    Ok(())
}

fn check_size(size: &Size, what: &str) -> Result<()> {
    if size.is_degenerate() {
        return Err(EditError::InvalidSelection(format!(
            "{} size {}x{} has no area",
            what, size.width, size.height
        )));
    }
    Ok(())
}

/// A selection stored relative to the preview: (0,0) is the top-left
/// corner, (1,1) the bottom-right.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropFraction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropFraction {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        let fraction = Self {
            x,
            y,
            width,
            height,
        };
        fraction.validate()?;
        Ok(fraction.clamped())
    }

    /// The whole preview.
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let components = [self.x, self.y, self.width, self.height];
        if components.iter().any(|c| !c.is_finite()) {
            return Err(EditError::InvalidSelection(
                "crop contains a non-finite value".into(),
            ));
        }
        if components
            .iter()
            .any(|&c| !(-EPSILON..=1.0 + EPSILON).contains(&c))
        {
            return Err(EditError::InvalidSelection(format!(
                "crop ({}, {}, {}, {}) leaves the unit square",
                self.x, self.y, self.width, self.height
            )));
        }
        if self.width <= EPSILON || self.height <= EPSILON {
            return Err(EditError::InvalidSelection("crop has no area".into()));
        }
        if self.x + self.width > 1.0 + EPSILON || self.y + self.height > 1.0 + EPSILON {
            return Err(EditError::InvalidSelection(
                "crop extends past the page edge".into(),
            ));
        }
        Ok(())
    }

    fn clamped(self) -> Self {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        Self {
            x,
            y,
            width: self.width.min(1.0 - x),
            height: self.height.min(1.0 - y),
        }
    }

    pub fn is_full(&self) -> bool {
        self.x.abs() < EPSILON
            && self.y.abs() < EPSILON
            && (self.width - 1.0).abs() < EPSILON
            && (self.height - 1.0).abs() < EPSILON
    }

    /// Pixel rectangle on a preview of the given size.
    pub fn to_preview_rect(&self, preview_size: Size) -> Rect {
        Rect::new(
            self.x * preview_size.width,
            self.y * preview_size.height,
            self.width * preview_size.width,
            self.height * preview_size.height,
        )
    }

    /// Map onto a page box, treating fraction space as a 1x1 preview.
    pub fn to_page_rect(&self, page_box: Rect) -> Result<Rect> {
        let local = to_page_rect(
            Rect::new(self.x, self.y, self.width, self.height),
            Size::new(1.0, 1.0),
            page_box.size(),
        )?;
        Ok(local.translate(page_box.x, page_box.y))
    }

    /// Undo the clockwise display rotation a preview was rendered with,
    /// giving fractions of the unrotated page.
    pub fn unrotate(&self, display_rotation: u16) -> Self {
        let Self {
            x: u,
            y: v,
            width: w,
            height: h,
        } = *self;
        match display_rotation % 360 {
            90 => Self {
                x: v,
                y: 1.0 - u - w,
                width: h,
                height: w,
            },
            180 => Self {
                x: 1.0 - u - w,
                y: 1.0 - v - h,
                width: w,
                height: h,
            },
            270 => Self {
                x: 1.0 - v - h,
                y: u,
                width: h,
                height: w,
            },
            _ => *self,
        }
        .clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_close(actual: Rect, expected: Rect) {
        let tol = 1e-9;
        assert!(
            (actual.x - expected.x).abs() < tol
                && (actual.y - expected.y).abs() < tol
                && (actual.width - expected.width).abs() < tol
                && (actual.height - expected.height).abs() < tol,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_to_page_rect_half_scale() {
        let rect = to_page_rect(
            Rect::new(50.0, 50.0, 100.0, 100.0),
            Size::new(400.0, 800.0),
            Size::new(200.0, 400.0),
        )
        .unwrap();
        assert_eq!(rect.x, 25.0);
        assert_eq!(rect.width, 50.0);
        assert_eq!(rect.height, 50.0);
        assert_eq!(rect.y, 325.0);
    }

    #[test]
    fn test_to_page_rect_non_uniform_scale() {
        let rect = to_page_rect(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Size::new(100.0, 100.0),
            Size::new(612.0, 792.0),
        )
        .unwrap();
        assert_rect_close(rect, Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_top_strip_maps_to_top_of_page() {
        let rect = to_page_rect(
            Rect::new(0.0, 0.0, 100.0, 10.0),
            Size::new(100.0, 100.0),
            Size::new(100.0, 100.0),
        )
        .unwrap();
        assert_eq!(rect.y, 90.0);
    }

    #[test]
    fn test_degenerate_selection_rejected() {
        let err = to_page_rect(
            Rect::new(10.0, 10.0, 0.0, 50.0),
            Size::new(100.0, 100.0),
            Size::new(100.0, 100.0),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidSelection(_)));

        let err = to_page_rect(
            Rect::new(10.0, 10.0, 20.0, -5.0),
            Size::new(100.0, 100.0),
            Size::new(100.0, 100.0),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidSelection(_)));
    }

    #[test]
    fn test_zero_preview_rejected() {
        let result = to_page_rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Size::new(0.0, 100.0),
            Size::new(100.0, 100.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fraction_validation() {
        assert!(CropFraction::new(0.0, 0.0, 1.0, 1.0).is_ok());
        assert!(CropFraction::new(0.5, 0.5, 0.6, 0.1).is_err());
        assert!(CropFraction::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(CropFraction::new(0.1, 0.1, 0.0, 0.5).is_err());
        assert!(CropFraction::new(f64::NAN, 0.1, 0.2, 0.5).is_err());
    }

    #[test]
    fn test_fraction_survives_rerender_at_new_scale() {
        let fraction = fraction_of_preview(
            Rect::new(50.0, 100.0, 200.0, 300.0),
            Size::new(500.0, 1000.0),
        )
        .unwrap();
        let small = fraction.to_preview_rect(Size::new(250.0, 500.0));
        assert_rect_close(small, Rect::new(25.0, 50.0, 100.0, 150.0));
    }

    #[test]
    fn test_fraction_to_page_rect_offsets_box_origin() {
        let fraction = CropFraction::new(0.0, 0.0, 0.5, 0.5).unwrap();
        let rect = fraction
            .to_page_rect(Rect::new(10.0, 20.0, 200.0, 400.0))
            .unwrap();
        assert_rect_close(rect, Rect::new(10.0, 220.0, 100.0, 200.0));
    }

    #[test]
    fn test_unrotate_quarter_turn() {
        // Top-left quarter of a page displayed turned 90° clockwise is the
        // bottom-left quarter of the unrotated page.
        let displayed = CropFraction::new(0.0, 0.0, 0.5, 0.5).unwrap();
        let unrotated = displayed.unrotate(90);
        assert_eq!(unrotated, CropFraction::new(0.0, 0.5, 0.5, 0.5).unwrap());
    }

    #[test]
    fn test_unrotate_half_turn_and_identity() {
        let displayed = CropFraction::new(0.1, 0.2, 0.3, 0.4).unwrap();
        assert_eq!(displayed.unrotate(0), displayed);
        let flipped = displayed.unrotate(180);
        assert!((flipped.x - 0.6).abs() < 1e-9);
        assert!((flipped.y - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_unrotate_four_quarter_turns_swap_extents() {
        let displayed = CropFraction::new(0.1, 0.2, 0.3, 0.4).unwrap();
        for rotation in [90u16, 270] {
            let r = displayed.unrotate(rotation);
            assert!((r.width - 0.4).abs() < 1e-9);
            assert!((r.height - 0.3).abs() < 1e-9);
            assert!(r.validate().is_ok());
        }
    }
}
