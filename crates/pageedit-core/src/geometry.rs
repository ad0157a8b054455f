//! Basic geometry shared by the mapper, the planner and the rebuilder.
//!
//! Page space is PDF user space: points, origin bottom-left.
//! Preview space is bitmap pixels, origin top-left.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || !self.width.is_finite()
            || !self.height.is_finite()
    }

    /// Swap width and height for quarter-turn rotations.
    pub fn rotated(&self, degrees: u16) -> Self {
        if degrees % 180 == 90 {
            Self::new(self.height, self.width)
        } else {
            *self
        }
    }

    /// Extent of the bounding box after turning clockwise by `degrees`.
    pub fn rotated_bounds(&self, degrees: u16) -> Self {
        let (cos, sin) = cos_sin(degrees);
        Self::new(
            self.width * cos.abs() + self.height * sin.abs(),
            self.width * sin.abs() + self.height * cos.abs(),
        )
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a PDF box array `[llx, lly, urx, ury]`, tolerating swapped corners.
    pub fn from_corners(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        let (x0, x1) = if llx <= urx { (llx, urx) } else { (urx, llx) };
        let (y0, y1) = if lly <= ury { (lly, ury) } else { (ury, lly) };
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.size().is_degenerate() || !self.x.is_finite() || !self.y.is_finite()
    }

    /// `[llx, lly, urx, ury]` as written into a page box.
    pub fn to_corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Normalize any angle to 0..360.
pub fn normalize_rotation(angle: i64) -> u16 {
    angle.rem_euclid(360) as u16
}

/// Snap a page `/Rotate` value to the nearest quarter turn.
pub fn snap_quarter_turn(angle: i64) -> u16 {
    let normalized = normalize_rotation(angle);
    (((normalized as u32 + 45) / 90 % 4) * 90) as u16
}

/// Where an embedded page lands on its target: uniform scale plus offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    /// Clockwise turn applied to the embedded content, 0..360.
    pub rotation: u16,
}

/// Uniformly scale `source` into `target` and center it.
///
/// `scale = min(tw/sw, th/sh)`, `offset = (target - source*scale) / 2`.
pub fn fit_centered(source: Size, target: Size) -> Placement {
    let scale = (target.width / source.width).min(target.height / source.height);
    Placement {
        x: (target.width - source.width * scale) / 2.0,
        y: (target.height - source.height * scale) / 2.0,
        scale,
        rotation: 0,
    }
}

impl Placement {
    /// Fit a `source_box` that is drawn turned clockwise by `rotation` degrees.
    pub fn fit_rotated(source_box: Rect, rotation: u16, target: Size) -> Self {
        let rotation = normalize_rotation(rotation as i64);
        let displayed = source_box.size().rotated_bounds(rotation);
        Placement {
            rotation,
            ..fit_centered(displayed, target)
        }
    }

    /// Content matrix `[a b c d e f]` that maps `source_box` onto the target.
    ///
    /// The box is turned clockwise about its origin, its rotated bounds
    /// are scaled, then moved to the placement offset.
    pub fn matrix(&self, source_box: Rect) -> [f64; 6] {
        let s = self.scale;
        let (cos, sin) = cos_sin(self.rotation);
        let (w, h) = (source_box.width, source_box.height);

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        for (px, py) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
            min_x = min_x.min(cos * px + sin * py);
            min_y = min_y.min(-sin * px + cos * py);
        }

        let (bx, by) = (source_box.x, source_box.y);
        [
            s * cos,
            -s * sin,
            s * sin,
            s * cos,
            self.x - s * (cos * bx + sin * by) - s * min_x,
            self.y - s * (-sin * bx + cos * by) - s * min_y,
        ]
    }
}

/// Cosine and sine of a clockwise angle, exact on quarter turns.
fn cos_sin(degrees: u16) -> (f64, f64) {
    match degrees % 360 {
        0 => (1.0, 0.0),
        90 => (0.0, 1.0),
        180 => (-1.0, 0.0),
        270 => (0.0, -1.0),
        d => {
            let radians = (d as f64).to_radians();
            (radians.cos(), radians.sin())
        }
    }
}

/// Apply a content matrix to a point.
pub fn transform_point(m: &[f64; 6], x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}
