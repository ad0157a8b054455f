//! Named paper sizes for the resize / orientation tools.

use crate::error::{EditError, Result};
use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard paper sizes, portrait dimensions in points (1 point = 1/72 inch)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperSize {
    pub const ALL: [PaperSize; 6] = [
        PaperSize::A3,
        PaperSize::A4,
        PaperSize::A5,
        PaperSize::Letter,
        PaperSize::Legal,
        PaperSize::Tabloid,
    ];

    pub fn portrait_size(&self) -> Size {
        let (w, h) = match self {
            PaperSize::A3 => (842.0, 1191.0),
            PaperSize::A4 => (595.0, 842.0),
            PaperSize::A5 => (420.0, 595.0),
            PaperSize::Letter => (612.0, 792.0),
            PaperSize::Legal => (612.0, 1008.0),
            PaperSize::Tabloid => (792.0, 1224.0),
        };
        Size::new(w, h)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaperSize::A3 => "A3",
            PaperSize::A4 => "A4",
            PaperSize::A5 => "A5",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
            PaperSize::Tabloid => "Tabloid",
        }
    }
}

impl FromStr for PaperSize {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a3" => Ok(PaperSize::A3),
            "a4" => Ok(PaperSize::A4),
            "a5" => Ok(PaperSize::A5),
            "letter" | "us-letter" => Ok(PaperSize::Letter),
            "legal" | "us-legal" => Ok(PaperSize::Legal),
            "tabloid" | "ledger" | "11x17" => Ok(PaperSize::Tabloid),
            _ => Err(EditError::UnknownPaperSize(s.to_string())),
        }
    }
}

/// Orientation of an output page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    Portrait,
    Landscape,
    /// Follow the source page as it is displayed.
    #[default]
    MatchSource,
}

impl FromStr for Orientation {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "portrait" | "p" => Ok(Orientation::Portrait),
            "landscape" | "l" => Ok(Orientation::Landscape),
            "auto" | "match" | "source" => Ok(Orientation::MatchSource),
            _ => Err(EditError::UnknownPaperSize(format!(
                "unknown orientation '{}'",
                s
            ))),
        }
    }
}

/// Paper size plus orientation: what a page is resized to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub paper: PaperSize,
    #[serde(default)]
    pub orientation: Orientation,
}

impl TargetSize {
    pub fn new(paper: PaperSize, orientation: Orientation) -> Self {
        Self { paper, orientation }
    }

    /// Concrete output size for a source whose displayed extent is `source`.
    pub fn resolve(&self, source: Size) -> Size {
        let portrait = self.paper.portrait_size();
        let landscape = Size::new(portrait.height, portrait.width);
        match self.orientation {
            Orientation::Portrait => portrait,
            Orientation::Landscape => landscape,
            Orientation::MatchSource if source.is_landscape() => landscape,
            Orientation::MatchSource => portrait,
        }
    }
}

/// Accepts "A4", "a4-landscape", "letter:portrait", "Legal auto".
impl FromStr for TargetSize {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s
            .split(|c: char| c == '-' || c == ':' || c.is_whitespace())
            .filter(|p| !p.is_empty());
        let paper_part = parts
            .next()
            .ok_or_else(|| EditError::UnknownPaperSize(s.to_string()))?;

        // "us-letter" splits on '-', so retry with the joined name first.
        let (paper, rest): (PaperSize, Vec<&str>) = match parts.next() {
            Some(second) => match format!("{}-{}", paper_part, second).parse() {
                Ok(paper) => (paper, parts.collect()),
                Err(_) => {
                    let mut rest = vec![second];
                    rest.extend(parts);
                    (paper_part.parse()?, rest)
                }
            },
            None => (paper_part.parse()?, Vec::new()),
        };

        let orientation = match rest.as_slice() {
            [] => Orientation::MatchSource,
            [o] => o.parse()?,
            _ => return Err(EditError::UnknownPaperSize(s.to_string())),
        };

        Ok(Self { paper, orientation })
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.orientation {
            Orientation::Portrait => write!(f, "{}-portrait", self.paper.name()),
            Orientation::Landscape => write!(f, "{}-landscape", self.paper.name()),
            Orientation::MatchSource => write!(f, "{}", self.paper.name()),
        }
    }
}
