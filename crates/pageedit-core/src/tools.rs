//! Page tools and output naming
//!
//! Each tool is a thin front over the shared session: it only decides
//! which kinds of edits it records and how the result file is named.

use crate::error::{EditError, Result};
use crate::operations::{EditOp, OpKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// Characters invalid in a file name on some platform, plus control characters
    static ref INVALID_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap();

    /// Reserved Windows device names
    static ref RESERVED_NAMES: Regex =
        Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").unwrap();

    /// Trailing ".pdf", any case
    static ref PDF_EXTENSION: Regex = Regex::new(r"(?i)\.pdf$").unwrap();
}

const MAX_STEM_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Crop,
    Rotate,
    Rearrange,
    Remove,
    Extract,
    Resize,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Crop,
        Tool::Rotate,
        Tool::Rearrange,
        Tool::Remove,
        Tool::Extract,
        Tool::Resize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Crop => "crop",
            Tool::Rotate => "rotate",
            Tool::Rearrange => "rearrange",
            Tool::Remove => "remove",
            Tool::Extract => "extract",
            Tool::Resize => "resize",
        }
    }

    /// Appended to the source name of files this tool produces.
    pub fn suffix(&self) -> &'static str {
        match self {
            Tool::Crop => "cropped",
            Tool::Rotate => "rotated",
            Tool::Rearrange => "rearranged",
            Tool::Remove => "removed",
            Tool::Extract => "extracted",
            Tool::Resize => "resized",
        }
    }

    pub fn kinds(&self) -> &'static [OpKind] {
        match self {
            Tool::Crop => &[OpKind::Crop],
            Tool::Rotate => &[OpKind::Rotate],
            Tool::Rearrange => &[OpKind::Reorder, OpKind::Exclude],
            Tool::Remove => &[OpKind::Exclude],
            Tool::Extract => &[OpKind::Reorder, OpKind::Exclude],
            Tool::Resize => &[OpKind::Resize],
        }
    }

    pub fn allows(&self, kind: OpKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub fn permits(&self, op: &EditOp) -> bool {
        self.allows(op.kind())
    }

    /// Error for an edit this tool does not record.
    pub fn check(&self, kind: OpKind) -> Result<()> {
        if self.allows(kind) {
            Ok(())
        } else {
            Err(EditError::InvalidState(format!(
                "the {} tool does not record {:?} edits",
                self.name(),
                kind
            )))
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name() == wanted)
            .ok_or_else(|| EditError::InvalidState(format!("unknown tool: {}", s)))
    }
}

/// Make a file stem safe on Windows, macOS and Linux.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = INVALID_CHARS.replace_all(name, "_");
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED_NAMES.is_match(sanitized) {
        return format!("_{}", sanitized);
    }

    let sanitized: String = sanitized.chars().take(MAX_STEM_LEN).collect();
    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

/// `report.pdf` + `cropped` gives `report-cropped.pdf`.
pub fn suggested_filename(original: &str, suffix: &str) -> String {
    // Uploads may carry a path from the host.
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = PDF_EXTENSION.replace(base.trim(), "");
    format!("{}-{}.pdf", sanitize_filename(&stem), sanitize_filename(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CropFraction;

    #[test]
    fn test_suffixes() {
        let suffixes: Vec<&str> = Tool::ALL.iter().map(Tool::suffix).collect();
        assert_eq!(
            suffixes,
            vec!["cropped", "rotated", "rearranged", "removed", "extracted", "resized"]
        );
    }

    #[test]
    fn test_tool_permits_only_its_edits() {
        let crop = EditOp::Crop {
            page: 0,
            rect: CropFraction::full(),
        };
        let rotate = EditOp::RotateBy {
            page: 0,
            degrees: 90,
        };
        let exclude = EditOp::Exclude {
            page: 0,
            excluded: true,
        };

        assert!(Tool::Crop.permits(&crop));
        assert!(!Tool::Crop.permits(&rotate));
        assert!(Tool::Rotate.permits(&rotate));
        assert!(Tool::Remove.permits(&exclude));
        assert!(!Tool::Remove.allows(OpKind::Reorder));
        assert!(Tool::Rearrange.allows(OpKind::Reorder));
        assert!(matches!(
            Tool::Resize.check(OpKind::Crop),
            Err(EditError::InvalidState(_))
        ));
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("Crop".parse::<Tool>().unwrap(), Tool::Crop);
        assert_eq!(" extract ".parse::<Tool>().unwrap(), Tool::Extract);
        assert!("merge".parse::<Tool>().is_err());
        for tool in Tool::ALL {
            assert_eq!(tool.to_string().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(suggested_filename("report.pdf", "cropped"), "report-cropped.pdf");
        assert_eq!(suggested_filename("Report.PDF", "rotated"), "Report-rotated.pdf");
        assert_eq!(suggested_filename("notes", "edited"), "notes-edited.pdf");
        assert_eq!(
            suggested_filename("C:\\Users\\me\\scan.pdf", "resized"),
            "scan-resized.pdf"
        );
    }

    #[test]
    fn test_suggested_filename_sanitizes() {
        assert_eq!(suggested_filename("a:b?.pdf", "removed"), "a_b_-removed.pdf");
        assert_eq!(suggested_filename(".pdf", "extracted"), "document-extracted.pdf");
        assert_eq!(suggested_filename("CON.pdf", "edited"), "_CON-edited.pdf");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Book/Chapter"), "Book_Chapter");
        assert_eq!(sanitize_filename("  ..  "), "document");
        assert_eq!(sanitize_filename("Book\x00Test"), "Book_Test");
        assert_eq!(sanitize_filename("日本語"), "日本語");
        assert_eq!(sanitize_filename(&"a".repeat(250)).len(), 200);
    }
}
