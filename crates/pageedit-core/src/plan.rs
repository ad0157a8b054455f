//! Build plans: the finalized, ordered list of output pages

use crate::coords::CropFraction;
use crate::error::{EditError, Result};
use crate::paper::TargetSize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the rebuilder produces one output page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    /// Copy the page, rewrite its rotation
    Copy,
    /// Copy the page, rewrite its crop box
    Crop,
    /// Draw the page onto a fresh page: another paper size, or a turn
    /// that is not a multiple of 90 degrees
    Resize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanEntry {
    pub original_index: usize,
    /// Clockwise rotation added on top of the page's own, 0..360
    pub rotation: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropFraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSize>,
}

impl PlanEntry {
    pub fn untouched(original_index: usize) -> Self {
        Self {
            original_index,
            rotation: 0,
            crop: None,
            target: None,
        }
    }

    pub fn strategy(&self) -> PageStrategy {
        if self.target.is_some() || self.rotation % 90 != 0 {
            return PageStrategy::Resize;
        }
        match self.crop {
            Some(_) => PageStrategy::Crop,
            None => PageStrategy::Copy,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildPlan {
    entries: Vec<PlanEntry>,
}

impl BuildPlan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn original_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.original_index).collect()
    }

    /// True when building would reproduce every page unchanged, in order.
    pub fn is_identity(&self, page_count: usize) -> bool {
        self.entries.len() == page_count
            && self.entries.iter().enumerate().all(|(i, e)| {
                e.original_index == i && e.rotation == 0 && e.crop.is_none() && e.target.is_none()
            })
    }

    /// Re-check what the session already guarantees. A failure here is a
    /// defect in whoever produced the plan, not a user error.
    pub fn validate(&self, page_count: usize) -> Result<()> {
        if self.entries.is_empty() {
            return Err(EditError::BrokenPlan("plan has no pages".into()));
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.original_index >= page_count {
                return Err(EditError::BrokenPlan(format!(
                    "page {} is not in a {}-page source",
                    entry.original_index, page_count
                )));
            }
            if !seen.insert(entry.original_index) {
                return Err(EditError::BrokenPlan(format!(
                    "page {} appears twice",
                    entry.original_index
                )));
            }
            if entry.rotation >= 360 {
                return Err(EditError::BrokenPlan(format!(
                    "page {} has rotation {}",
                    entry.original_index, entry.rotation
                )));
            }
            if let Some(crop) = &entry.crop {
                crop.validate().map_err(|e| {
                    EditError::BrokenPlan(format!("page {}: {}", entry.original_index, e))
                })?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
