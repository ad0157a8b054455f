//! Edit session: pending page edits for one loaded document
//!
//! The session never renumbers pages. It keeps a full arrangement of the
//! original indices plus an exclusion set; the output order is the
//! arrangement with excluded pages filtered out. Every mutation validates
//! first and only then writes, so a rejected call leaves the session
//! exactly as it was.

use crate::coords::CropFraction;
use crate::error::{EditError, Result};
use crate::geometry::normalize_rotation;
use crate::operations::{EditOp, PageEdits};
use crate::paper::TargetSize;
use crate::plan::{BuildPlan, PlanEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditSession {
    page_count: usize,
    /// Every original index exactly once, in display order
    arrangement: Vec<usize>,
    excluded: BTreeSet<usize>,
    edits: BTreeMap<usize, PageEdits>,
}

impl EditSession {
    /// Start an empty session over `page_count` pages.
    pub fn new(page_count: usize) -> Result<Self> {
        if page_count == 0 {
            return Err(EditError::CannotEmptyDocument);
        }
        Ok(Self {
            page_count,
            arrangement: (0..page_count).collect(),
            excluded: BTreeSet::new(),
            edits: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Current output order: original indices, excluded pages left out.
    pub fn order(&self) -> Vec<usize> {
        self.arrangement
            .iter()
            .copied()
            .filter(|i| !self.excluded.contains(i))
            .collect()
    }

    pub fn included_count(&self) -> usize {
        self.page_count - self.excluded.len()
    }

    pub fn is_excluded(&self, index: usize) -> bool {
        self.excluded.contains(&index)
    }

    pub fn rotation(&self, index: usize) -> u16 {
        self.edits.get(&index).map_or(0, |e| e.rotation)
    }

    pub fn crop(&self, index: usize) -> Option<CropFraction> {
        self.edits.get(&index).and_then(|e| e.crop)
    }

    pub fn target_size(&self, index: usize) -> Option<TargetSize> {
        self.edits.get(&index).and_then(|e| e.target)
    }

    /// No edits recorded and pages in their original order.
    pub fn is_pristine(&self) -> bool {
        self.excluded.is_empty()
            && self.edits.is_empty()
            && self.arrangement.iter().enumerate().all(|(pos, &i)| pos == i)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.page_count {
            return Err(EditError::PageOutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    fn edits_mut(&mut self, index: usize) -> &mut PageEdits {
        self.edits.entry(index).or_default()
    }

    fn prune(&mut self, index: usize) {
        if self.edits.get(&index).is_some_and(PageEdits::is_empty) {
            self.edits.remove(&index);
        }
    }

    /// Record a crop, replacing any earlier crop on the page.
    pub fn record_crop(&mut self, index: usize, rect: CropFraction) -> Result<()> {
        self.check_index(index)?;
        rect.validate()?;
        debug!(page = index, ?rect, "record crop");
        self.edits_mut(index).crop = Some(rect);
        Ok(())
    }

    pub fn clear_crop(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if let Some(edits) = self.edits.get_mut(&index) {
            edits.crop = None;
        }
        self.prune(index);
        Ok(())
    }

    /// Add a clockwise rotation; returns the page's new rotation.
    pub fn record_rotation(&mut self, index: usize, delta_degrees: i64) -> Result<u16> {
        self.check_index(index)?;
        let current = self.rotation(index) as i64;
        let rotation = normalize_rotation(current + delta_degrees.rem_euclid(360));
        debug!(page = index, delta_degrees, rotation, "record rotation");
        self.edits_mut(index).rotation = rotation;
        self.prune(index);
        Ok(rotation)
    }

    /// Rotate every included page by the same delta.
    pub fn rotate_all(&mut self, delta_degrees: i64) {
        for index in self.order() {
            let current = self.rotation(index) as i64;
            self.edits_mut(index).rotation =
                normalize_rotation(current + delta_degrees.rem_euclid(360));
            self.prune(index);
        }
        debug!(delta_degrees, pages = self.included_count(), "rotate all");
    }

    /// Record a resize target, replacing any earlier one.
    pub fn record_resize(&mut self, index: usize, target: TargetSize) -> Result<()> {
        self.check_index(index)?;
        debug!(page = index, %target, "record resize");
        self.edits_mut(index).target = Some(target);
        Ok(())
    }

    pub fn clear_resize(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if let Some(edits) = self.edits.get_mut(&index) {
            edits.target = None;
        }
        self.prune(index);
        Ok(())
    }

    /// Replace the output order.
    ///
    /// `new_order` must hold distinct known indices. Pages it omits become
    /// excluded and are kept, in their previous relative order, after the
    /// listed ones so they have a place to return to.
    pub fn set_order(&mut self, new_order: &[usize]) -> Result<()> {
        if new_order.is_empty() {
            return Err(EditError::CannotEmptyDocument);
        }
        let mut seen = HashSet::with_capacity(new_order.len());
        for &index in new_order {
            if index >= self.page_count {
                return Err(EditError::InvalidPermutation(format!(
                    "page {} is not in a {}-page document",
                    index, self.page_count
                )));
            }
            if !seen.insert(index) {
                return Err(EditError::InvalidPermutation(format!(
                    "page {} listed twice",
                    index
                )));
            }
        }

        let mut arrangement = new_order.to_vec();
        arrangement.extend(self.arrangement.iter().filter(|i| !seen.contains(*i)));
        self.excluded = (0..self.page_count).filter(|i| !seen.contains(i)).collect();
        self.arrangement = arrangement;
        debug!(order = ?new_order, excluded = self.excluded.len(), "set order");
        Ok(())
    }

    /// Flip whether a page is left out; returns the new excluded state.
    pub fn toggle_exclude(&mut self, index: usize) -> Result<bool> {
        let exclude = !self.is_excluded(index);
        self.set_excluded(index, exclude)?;
        Ok(exclude)
    }

    pub fn set_excluded(&mut self, index: usize, excluded: bool) -> Result<()> {
        self.check_index(index)?;
        if excluded {
            if !self.is_excluded(index) && self.included_count() == 1 {
                return Err(EditError::CannotEmptyDocument);
            }
            self.excluded.insert(index);
        } else {
            self.excluded.remove(&index);
        }
        debug!(page = index, excluded, "set excluded");
        Ok(())
    }

    /// Exclude several pages at once; all or nothing.
    pub fn remove(&mut self, indices: &[usize]) -> Result<()> {
        for &index in indices {
            self.check_index(index)?;
        }
        let removing: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|i| !self.excluded.contains(i))
            .collect();
        if removing.len() >= self.included_count() {
            return Err(EditError::CannotEmptyDocument);
        }
        self.excluded.extend(removing);
        Ok(())
    }

    /// Keep exactly `indices`, in ascending original order.
    pub fn extract(&mut self, indices: &[usize]) -> Result<()> {
        let mut keep: Vec<usize> = indices.to_vec();
        keep.sort_unstable();
        keep.dedup();
        self.set_order(&keep)
    }

    /// Dispatch a serialized operation.
    pub fn apply(&mut self, op: &EditOp) -> Result<()> {
        match op {
            EditOp::Crop { page, rect } => self.record_crop(*page, *rect),
            EditOp::ClearCrop { page } => self.clear_crop(*page),
            EditOp::RotateBy { page, degrees } => self.record_rotation(*page, *degrees).map(|_| ()),
            EditOp::Exclude { page, excluded } => self.set_excluded(*page, *excluded),
            EditOp::ResizeTo { page, target } => self.record_resize(*page, *target),
            EditOp::ClearResize { page } => self.clear_resize(*page),
        }
    }

    /// Back to all pages, original order, no edits.
    pub fn reset(&mut self) {
        self.arrangement = (0..self.page_count).collect();
        self.excluded.clear();
        self.edits.clear();
    }

    /// Produce the build plan for the current state. Does not mutate.
    pub fn finalize(&self) -> BuildPlan {
        let entries = self
            .order()
            .into_iter()
            .map(|index| match self.edits.get(&index) {
                Some(edits) => PlanEntry {
                    original_index: index,
                    rotation: edits.rotation,
                    crop: edits.crop,
                    target: edits.target,
                },
                None => PlanEntry::untouched(index),
            })
            .collect::<Vec<_>>();
        debug!(pages = entries.len(), "finalize plan");
        BuildPlan::new(entries)
    }

    fn check_invariants(&self) -> Result<()> {
        if self.page_count == 0 {
            return Err(EditError::CannotEmptyDocument);
        }
        let mut sorted = self.arrangement.clone();
        sorted.sort_unstable();
        if sorted != (0..self.page_count).collect::<Vec<_>>() {
            return Err(EditError::InvalidPermutation(
                "arrangement is not a permutation of the document's pages".into(),
            ));
        }
        if let Some(&index) = self
            .excluded
            .iter()
            .chain(self.edits.keys())
            .find(|&&i| i >= self.page_count)
        {
            return Err(EditError::PageOutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        if self.excluded.len() >= self.page_count {
            return Err(EditError::CannotEmptyDocument);
        }
        for edits in self.edits.values() {
            if edits.rotation >= 360 {
                return Err(EditError::InvalidSelection(format!(
                    "rotation {} is not normalized",
                    edits.rotation
                )));
            }
            if let Some(crop) = &edits.crop {
                crop.validate()?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a snapshot, re-checking every session invariant.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)
            .map_err(|e| EditError::InvalidState(format!("bad session snapshot: {}", e)))?;
        session
            .check_invariants()
            .map_err(|e| EditError::InvalidState(format!("bad session snapshot: {}", e)))?;
        Ok(session)
    }
}
