//! Produce the output document from a source and a build plan
//!
//! The output is assembled by whitelist: only the pages the plan names
//! are added, in plan order. Nothing is written back to the caller
//! unless every page succeeds.

use crate::backend::{DocumentBackend, PageGeometry};
use crate::config::OutputConfig;
use crate::error::{EditError, Result};
use crate::geometry::{Placement, Rect};
use crate::lopdf_backend::LopdfBackend;
use crate::plan::{BuildPlan, PageStrategy, PlanEntry};
use tracing::{debug, info, instrument};

/// Parse `source_bytes` and build the plan with the lopdf backend.
pub fn rebuild(source_bytes: &[u8], plan: &BuildPlan, options: &OutputConfig) -> Result<Vec<u8>> {
    let backend = LopdfBackend;
    let source = backend.open(source_bytes)?;
    build(&backend, &source, plan, options)
}

/// Build `plan` against an already parsed source.
#[instrument(skip_all, fields(pages = plan.len()))]
pub fn build<B: DocumentBackend>(
    backend: &B,
    source: &B::Source,
    plan: &BuildPlan,
    options: &OutputConfig,
) -> Result<Vec<u8>> {
    let page_count = backend.page_count(source);
    plan.validate(page_count)?;

    let mut output = backend.create_output(source)?;
    let mut written = 0usize;

    for entry in plan.entries() {
        let geometry = backend.page_geometry(source, entry.original_index)?;
        let strategy = entry.strategy();
        debug!(
            page = entry.original_index,
            rotation = entry.rotation,
            ?strategy,
            "adding page"
        );
        match strategy {
            PageStrategy::Copy => {
                let page = backend.copy_page(&mut output, source, entry.original_index)?;
                backend.set_rotation(&mut output, page, total_rotation(&geometry, entry))?;
            }
            PageStrategy::Crop => {
                let page = backend.copy_page(&mut output, source, entry.original_index)?;
                backend.set_crop_box(&mut output, page, crop_rect(&geometry, entry)?)?;
                backend.set_rotation(&mut output, page, total_rotation(&geometry, entry))?;
            }
            PageStrategy::Resize => {
                let clip = crop_rect(&geometry, entry)?;
                let rotation = total_rotation(&geometry, entry);
                let extent = clip.size().rotated_bounds(rotation);
                let target = entry.target.map_or(extent, |t| t.resolve(extent));
                if target.is_degenerate() {
                    return Err(EditError::BrokenPlan(format!(
                        "page {} resolves to an empty target",
                        entry.original_index
                    )));
                }

                let drawable = backend.embed_page(&mut output, source, entry.original_index, clip)?;
                let page = backend.create_page(&mut output, target)?;
                let placement = Placement::fit_rotated(clip, rotation, target);
                backend.draw_embedded(&mut output, page, drawable, &placement)?;
            }
        }
        written += 1;
    }

    if written != plan.len() {
        return Err(EditError::BrokenPlan(format!(
            "wrote {} pages for a {}-page plan",
            written,
            plan.len()
        )));
    }

    let bytes = backend.save(output, options)?;
    info!(pages = written, bytes = bytes.len(), "document rebuilt");
    Ok(bytes)
}

/// The page's own rotation plus the requested one.
fn total_rotation(geometry: &PageGeometry, entry: &PlanEntry) -> u16 {
    (geometry.rotation + entry.rotation) % 360
}

/// Page-space rectangle the entry keeps: its crop mapped onto the visible
/// box, or the whole visible box.
///
/// Crops are drawn on a preview that already shows the page's own
/// rotation, so that rotation is undone before mapping.
fn crop_rect(geometry: &PageGeometry, entry: &PlanEntry) -> Result<Rect> {
    let visible = geometry.visible_box();
    match &entry.crop {
        Some(crop) => crop.unrotate(geometry.rotation).to_page_rect(visible),
        None => Ok(visible),
    }
}
