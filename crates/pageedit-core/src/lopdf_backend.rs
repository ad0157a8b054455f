//! Document library implementation on top of lopdf
//!
//! The output starts as a clone of the source ("construction by
//! whitelist"): pages named by the plan are re-added as fresh page
//! objects, the page tree is rebuilt over exactly those pages, and
//! anything no longer referenced is pruned on save.

use crate::backend::{DocumentBackend, PageGeometry};
use crate::config::OutputConfig;
use crate::error::{EditError, Result};
use crate::geometry::{snap_quarter_turn, Placement, Rect, Size};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Rotate", b"Resources"];

/// Guards against cyclic `/Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page carries no usable MediaBox
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

/// A parsed source document with its pages in document order
#[derive(Debug, Clone)]
pub struct LopdfSource {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl LopdfSource {
    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(EditError::PageOutOfRange {
                index,
                page_count: self.page_ids.len(),
            })
    }
}

/// Output under construction
#[derive(Debug)]
pub struct LopdfOutput {
    document: Document,
    pages: Vec<ObjectId>,
    next_form: usize,
}

/// A source page turned into a Form XObject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddedPage {
    id: ObjectId,
    bbox: Rect,
}

impl DocumentBackend for LopdfBackend {
    type Source = LopdfSource;
    type Output = LopdfOutput;
    type PageRef = ObjectId;
    type Drawable = EmbeddedPage;

    fn open(&self, bytes: &[u8]) -> Result<LopdfSource> {
        let document =
            Document::load_mem(bytes).map_err(|e| EditError::SourceCorrupt(e.to_string()))?;
        if document.is_encrypted() {
            return Err(EditError::SourceCorrupt("document is encrypted".into()));
        }
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(EditError::SourceCorrupt("PDF has no pages".into()));
        }
        debug!(pages = page_ids.len(), "opened source document");
        Ok(LopdfSource { document, page_ids })
    }

    fn page_count(&self, source: &LopdfSource) -> usize {
        source.page_ids.len()
    }

    fn page_geometry(&self, source: &LopdfSource, index: usize) -> Result<PageGeometry> {
        let page_id = source.page_id(index)?;
        let doc = &source.document;

        let media_box = match inherited(doc, page_id, b"MediaBox") {
            Some(obj) => parse_box(doc, obj)?,
            None => {
                let [x0, y0, x1, y1] = DEFAULT_MEDIA_BOX;
                Rect::from_corners(x0, y0, x1, y1)
            }
        };
        let crop_box = match inherited(doc, page_id, b"CropBox") {
            Some(obj) => Some(parse_box(doc, obj)?),
            None => None,
        };
        let rotation = inherited(doc, page_id, b"Rotate")
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .map_or(0, snap_quarter_turn);

        Ok(PageGeometry {
            media_box,
            crop_box,
            rotation,
        })
    }

    fn create_output(&self, source: &LopdfSource) -> Result<LopdfOutput> {
        Ok(LopdfOutput {
            document: source.document.clone(),
            pages: Vec::new(),
            next_form: 0,
        })
    }

    fn copy_page(
        &self,
        output: &mut LopdfOutput,
        source: &LopdfSource,
        index: usize,
    ) -> Result<ObjectId> {
        let page_id = source.page_id(index)?;
        if output.pages.contains(&page_id) {
            return Err(EditError::BrokenPlan(format!(
                "page {} is already in the output",
                index
            )));
        }

        // The page keeps its object id so links, outlines and annotation
        // back-references still resolve. It is re-parented under a fresh
        // root, so anything it used to inherit is written onto it.
        let resolved: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|&key| {
                inherited(&source.document, page_id, key).map(|value| (key, value.clone()))
            })
            .collect();
        let page = page_dict_mut(&mut output.document, page_id)?;
        for (key, value) in resolved {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
        page.remove(b"Parent");

        output.pages.push(page_id);
        Ok(page_id)
    }

    fn embed_page(
        &self,
        output: &mut LopdfOutput,
        source: &LopdfSource,
        index: usize,
        clip: Rect,
    ) -> Result<EmbeddedPage> {
        let page_id = source.page_id(index)?;
        let content = source
            .document
            .get_page_content(page_id)
            .map_err(|e| EditError::SourceCorrupt(format!("page {} content: {}", index, e)))?;
        let resources = inherited(&source.document, page_id, b"Resources")
            .cloned()
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => box_object(&clip),
                "Resources" => resources,
            },
            content,
        );
        let id = output.document.add_object(form);
        Ok(EmbeddedPage { id, bbox: clip })
    }

    fn set_rotation(&self, output: &mut LopdfOutput, page: ObjectId, degrees: u16) -> Result<()> {
        page_dict_mut(&mut output.document, page)?.set("Rotate", Object::Integer(degrees as i64));
        Ok(())
    }

    fn set_crop_box(&self, output: &mut LopdfOutput, page: ObjectId, rect: Rect) -> Result<()> {
        page_dict_mut(&mut output.document, page)?.set("CropBox", box_object(&rect));
        Ok(())
    }

    fn create_page(&self, output: &mut LopdfOutput, size: Size) -> Result<ObjectId> {
        let page = dictionary! {
            "Type" => "Page",
            "MediaBox" => box_object(&Rect::new(0.0, 0.0, size.width, size.height)),
            "Resources" => dictionary! {
                "XObject" => Dictionary::new(),
            },
        };
        let id = output.document.add_object(page);
        output.pages.push(id);
        Ok(id)
    }

    fn draw_embedded(
        &self,
        output: &mut LopdfOutput,
        page: ObjectId,
        drawable: EmbeddedPage,
        placement: &Placement,
    ) -> Result<()> {
        output.next_form += 1;
        let name = format!("Pg{}", output.next_form);

        let m = placement.matrix(drawable.bbox);
        let content = format!(
            "q {} {} {} {} {} {} cm /{} Do Q\n",
            fmt_num(m[0]),
            fmt_num(m[1]),
            fmt_num(m[2]),
            fmt_num(m[3]),
            fmt_num(m[4]),
            fmt_num(m[5]),
            name
        );
        let content_id = output
            .document
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let dict = page_dict_mut(&mut output.document, page)?;
        let contents = match dict.get(b"Contents") {
            Ok(Object::Array(existing)) => {
                let mut list = existing.clone();
                list.push(Object::Reference(content_id));
                Object::Array(list)
            }
            Ok(Object::Reference(existing)) => Object::Array(vec![
                Object::Reference(*existing),
                Object::Reference(content_id),
            ]),
            _ => Object::Reference(content_id),
        };
        dict.set("Contents", contents);

        let resources = dict
            .get_mut(b"Resources")
            .and_then(Object::as_dict_mut)
            .map_err(|_| EditError::BrokenPlan("drawing onto a page that was not created".into()))?;
        if !resources.has(b"XObject") {
            resources.set("XObject", Dictionary::new());
        }
        resources
            .get_mut(b"XObject")
            .and_then(Object::as_dict_mut)
            .map_err(|_| EditError::BrokenPlan("page XObject resources are not a dictionary".into()))?
            .set(name, Object::Reference(drawable.id));
        Ok(())
    }

    fn save(&self, output: LopdfOutput, options: &OutputConfig) -> Result<Vec<u8>> {
        let LopdfOutput {
            mut document,
            pages,
            ..
        } = output;

        let pages_id = match root_pages_id(&document) {
            Some(id) => id,
            None => {
                // No usable catalog: start a new one.
                let pages_id = document.new_object_id();
                let catalog_id = document.add_object(dictionary! {
                    "Type" => "Catalog",
                    "Pages" => pages_id,
                });
                document.trailer.set("Root", catalog_id);
                pages_id
            }
        };

        for &page_id in &pages {
            page_dict_mut(&mut document, page_id)?.set("Parent", Object::Reference(pages_id));
        }
        // A fresh root: nothing left for the kept pages to inherit.
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages.len() as i64,
                "Kids" => pages.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            }),
        );

        if options.prune_unused_objects {
            document.prune_objects();
        }
        if options.compress {
            document.compress();
        }

        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| EditError::SerializationFailure(e.to_string()))?;
        debug!(pages = pages.len(), bytes = buffer.len(), "saved output document");
        Ok(buffer)
    }
}

fn root_pages_id(doc: &Document) -> Option<ObjectId> {
    let root_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_object(root_id).ok()?.as_dict().ok()?;
    catalog.get(b"Pages").ok()?.as_reference().ok()
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| EditError::BrokenPlan(format!("output page {:?} is missing", page_id)))
}

/// Look `key` up on the page, then on each ancestor.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box(doc: &Document, obj: &Object) -> Result<Rect> {
    let array = resolve(doc, obj)
        .as_array()
        .map_err(|_| EditError::SourceCorrupt("page box is not an array".into()))?;
    if array.len() != 4 {
        return Err(EditError::SourceCorrupt(
            "page box must have 4 elements".into(),
        ));
    }

    let mut corners = [0.0; 4];
    for (i, item) in array.iter().enumerate() {
        corners[i] = match resolve(doc, item) {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(EditError::SourceCorrupt(format!(
                    "page box element {} is not a number",
                    i
                )))
            }
        };
    }
    let rect = Rect::from_corners(corners[0], corners[1], corners[2], corners[3]);
    if rect.is_degenerate() {
        return Err(EditError::SourceCorrupt("page box has no area".into()));
    }
    Ok(rect)
}

fn box_object(rect: &Rect) -> Object {
    Object::Array(
        rect.to_corners()
            .iter()
            .map(|&v| Object::Real(v as f32))
            .collect(),
    )
}

/// Format a content-stream number without exponent and trailing zeros.
fn fmt_num(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
