//! Synthetic documents for integration tests

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Show engine logs for a failing test (`cargo test -- --nocapture`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// One page of a synthetic document
#[derive(Debug, Clone)]
pub struct TestPage {
    pub media_box: [i64; 4],
    pub crop_box: Option<[i64; 4]>,
    pub rotate: Option<i64>,
}

impl TestPage {
    pub fn letter() -> Self {
        Self {
            media_box: [0, 0, 612, 792],
            crop_box: None,
            rotate: None,
        }
    }

    pub fn sized(width: i64, height: i64) -> Self {
        Self {
            media_box: [0, 0, width, height],
            ..Self::letter()
        }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    pub fn cropped(mut self, crop_box: [i64; 4]) -> Self {
        self.crop_box = Some(crop_box);
        self
    }
}

fn box_array(values: [i64; 4]) -> Object {
    Object::Array(values.iter().map(|&v| Object::Integer(v)).collect())
}

/// Page text marker, unique per page: `Page-<n>` with n 1-based
pub fn marker(index: usize) -> String {
    format!("Page-{}", index + 1)
}

/// Build a document whose pages carry identifiable text.
///
/// `inherited` attributes are set on the page tree root instead of the
/// pages themselves.
pub fn build_pdf(pages: &[TestPage], inherited: Option<(&[u8], Object)>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", marker(i));
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        if inherited.as_ref().map_or(true, |(key, _)| *key != b"MediaBox") {
            page_dict.set("MediaBox", box_array(page.media_box));
        }
        if let Some(crop_box) = page.crop_box {
            page_dict.set("CropBox", box_array(crop_box));
        }
        if let Some(rotate) = page.rotate {
            page_dict.set("Rotate", Object::Integer(rotate));
        }

        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(pages.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    if let Some((key, value)) = inherited {
        pages_dict.set(key.to_vec(), value);
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Add a `/Link` annotation on page `from` whose `/Dest` is page `to`.
pub fn with_link(bytes: &[u8], from: usize, to: usize) -> Vec<u8> {
    let mut doc = load(bytes);
    let ids = page_ids(&doc);

    let mut link = Dictionary::new();
    link.set("Type", Object::Name(b"Annot".to_vec()));
    link.set("Subtype", Object::Name(b"Link".to_vec()));
    link.set("Rect", box_array([50, 50, 150, 80]));
    link.set("P", Object::Reference(ids[from]));
    link.set(
        "Dest",
        Object::Array(vec![
            Object::Reference(ids[to]),
            Object::Name(b"Fit".to_vec()),
        ]),
    );
    let link_id = doc.add_object(link);
    doc.get_object_mut(ids[from])
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("Annots", Object::Array(vec![Object::Reference(link_id)]));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Target page and owning page of the first link annotation on `page_id`.
pub fn link_target(doc: &Document, page_id: ObjectId) -> (ObjectId, ObjectId) {
    let annots = page_dict(doc, page_id).get(b"Annots").unwrap().as_array().unwrap();
    let link = doc
        .get_object(annots[0].as_reference().unwrap())
        .unwrap()
        .as_dict()
        .unwrap();
    let dest = link.get(b"Dest").unwrap().as_array().unwrap();
    (
        dest[0].as_reference().unwrap(),
        link.get(b"P").unwrap().as_reference().unwrap(),
    )
}

/// `num_pages` Letter pages.
pub fn create_test_pdf(num_pages: usize) -> Vec<u8> {
    build_pdf(&vec![TestPage::letter(); num_pages], None)
}

pub fn load(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).expect("output should parse")
}

/// Pages of a document in order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

pub fn page_dict(doc: &Document, page_id: ObjectId) -> &Dictionary {
    doc.get_object(page_id).unwrap().as_dict().unwrap()
}

/// Decoded content of a page, including content drawn through Form XObjects.
pub fn page_text(doc: &Document, page_id: ObjectId) -> String {
    let mut text = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
    let dict = page_dict(doc, page_id);
    if let Ok(resources) = dict.get(b"Resources").and_then(Object::as_dict) {
        if let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) {
            for (_, value) in xobjects.iter() {
                let id = value.as_reference().unwrap();
                let stream = doc.get_object(id).unwrap().as_stream().unwrap();
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                text.push_str(&String::from_utf8_lossy(&content));
            }
        }
    }
    text
}

/// Which test page (by `marker`) each output page shows.
pub fn page_markers(doc: &Document, source_pages: usize) -> Vec<usize> {
    page_ids(doc)
        .into_iter()
        .map(|id| {
            let text = page_text(doc, id);
            (0..source_pages)
                .find(|&i| text.contains(&format!("({})", marker(i))))
                .expect("every output page shows a source page")
        })
        .collect()
}

/// Read a numeric box array as `[llx, lly, urx, ury]`.
pub fn read_box(dict: &Dictionary, key: &[u8]) -> Option<[f64; 4]> {
    let array = dict.get(key).ok()?.as_array().ok()?;
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(array) {
        *slot = match value {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }
    Some(out)
}

pub fn assert_box_close(actual: [f64; 4], expected: [f64; 4]) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 0.01, "box {:?} != {:?}", actual, expected);
    }
}
