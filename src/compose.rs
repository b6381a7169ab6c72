//! Stamping a rendered name onto page 1 of the certificate template.
//!
//! Every certificate starts from its own parse of a private copy of the
//! template bytes. A parsed [`lopdf::Document`] is mutated in place when a
//! page is modified, so sharing one between certificates would leak the
//! previous name into the next file.

use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::Error;
use crate::model::GlyphImage;

/// Page tree depth limit when walking `Parent` links for inherited attributes.
const MAX_TREE_DEPTH: usize = 16;

/// US Letter, used when no MediaBox is present anywhere in the page tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// The immutable source PDF.
#[derive(Clone, Debug)]
pub struct Template {
    bytes: Arc<[u8]>,
}

impl Template {
    /// Accepts the bytes only if they parse as a PDF with at least one page.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let template = Self {
            bytes: bytes.into(),
        };
        let doc = Document::load_mem(&template.bytes)?;
        if doc.get_pages().is_empty() {
            return Err(Error::Composition("template has no pages".into()));
        }
        Ok(template)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parse a private copy of the template bytes into a new document.
    pub fn parse_fresh(&self) -> Result<Document, Error> {
        let copy = self.bytes.to_vec();
        Document::load_mem(&copy)
            .map_err(|e| Error::Composition(format!("failed to load template: {e}")))
    }

    /// Width and height of page 1 in points.
    pub fn first_page_size(&self) -> Result<(f32, f32), Error> {
        let doc = self.parse_fresh()?;
        let page_id = first_page(&doc)?;
        let [llx, lly, urx, ury] = media_box(&doc, page_id);
        Ok((urx - llx, ury - lly))
    }
}

/// Produce one certificate: the glyph is centered horizontally on page 1
/// and vertically centered on `baseline_y`.
pub fn compose(template: &Template, glyph: &GlyphImage, baseline_y: f32) -> Result<Vec<u8>, Error> {
    let mut doc = template.parse_fresh()?;
    let page_id = first_page(&doc)?;

    let [llx, _, urx, _] = media_box(&doc, page_id);
    let page_width = urx - llx;
    let x = (page_width - glyph.width) / 2.0;
    let y = baseline_y - glyph.height / 2.0;
    log::debug!(
        "Placing {}x{} name image at ({x}, {y}) on a {page_width}pt wide page",
        glyph.width,
        glyph.height
    );

    let image_id = embed_png(&mut doc, &glyph.png)?;
    let name = register_xobject(&mut doc, page_id, image_id)?;

    let overlay = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    glyph.width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    glyph.height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name)]),
            Operation::new("Q", vec![]),
        ],
    };
    let overlay = overlay
        .encode()
        .map_err(|e| Error::Composition(format!("failed to encode overlay content: {e}")))?;
    wrap_page_content(&mut doc, page_id, overlay)?;

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Composition(format!("failed to save certificate: {e}")))?;
    Ok(output)
}

fn first_page(doc: &Document) -> Result<ObjectId, Error> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| Error::Composition("template has no pages".into()))
}

fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Look up a page attribute, following `Parent` links for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let dict = node?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        node = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    None
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let array = match inherited(doc, page_id, b"MediaBox") {
        Some(Object::Array(arr)) => Some(arr),
        Some(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_array).ok(),
        _ => None,
    };
    let values: Vec<f32> = array
        .map(|arr| arr.iter().filter_map(|o| o.as_float().ok()).collect())
        .unwrap_or_default();
    match values.as_slice() {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Decode the PNG and add it as an RGB image XObject with an alpha soft mask.
fn embed_png(doc: &mut Document, png: &[u8]) -> Result<ObjectId, Error> {
    let rgba = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| Error::Composition(format!("failed to decode name image: {e}")))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = width as usize * height as usize;
    let mut color = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        color.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8_i64,
        },
        alpha,
    );
    if let Err(e) = mask.compress() {
        log::debug!("Leaving name image mask uncompressed: {e}");
    }
    let mask_id = doc.add_object(mask);

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "SMask" => mask_id,
        },
        color,
    );
    if let Err(e) = image.compress() {
        log::debug!("Leaving name image uncompressed: {e}");
    }
    Ok(doc.add_object(image))
}

/// Add the image to the page's XObject resources under an unused name.
///
/// The effective (possibly inherited or shared) resources are copied onto
/// the page itself so other pages referencing them are left untouched.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<Vec<u8>, Error> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();

    let mut n = 1;
    let name = loop {
        let candidate = format!("CertName{n}").into_bytes();
        if !xobjects.has(&candidate) {
            break candidate;
        }
        n += 1;
    };

    xobjects.set(name.clone(), Object::Reference(image_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    doc.get_dictionary_mut(page_id)
        .map_err(|e| Error::Composition(format!("failed to get page: {e}")))?
        .set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// Isolate the template's own drawing in `q ... Q` and append `overlay` after it.
fn wrap_page_content(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<(), Error> {
    let existing = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Composition(format!("failed to get page: {e}")))?
        .get(b"Contents")
        .ok()
        .cloned();

    let existing: Vec<Object> = match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        _ => Vec::new(),
    };

    // Streams are concatenated when read back, so keep the tokens apart.
    let mut separated = b"\n".to_vec();
    separated.extend(overlay);
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), separated));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)
        .map_err(|e| Error::Composition(format!("failed to get page: {e}")))?
        .set("Contents", Object::Array(contents));
    Ok(())
}
