#![allow(dead_code)]

use std::cell::Cell;
use std::io::Cursor;

use certify_batch::{Error, GlyphImage, TextRasterizer};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};

/// One-page A4 landscape certificate with a heading, written with pdf-writer.
pub fn a4_landscape_template() -> Vec<u8> {
    let mut pdf = Pdf::new();

    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let font_id = Ref::new(5);

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id).kids([page_id]).count(1);

    let mut content = pdf_writer::Content::new();
    content
        .begin_text()
        .set_font(Name(b"F1"), 24.0)
        .next_line(230.0, 420.0)
        .show(Str(b"THIS CERTIFICATE IS AWARDED TO"))
        .end_text();
    pdf.stream(content_id, &content.finish());

    pdf.page(page_id)
        .media_box(Rect::new(0.0, 0.0, 842.0, 595.0))
        .parent(pages_id)
        .contents(content_id)
        .resources()
        .fonts()
        .pair(Name(b"F1"), font_id);

    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    pdf.finish()
}

/// Two A4 portrait pages whose MediaBox and Resources live on the Pages
/// node, written with lopdf.
pub fn inherited_two_page_template() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for heading in ["Page one", "Page two"] {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(18)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(heading)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(2),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Solid PNG of the given pixel size.
pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn glyph(width: f32, height: f32) -> GlyphImage {
    GlyphImage {
        png: solid_png((width * 2.0) as u32, (height * 2.0) as u32, [255, 255, 255]),
        width,
        height,
    }
}

/// Deterministic rasterizer with the real surface geometry (one em per
/// character) that fails on demand.
#[derive(Default)]
pub struct BoxRasterizer {
    /// Names containing this marker fail with an item-scoped error.
    pub fail_marker: Option<&'static str>,
    /// The rasterization attempt (1-based) that reports an unusable surface.
    pub unavailable_at: Option<usize>,
    calls: Cell<usize>,
}

impl BoxRasterizer {
    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_marker: Some(marker),
            ..Self::default()
        }
    }

    pub fn unavailable_at(attempt: usize) -> Self {
        Self {
            unavailable_at: Some(attempt),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl TextRasterizer for BoxRasterizer {
    fn rasterize(&self, text: &str, font_size: f32, color: [u8; 3]) -> Result<GlyphImage, Error> {
        let attempt = self.calls.get() + 1;
        self.calls.set(attempt);
        if self.unavailable_at == Some(attempt) {
            return Err(Error::RenderingUnavailable("no drawing surface".into()));
        }
        if let Some(marker) = self.fail_marker
            && text.contains(marker)
        {
            return Err(Error::Composition(format!("cannot render {text:?}")));
        }
        let measured = text.chars().count() as f32 * font_size * 2.0;
        let width_px = (measured + font_size) as u32;
        let height_px = (font_size * 3.0) as u32;
        Ok(GlyphImage {
            png: solid_png(width_px, height_px, color),
            width: width_px as f32 / 2.0,
            height: height_px as f32 / 2.0,
        })
    }
}

pub fn first_page(doc: &Document) -> ObjectId {
    *doc.get_pages().values().next().unwrap()
}

/// Names of the image XObjects in a page's own Resources dictionary.
pub fn page_image_names(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let page = doc.get_dictionary(page_id).unwrap();
    let Ok(resources) = page.get(b"Resources") else {
        return Vec::new();
    };
    let resources = match resources {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        other => other.as_dict().unwrap(),
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    let xobjects = match xobjects {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        other => other.as_dict().unwrap(),
    };
    xobjects
        .iter()
        .filter(|(_, obj)| {
            let id = obj.as_reference().unwrap();
            let stream = doc.get_object(id).unwrap().as_stream().unwrap();
            stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
        })
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect()
}

/// Operands of every `cm` operator in the page's content, as floats.
pub fn cm_operands(doc: &Document, page_id: ObjectId) -> Vec<Vec<f32>> {
    let bytes = doc.get_page_content(page_id).unwrap();
    let content = Content::decode(&bytes).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "cm")
        .map(|op| op.operands.iter().map(|o| o.as_float().unwrap()).collect())
        .collect()
}
