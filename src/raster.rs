use std::path::Path;

use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use rustybuzz::{Face, UnicodeBuffer};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::error::Error;
use crate::fonts;
use crate::model::GlyphImage;

/// Names are drawn at this multiple of the requested size and embedded at
/// the requested size, so they stay sharp when the PDF is zoomed.
const OVERSAMPLE: f32 = 2.0;

/// Longest side of a drawing surface in pixels.
const MAX_SURFACE_SIDE: u32 = 16_384;

/// Renders a name into a PNG. Implementations must report logical
/// (page point) dimensions in the returned [`GlyphImage`].
pub trait TextRasterizer {
    fn rasterize(&self, text: &str, font_size: f32, color: [u8; 3]) -> Result<GlyphImage, Error>;
}

/// Font-backed rasterizer: shapes with rustybuzz and fills outlines with tiny-skia.
pub struct GlyphRasterizer {
    font_data: Vec<u8>,
    face_index: u32,
}

struct Placement {
    glyph_id: u16,
    x: f32,
    y: f32,
}

impl GlyphRasterizer {
    /// Load an installed font by family name.
    pub fn load(family: &str) -> Result<Self, Error> {
        let (path, face_index) = fonts::find_font_file(family).ok_or_else(|| {
            Error::RenderingUnavailable(format!(
                "font family \"{family}\" is not installed (add its directory to CERTIFY_FONTS)"
            ))
        })?;
        log::debug!("Using {} for \"{family}\"", path.display());
        Self::from_file(&path, face_index)
    }

    pub fn from_file(path: &Path, face_index: u32) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|e| {
            Error::RenderingUnavailable(format!("cannot read font {}: {e}", path.display()))
        })?;
        Self::from_font_data(data, face_index)
    }

    pub fn from_font_data(font_data: Vec<u8>, face_index: u32) -> Result<Self, Error> {
        let rasterizer = Self {
            font_data,
            face_index,
        };
        rasterizer.face()?;
        Ok(rasterizer)
    }

    fn face(&self) -> Result<Face<'_>, Error> {
        Face::from_slice(&self.font_data, self.face_index)
            .ok_or_else(|| Error::RenderingUnavailable("font data could not be parsed".into()))
    }
}

/// Shape `text` and return glyph placements relative to the pen origin plus the total advance.
fn layout_glyphs(face: &Face, text: &str, scale: f32) -> (Vec<Placement>, f32) {
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();
    let output = rustybuzz::shape(face, &[], buffer);

    let mut placements = Vec::with_capacity(output.len());
    let mut pen_x = 0.0f32;
    for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
        if info.glyph_id != 0 {
            placements.push(Placement {
                glyph_id: info.glyph_id as u16,
                x: pen_x + pos.x_offset as f32 * scale,
                y: pos.y_offset as f32 * scale,
            });
        }
        pen_x += pos.x_advance as f32 * scale;
    }
    (placements, pen_x)
}

impl TextRasterizer for GlyphRasterizer {
    fn rasterize(&self, text: &str, font_size: f32, color: [u8; 3]) -> Result<GlyphImage, Error> {
        let face = self.face()?;
        let draw_size = font_size * OVERSAMPLE;
        let scale = draw_size / face.units_per_em().max(1) as f32;

        let (placements, measured_width) = layout_glyphs(&face, text, scale);

        let (width_px, height_px) = surface_size(measured_width, font_size)?;
        let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
            Error::RenderingUnavailable(format!(
                "cannot allocate a {width_px}x{height_px} drawing surface"
            ))
        })?;

        // Center alignment with a "middle" baseline: the em box is centered
        // on the surface's vertical midpoint.
        let origin_x = (width_px as f32 - measured_width) / 2.0;
        let em_middle = (face.ascender() as f32 + face.descender() as f32) / 2.0 * scale;
        let baseline_y = height_px as f32 / 2.0 + em_middle;

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], 255);
        paint.anti_alias = true;

        for placement in &placements {
            let mut builder =
                GlyphPathBuilder::new(origin_x + placement.x, baseline_y - placement.y, scale);
            if face
                .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
                .is_none()
            {
                continue;
            }
            let Some(path) = builder.finish() else {
                continue;
            };
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        let png = pixmap
            .encode_png()
            .map_err(|e| Error::Composition(format!("png encode failed: {e}")))?;

        Ok(GlyphImage {
            png,
            width: width_px as f32 / OVERSAMPLE,
            height: height_px as f32 / OVERSAMPLE,
        })
    }
}

/// Pixel size of the surface for a name measured at `measured_width`:
/// half an em of padding on each side and three ems of height, never
/// smaller than one pixel. Oversized surfaces fail only this name.
fn surface_size(measured_width: f32, font_size: f32) -> Result<(u32, u32), Error> {
    let padding = font_size * 0.5;
    let width = (measured_width + padding * 2.0).max(1.0);
    let height = (font_size * 3.0).max(1.0);
    let limit = MAX_SURFACE_SIDE as f32;
    if !(width <= limit && height <= limit) {
        return Err(Error::Composition(format!(
            "a {width:.0}x{height:.0} px name surface exceeds {MAX_SURFACE_SIDE} px"
        )));
    }
    Ok((width as u32, height as u32))
}

/// Converts font-unit outlines (y up) into surface pixels (y down).
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.builder.move_to(px, py);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.builder.line_to(px, py);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.point(x1, y1);
        let (px, py) = self.point(x, y);
        self.builder.quad_to(c1x, c1y, px, py);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.point(x1, y1);
        let (c2x, c2y) = self.point(x2, y2);
        let (px, py) = self.point(x, y);
        self.builder.cubic_to(c1x, c1y, c2x, c2y, px, py);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
