//! Rendering the template's first page to a PNG for the layout
//! suggestion service, through the PDFium library.
//!
//! PDFium is bound at runtime. When it cannot be found the preview is
//! simply unavailable and layout resolution falls back to the default.

use std::io::Cursor;
use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};
use pdfium_render::prelude::*;

use crate::error::Error;

/// Width of the rendered preview in pixels.
const PREVIEW_WIDTH: i32 = 1200;

fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "pdfium.dll"
    } else if cfg!(target_os = "macos") {
        "libpdfium.dylib"
    } else {
        "libpdfium.so"
    }
}

/// Candidate library paths, tried before the system library.
///
/// 1. `CERTIFY_PDFIUM` (the library file or the directory holding it)
/// 2. `lib/` in the current working directory
/// 3. next to the executable, and in its `lib/`
fn search_paths(configured: Option<String>) -> Vec<PathBuf> {
    let name = library_file_name();
    let mut paths = Vec::new();

    if let Some(val) = configured {
        let configured = PathBuf::from(val.trim());
        if configured.is_dir() {
            paths.push(configured.join(name));
        } else if !configured.as_os_str().is_empty() {
            paths.push(configured);
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("lib").join(name));
    }
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        paths.push(parent.join(name));
        paths.push(parent.join("lib").join(name));
    }
    paths
}

fn load_pdfium() -> Result<Pdfium, Error> {
    for path in search_paths(std::env::var("CERTIFY_PDFIUM").ok()) {
        if !path.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => log::debug!("Cannot bind PDFium at {}: {e:?}", path.display()),
        }
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| unavailable(format!("PDFium library not found: {e:?}")))
}

fn unavailable(reason: String) -> Error {
    Error::LayoutSuggestionFailed(format!("cannot render template preview: {reason}"))
}

/// Render page 1 of `pdf` as a PNG, [`PREVIEW_WIDTH`] pixels wide.
pub(crate) fn render_first_page(pdf: &[u8]) -> Result<Vec<u8>, Error> {
    let pdfium = load_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| unavailable(format!("{e:?}")))?;
    let page = document
        .pages()
        .first()
        .map_err(|e| unavailable(format!("no first page: {e:?}")))?;

    let config = PdfRenderConfig::new()
        .set_target_width(PREVIEW_WIDTH)
        .set_maximum_height(PREVIEW_WIDTH);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| unavailable(format!("{e:?}")))?;

    let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
    let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
        .ok_or_else(|| unavailable(format!("bitmap does not match {width}x{height}")))?;

    let mut png = Cursor::new(Vec::new());
    rgba.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| unavailable(format!("png encode failed: {e}")))?;
    log::debug!("Rendered a {width}x{height} template preview");
    Ok(png.into_inner())
}
