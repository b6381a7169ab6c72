use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::compose::{Template, compose};
use crate::error::Error;
use crate::model::{ArchiveEntry, LayoutConfig, Participant};
use crate::raster::TextRasterizer;
use crate::sanitize::certificate_file_name;

/// Font size used when a layout leaves it at zero.
const FALLBACK_FONT_SIZE: f32 = 60.0;

/// The serialized ZIP plus the names of the entries it holds, in participant order.
#[derive(Debug)]
pub struct GeneratedArchive {
    pub bytes: Vec<u8>,
    pub file_names: Vec<String>,
}

/// Generate one certificate per participant, strictly in order, and pack
/// them into a ZIP.
///
/// `on_progress` is called with the 1-based position after every attempt,
/// including participants that were skipped because their certificate
/// failed. Only an environment-wide rendering failure or a failure to
/// write the archive aborts the run.
pub fn generate_batch<R, F>(
    template: &Template,
    participants: &[Participant],
    config: &LayoutConfig,
    rasterizer: &R,
    mut on_progress: F,
) -> Result<GeneratedArchive, Error>
where
    R: TextRasterizer + ?Sized,
    F: FnMut(usize),
{
    if participants.is_empty() {
        return Err(Error::EmptyParticipantList);
    }
    config.validate()?;
    let color = config.rgb()?;
    let font_size = if config.font_size > 0.0 {
        config.font_size
    } else {
        FALLBACK_FONT_SIZE
    };

    log::info!("Generating {} certificates", participants.len());
    let mut entries = Vec::with_capacity(participants.len());
    for (index, participant) in participants.iter().enumerate() {
        let result = rasterizer
            .rasterize(&participant.name, font_size, color)
            .and_then(|glyph| compose(template, &glyph, config.y));
        match result {
            Ok(content) => entries.push(ArchiveEntry {
                file_name: certificate_file_name(index, &participant.name),
                content,
            }),
            Err(e) if e.is_batch_fatal() => {
                return Err(Error::BatchGenerationFailed(Box::new(e)));
            }
            Err(e) => log::warn!(
                "Skipping participant {} ({:?}): {e}",
                index + 1,
                participant.name
            ),
        }
        on_progress(index + 1);
    }

    let skipped = participants.len() - entries.len();
    if skipped > 0 {
        log::warn!("{skipped} of {} certificates were skipped", participants.len());
    }

    let bytes = write_archive(&entries).map_err(|e| Error::BatchGenerationFailed(Box::new(e)))?;
    log::info!(
        "Packed {} certificates into a {} byte archive",
        entries.len(),
        bytes.len()
    );
    Ok(GeneratedArchive {
        bytes,
        file_names: entries.into_iter().map(|e| e.file_name).collect(),
    })
}

fn write_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, Error> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for entry in entries {
        zip.start_file(entry.file_name.as_str(), options)?;
        zip.write_all(&entry.content)?;
    }
    Ok(zip.finish()?.into_inner())
}
