use clap::Parser;
use std::path::PathBuf;

use certify_batch::{
    GeminiSuggester, GlyphRasterizer, LayoutConfig, LayoutSuggester, PreviewImage, Session,
    SuggestionConfig, participants,
};

#[derive(Parser)]
#[command(name = "certify-batch", about = "Stamp participant names onto a PDF certificate template")]
struct Args {
    /// Certificate template (PDF, page 1 is used)
    template: PathBuf,
    /// Participant list: spreadsheet (.xlsx, .xls, .ods, .csv), or one name per line
    #[arg(short, long)]
    participants: PathBuf,
    /// Output ZIP (defaults to <template>_certificates.zip)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Font file to use instead of looking up the layout's font family
    #[arg(long)]
    font: Option<PathBuf>,
    /// Image of the template's first page for the layout suggestion service
    /// (rendered with PDFium when omitted)
    #[arg(long)]
    preview: Option<PathBuf>,
    /// Skip the layout suggestion service
    #[arg(long)]
    no_ai: bool,
    /// Layout JSON ({"x", "y", "fontSize", "color", "fontFamily"}); replaces
    /// the suggested layout, missing fields take defaults
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Override the horizontal reference (informational; names are centered)
    #[arg(long)]
    x: Option<f32>,
    /// Override the vertical center of the name, in points from the bottom
    #[arg(long)]
    y: Option<f32>,
    /// Override the font size in points
    #[arg(long)]
    font_size: Option<f32>,
    /// Override the name color (#RRGGBB)
    #[arg(long)]
    color: Option<String>,
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if !args.template.is_file() {
        exit_with(format!("not a file: {}", args.template.display()));
    }
    let output = args.output.clone().unwrap_or_else(|| {
        let stem = args
            .template
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("certificates");
        args.template.with_file_name(format!("{stem}_certificates.zip"))
    });

    let layout_file = args.layout.as_deref().map(|path| {
        std::fs::read_to_string(path)
            .map_err(certify_batch::Error::from)
            .and_then(|json| LayoutConfig::from_json(&json))
            .unwrap_or_else(|e| exit_with(format!("{}: {e}", path.display())))
    });

    let suggester = if args.no_ai || layout_file.is_some() {
        None
    } else {
        SuggestionConfig::from_env().and_then(|config| match GeminiSuggester::new(config) {
            Ok(suggester) => Some(suggester),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        })
    };
    let preview = args.preview.as_deref().and_then(|path| match PreviewImage::from_file(path) {
        Ok(preview) => Some(preview),
        Err(e) => {
            log::warn!("Ignoring preview {}: {e}", path.display());
            None
        }
    });

    let template_bytes = std::fs::read(&args.template).unwrap_or_else(|e| exit_with(e));
    let mut session = Session::new();
    if let Err(e) = session.load_template(
        template_bytes,
        suggester.as_ref().map(|s| s as &dyn LayoutSuggester),
        preview.as_ref(),
    ) {
        exit_with(e);
    }

    let adjusted = session.adjust_layout(|layout| {
        if let Some(from_file) = layout_file {
            *layout = from_file;
        }
        if let Some(x) = args.x {
            layout.x = x;
        }
        if let Some(y) = args.y {
            layout.y = y;
        }
        if let Some(font_size) = args.font_size {
            layout.font_size = font_size;
        }
        if let Some(color) = &args.color {
            layout.color = color.clone();
        }
    });
    if let Err(e) = adjusted {
        exit_with(e);
    }

    let list = participants::from_file(&args.participants).unwrap_or_else(|e| exit_with(e));
    if let Err(e) = session.set_participants(list) {
        exit_with(e);
    }

    let rasterizer = match &args.font {
        Some(path) => GlyphRasterizer::from_file(path, 0),
        None => {
            let family = session
                .layout()
                .map(|layout| layout.font_family.clone())
                .unwrap_or_default();
            GlyphRasterizer::load(&family)
        }
    }
    .unwrap_or_else(|e| exit_with(e));

    let total = session.participants().len();
    let archive = session
        .generate(&rasterizer, |progress| {
            eprintln!("[{:>3.0}%] {}", progress.percent(), progress.status);
        })
        .unwrap_or_else(|e| exit_with(e));

    if let Err(e) = std::fs::write(&output, &archive.bytes) {
        exit_with(e);
    }
    println!(
        "Wrote {} of {total} certificates to {}",
        archive.file_names.len(),
        output.display()
    );
}
