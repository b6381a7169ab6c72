mod batch;
mod compose;
mod config;
mod error;
mod fonts;
mod layout;
mod model;
pub mod participants;
mod preview;
mod raster;
mod sanitize;
mod session;

pub use batch::{GeneratedArchive, generate_batch};
pub use compose::{Template, compose};
pub use config::SuggestionConfig;
pub use error::Error;
pub use layout::{GeminiSuggester, LayoutSuggester, PreviewImage, SuggestedLayout, resolve};
pub use model::{ArchiveEntry, GenerationProgress, GlyphImage, LayoutConfig, Participant};
pub use raster::{GlyphRasterizer, TextRasterizer};
pub use sanitize::{certificate_file_name, sanitize};
pub use session::{Session, Step};
