use std::fmt;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Zero-width space/non-joiner/joiner and the byte order mark.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')
}

/// Normalize a raw cell value into a display name. `None` becomes an empty string.
pub fn sanitize<T: fmt::Display>(raw: Option<T>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let cleaned: String = raw.to_string().chars().filter(|&c| !is_invisible(c)).collect();
    cleaned.trim().to_string()
}

/// Archive entry name for the `index`-th (0-based) participant:
/// `NNN_Base.pdf` where the base keeps only ASCII alphanumerics.
pub fn certificate_file_name(index: usize, name: &str) -> String {
    format!("{:03}_{}.pdf", index + 1, file_name_base(name))
}

pub(crate) fn file_name_base(name: &str) -> String {
    name.nfd()
        .filter(|&c| !is_combining_mark(c))
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
