use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ttf_parser::Face;

/// lowercase family name -> (file path, face index within TTC)
type FontLookup = HashMap<String, (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) rather than ID 16 (Typographic Family): decorative
    // faces often ship a single style and only carry the former.
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

/// Family name plus whether the face is the plain (non bold, non italic) style.
fn read_font_style(data: &[u8], face_index: u32) -> Option<(String, bool)> {
    let face = Face::parse(data, face_index).ok()?;
    let family = font_family_name(&face)?;
    Some((family, !face.is_bold() && !face.is_italic()))
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    // User-configured directories come first so they win over system copies.
    if let Ok(val) = std::env::var("CERTIFY_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        for part in val.split(sep) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                dirs.push(PathBuf::from(trimmed));
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend([
            "/usr/share/fonts".into(),
            "/usr/local/share/fonts".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join(".local/share/fonts"));
            dirs.push(PathBuf::from(home).join(".fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft\\Windows\\Fonts"));
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> Option<bool> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ttf" | "otf" | "TTF" | "OTF") => Some(false),
        Some("ttc" | "TTC") => Some(true),
        _ => None,
    }
}

fn scan_font_dirs(dirs: Vec<PathBuf>) -> FontLookup {
    let mut index = FontLookup::new();
    let mut regular: HashMap<String, bool> = HashMap::new();

    // Directories are visited in configuration order; the stack only
    // drives recursion within one of them.
    for root in dirs {
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Some(is_collection) = is_font_file(&path) else {
                    continue;
                };
                let Ok(data) = std::fs::read(&path) else {
                    continue;
                };
                let face_count = if is_collection {
                    ttf_parser::fonts_in_collection(&data).unwrap_or(1)
                } else {
                    1
                };
                for face_idx in 0..face_count {
                    let Some((family, is_regular)) = read_font_style(&data, face_idx) else {
                        continue;
                    };
                    let key = family.to_lowercase();
                    // A regular face replaces a styled one found earlier, never the reverse.
                    let replace = match regular.get(&key) {
                        None => true,
                        Some(&seen_regular) => is_regular && !seen_regular,
                    };
                    if replace {
                        index.insert(key.clone(), (path.clone(), face_idx));
                        regular.insert(key, is_regular);
                    }
                }
            }
        }
    }
    index
}

fn get_font_index() -> &'static FontLookup {
    FONT_INDEX.get_or_init(|| scan_font_dirs(font_directories()))
}

/// Look up a font file by family name (case-insensitive).
pub(crate) fn find_font_file(family: &str) -> Option<(PathBuf, u32)> {
    get_font_index().get(&family.trim().to_lowercase()).cloned()
}

/// Any installed font, for tests that only care about glyph geometry.
#[cfg(test)]
pub(crate) fn any_installed_font() -> Option<(PathBuf, u32)> {
    let index = get_font_index();
    let mut families: Vec<&String> = index.keys().collect();
    families.sort();
    families.first().and_then(|family| index.get(*family)).cloned()
}
