use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_FONT_FAMILY: &str = "Great Vibes";
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Largest accepted font size in points. A name at this size still fits a
/// drawing surface a few thousand pixels tall.
pub const MAX_FONT_SIZE: f32 = 500.0;

/// One certificate recipient. Identity is the position in the input list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Placement and style of the name overlay on page 1, in PDF points
/// (origin bottom-left).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Informational only: names are always centered horizontally.
    pub x: f32,
    /// Vertical center of the name.
    pub y: f32,
    pub font_size: f32,
    pub color: String,
    pub font_family: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x: 421.0,
            y: 285.0,
            font_size: 65.0,
            color: DEFAULT_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

impl LayoutConfig {
    /// Fill color as RGB. An empty color means white.
    pub fn rgb(&self) -> Result<[u8; 3], Error> {
        let color = self.color.trim();
        if color.is_empty() {
            return Ok([0xFF, 0xFF, 0xFF]);
        }
        parse_hex_color(color)
            .ok_or_else(|| Error::InvalidLayout(format!("color {color:?} is not #RRGGBB")))
    }

    /// Parse a layout from JSON (`{"y": 300, "fontSize": 58, ...}`).
    /// Missing fields take the default layout's values.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let layout: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidLayout(format!("malformed layout JSON: {e}")))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.font_size.is_finite() || self.font_size < 0.0 || self.font_size > MAX_FONT_SIZE {
            return Err(Error::InvalidLayout(format!(
                "font size must be between 0 and {MAX_FONT_SIZE}, got {}",
                self.font_size
            )));
        }
        if !self.y.is_finite() {
            return Err(Error::InvalidLayout("y must be a finite number".into()));
        }
        self.rgb().map(|_| ())
    }
}

pub(crate) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    let hex = val.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// A rendered name. `width`/`height` are logical (page point) dimensions,
/// half of the PNG's pixel dimensions.
#[derive(Clone, Debug)]
pub struct GlyphImage {
    pub png: Vec<u8>,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationProgress {
    pub total: usize,
    pub current: usize,
    pub status: String,
}

impl GenerationProgress {
    pub fn start(total: usize) -> Self {
        Self {
            total,
            current: 0,
            status: String::new(),
        }
    }

    pub fn advance(&mut self, current: usize) {
        self.current = current;
        self.status = format!("Generating certificate {current} of {}...", self.total);
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f32 / self.total as f32 * 100.0
    }
}

#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#FFFFFF"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("#1a2B3c"), Some([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_hex_color("FFFFFF"), None);
        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
    }

    #[test]
    fn layout_validation() {
        assert!(LayoutConfig::default().validate().is_ok());

        let mut config = LayoutConfig::default();
        config.color = String::new();
        assert_eq!(config.rgb().unwrap(), [255, 255, 255]);

        config.font_size = -1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidLayout(_))));

        config.font_size = 100_000.0;
        assert!(matches!(config.validate(), Err(Error::InvalidLayout(_))));

        config.font_size = MAX_FONT_SIZE;
        assert!(config.validate().is_ok());
        config.font_size = 0.3;
        assert!(config.validate().is_ok());

        let config = LayoutConfig {
            color: "white".into(),
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn layout_from_json() {
        let layout = LayoutConfig::from_json(r#"{"y": 310, "fontSize": 58}"#).unwrap();
        assert_eq!(layout.y, 310.0);
        assert_eq!(layout.font_size, 58.0);
        assert_eq!(layout.x, 421.0);
        assert_eq!(layout.font_family, DEFAULT_FONT_FAMILY);

        let err = LayoutConfig::from_json(r#"{"fontSize": 9000}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidLayout(_)));
        assert!(LayoutConfig::from_json("{").is_err());
    }

    #[test]
    fn progress_status() {
        let mut progress = GenerationProgress::start(4);
        progress.advance(1);
        assert_eq!(progress.status, "Generating certificate 1 of 4...");
        assert_eq!(progress.percent(), 25.0);
        assert_eq!(GenerationProgress::default().percent(), 0.0);
    }
}
