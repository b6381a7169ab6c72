use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::compose::Template;
use crate::config::SuggestionConfig;
use crate::error::Error;
use crate::model::{DEFAULT_COLOR, DEFAULT_FONT_FAMILY, LayoutConfig, MAX_FONT_SIZE};

const LAYOUT_PROMPT: &str = r#"You are a design analyst. The attached image is page 1 of a certificate.

GOAL:
1. Find the empty, horizontally centered space between the line "THIS CERTIFICATE IS AWARDED TO" and the course description below it.
2. Express its position in PDF points (A4 landscape: 842 wide x 595 high).
3. The point (0,0) is the BOTTOM-LEFT corner.

STRICT RULES:
- The font MUST be "Great Vibes".
- The text is centered horizontally (x ≈ 421).
- The font color is always WHITE (#FFFFFF).
- The font size should be elegant (between 50 and 70 pt)."#;

/// A rendering of the template's first page.
#[derive(Clone, Debug)]
pub struct PreviewImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl PreviewImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let mime = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => "image/png",
            Ok(image::ImageFormat::Jpeg) => "image/jpeg",
            Ok(other) => {
                return Err(Error::LayoutSuggestionFailed(format!(
                    "unsupported preview format {other:?}"
                )));
            }
            Err(e) => {
                return Err(Error::LayoutSuggestionFailed(format!(
                    "unrecognized preview image: {e}"
                )));
            }
        };
        Ok(Self { bytes, mime })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Render the template's first page. Fails with
    /// [`Error::LayoutSuggestionFailed`] when PDFium is unavailable.
    pub fn from_template(template: &Template) -> Result<Self, Error> {
        Ok(Self {
            bytes: crate::preview::render_first_page(template.bytes())?,
            mime: "image/png",
        })
    }
}

/// Raw suggestion as returned by a service. Every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedLayout {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub font_size: Option<f32>,
    pub color: Option<String>,
    pub font_family: Option<String>,
}

pub trait LayoutSuggester {
    fn suggest(&self, preview: &PreviewImage) -> Result<SuggestedLayout, Error>;
}

/// Resolve the layout for a session. Never fails: any problem with the
/// suggestion service falls back to [`LayoutConfig::default`].
pub fn resolve(suggester: Option<&dyn LayoutSuggester>, preview: Option<&PreviewImage>) -> LayoutConfig {
    let (Some(suggester), Some(preview)) = (suggester, preview) else {
        log::info!("No layout suggestion available, using the default layout");
        return LayoutConfig::default();
    };
    match suggester.suggest(preview) {
        Ok(suggestion) => {
            let layout = from_suggestion(suggestion);
            log::info!(
                "Suggested layout: y={} font_size={}",
                layout.y,
                layout.font_size
            );
            layout
        }
        Err(e) => {
            log::warn!("{e}; using the default layout");
            LayoutConfig::default()
        }
    }
}

/// Only geometry is taken from a suggestion; color and typeface are fixed.
fn from_suggestion(suggestion: SuggestedLayout) -> LayoutConfig {
    let defaults = LayoutConfig::default();
    let usable = |v: Option<f32>| v.filter(|v| v.is_finite() && *v != 0.0);
    LayoutConfig {
        x: usable(suggestion.x).unwrap_or(defaults.x),
        y: usable(suggestion.y).unwrap_or(defaults.y),
        font_size: usable(suggestion.font_size)
            .filter(|size| *size > 0.0 && *size <= MAX_FONT_SIZE)
            .unwrap_or(defaults.font_size),
        color: DEFAULT_COLOR.to_string(),
        font_family: DEFAULT_FONT_FAMILY.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini `generateContent` client with a JSON response schema.
pub struct GeminiSuggester {
    client: Client,
    config: SuggestionConfig,
}

impl GeminiSuggester {
    pub fn new(config: SuggestionConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::LayoutSuggestionFailed(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn request_body(preview: &PreviewImage) -> GenerateRequest {
        GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text(LAYOUT_PROMPT.to_string()),
                    RequestPart::InlineData(InlineData {
                        mime_type: preview.mime.to_string(),
                        data: STANDARD.encode(&preview.bytes),
                    }),
                ],
            }],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "x": { "type": "NUMBER", "description": "X coordinate (centered ≈ 421)" },
                        "y": { "type": "NUMBER", "description": "Y coordinate of the name's center line (0-595)" },
                        "fontSize": { "type": "NUMBER", "description": "Font size in points" },
                        "color": { "type": "STRING", "description": "Hex color (always #FFFFFF)" },
                        "fontFamily": { "type": "STRING", "description": "Always 'Great Vibes'" }
                    },
                    "required": ["x", "y", "fontSize", "color", "fontFamily"]
                }
            }),
        }
    }
}

/// Extract the suggestion from a `generateContent` response body.
fn parse_response(body: &str) -> Result<SuggestedLayout, Error> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::LayoutSuggestionFailed(format!("malformed response: {e}")))?;
    let text = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text.filter(|t| !t.trim().is_empty()))
        .ok_or_else(|| Error::LayoutSuggestionFailed("empty response".into()))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::LayoutSuggestionFailed(format!("malformed suggestion: {e}")))
}

impl LayoutSuggester for GeminiSuggester {
    fn suggest(&self, preview: &PreviewImage) -> Result<SuggestedLayout, Error> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );
        log::info!("Requesting layout suggestion from {}", self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&Self::request_body(preview))
            .send()
            .map_err(|e| Error::LayoutSuggestionFailed(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::LayoutSuggestionFailed(format!("response read failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::LayoutSuggestionFailed(format!("HTTP {status}: {body}")));
        }
        parse_response(&body)
    }
}
