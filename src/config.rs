use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for the layout suggestion service.
#[derive(Clone, Debug)]
pub struct SuggestionConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl SuggestionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `None` when no API key is configured, which disables the service.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())?;

        let mut config = Self::new(api_key.trim());
        if let Ok(model) = std::env::var("CERTIFY_LAYOUT_MODEL")
            && !model.trim().is_empty()
        {
            config.model = model.trim().to_string();
        }
        if let Ok(endpoint) = std::env::var("CERTIFY_LAYOUT_ENDPOINT")
            && !endpoint.trim().is_empty()
        {
            config.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        let timeout_secs = std::env::var("CERTIFY_LAYOUT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        config.timeout = Duration::from_secs(timeout_secs);
        Some(config)
    }
}
