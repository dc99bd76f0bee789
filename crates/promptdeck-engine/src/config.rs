use std::env;
use std::fmt;

use tracing::{debug, warn};

use crate::error::ActionError;

/// Checked in order; the first non-empty value wins.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";
pub const TEXT_MODEL_VAR: &str = "PROMPTDECK_TEXT_MODEL";
pub const IMAGE_MODEL_VAR: &str = "PROMPTDECK_IMAGE_MODEL";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Client settings, loaded once at startup and handed to the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: ApiKey,
    api_base: String,
    text_model: Option<String>,
    image_model: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey(api_key.into()),
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: None,
            image_model: None,
        }
    }

    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ActionError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(error = %err, "ignoring unreadable .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ActionError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| non_empty(*key))
            .ok_or_else(|| ActionError::MissingCredential {
                vars: API_KEY_VARS.to_vec(),
            })?;
        let mut config = Self::new(api_key);
        if let Some(base) = non_empty(API_BASE_VAR) {
            config = config.with_api_base(base);
        }
        config.text_model = non_empty(TEXT_MODEL_VAR);
        config.image_model = non_empty(IMAGE_MODEL_VAR);
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_text_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.text_model = model;
        }
        self
    }

    pub fn with_image_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.image_model = model;
        }
        self
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn text_model(&self) -> Option<&str> {
        self.text_model.as_deref()
    }

    pub fn image_model(&self) -> Option<&str> {
        self.image_model.as_deref()
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ClientConfig, DEFAULT_API_BASE};
    use crate::error::ActionError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = ClientConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ActionError::MissingCredential { .. }));
        assert_eq!(err.kind(), "missing_credential");
    }

    #[test]
    fn gemini_key_wins_over_google_key() -> anyhow::Result<()> {
        let config = ClientConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", " gemini "),
        ]))?;
        assert_eq!(config.api_key().expose(), "gemini");
        assert_eq!(config.api_base(), DEFAULT_API_BASE);

        let fallback = ClientConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "google")]))?;
        assert_eq!(fallback.api_key().expose(), "google");
        Ok(())
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let config = ClientConfig::new("secret-value");
        assert!(!format!("{config:?}").contains("secret-value"));
    }

    #[test]
    fn base_and_models_come_from_environment_and_flags() -> anyhow::Result<()> {
        let config = ClientConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_API_BASE", "http://localhost:8080/v1beta/"),
            ("PROMPTDECK_TEXT_MODEL", "gemini-2.5-flash"),
        ]))?
        .with_text_model(None)
        .with_image_model(Some("gemini-2.5-flash-image".to_string()));

        assert_eq!(config.api_base(), "http://localhost:8080/v1beta");
        assert_eq!(config.text_model(), Some("gemini-2.5-flash"));
        assert_eq!(config.image_model(), Some("gemini-2.5-flash-image"));
        assert_eq!(
            config.endpoint_for_model("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            config.endpoint_for_model("models/gemini-2.0-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
        Ok(())
    }
}
