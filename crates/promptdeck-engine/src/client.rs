use promptdeck_contracts::request::GenerationRequest;
use promptdeck_contracts::response::GenerationResponse;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ActionError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const ERROR_BODY_MAX_CHARS: usize = 512;

/// The remote side of an action: one request in, one parsed response out.
pub trait GenerationApi: Send + Sync {
    /// Provider name as listed in the model registry.
    fn name(&self) -> &str;
    fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ActionError>;
}

/// Blocking client for the Gemini `generateContent` endpoint.
///
/// One attempt per call; failures are returned as-is to the caller.
pub struct GeminiClient {
    config: ClientConfig,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ActionError> {
        let http = HttpClient::builder()
            .build()
            .map_err(|err| ActionError::NetworkOrApi {
                status: None,
                message: format!("HTTP client setup failed: {err}"),
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn build_payload(request: &GenerationRequest) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            json!([{
                "role": "user",
                "parts": [{ "text": request.prompt() }],
            }]),
        );

        let mut generation_config = Map::new();
        if let Some(options) = request.options() {
            generation_config.insert(
                "maxOutputTokens".to_string(),
                json!(options.max_output_tokens()),
            );
            generation_config.insert("temperature".to_string(), json!(options.temperature()));
        }
        if request.expects_image() {
            generation_config.insert("responseModalities".to_string(), json!(["TEXT", "IMAGE"]));
        }
        if !generation_config.is_empty() {
            payload.insert(
                "generationConfig".to_string(),
                Value::Object(generation_config),
            );
        }
        Value::Object(payload)
    }
}

impl GenerationApi for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ActionError> {
        let endpoint = self.config.endpoint_for_model(model);
        let payload = Self::build_payload(request);
        debug!(%endpoint, model_id = %request.model_id(), "sending generateContent request");

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.config.api_key().expose())
            .json(&payload)
            .send()
            .map_err(|err| ActionError::NetworkOrApi {
                status: None,
                message: format!("Gemini request failed ({endpoint}): {err}"),
            })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|err| ActionError::NetworkOrApi {
            status: Some(status),
            message: format!("Gemini response body read failed: {err}"),
        })?;
        let parsed = parse_response(status, &body)?;
        debug!(
            candidates = parsed.candidates.len(),
            total_tokens = ?parsed
                .usage_metadata
                .as_ref()
                .and_then(|usage| usage.total_token_count),
            "received generateContent response"
        );
        Ok(parsed)
    }
}

/// Maps an HTTP status and body onto a response or a verbatim API error.
pub(crate) fn parse_response(status: u16, body: &str) -> Result<GenerationResponse, ActionError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| truncate_text(body.trim(), ERROR_BODY_MAX_CHARS));
        return Err(ActionError::NetworkOrApi {
            status: Some(status),
            message: format!("Gemini request failed ({status}): {message}"),
        });
    }
    serde_json::from_str(body).map_err(|err| ActionError::NetworkOrApi {
        status: Some(status),
        message: format!("Gemini returned invalid JSON payload: {err}"),
    })
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use promptdeck_contracts::request::{GenerationOptions, GenerationRequest, ModelId};
    use promptdeck_contracts::response::Part;
    use serde_json::json;

    use super::{parse_response, truncate_text, GeminiClient};
    use crate::error::ActionError;

    #[test]
    fn options_reach_payload_unchanged() -> anyhow::Result<()> {
        let request = GenerationRequest::new("explain ownership", ModelId::Text)
            .with_options(GenerationOptions::new(100, 1.5)?);
        let payload = GeminiClient::build_payload(&request);

        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            json!("explain ownership")
        );
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], json!(100));
        assert_eq!(payload["generationConfig"]["temperature"], json!(1.5));
        assert!(payload["generationConfig"].get("responseModalities").is_none());
        Ok(())
    }

    #[test]
    fn fractional_temperature_is_not_rounded() -> anyhow::Result<()> {
        let request = GenerationRequest::new("q", ModelId::Text)
            .with_options(GenerationOptions::new(256, 0.7)?);
        let payload = GeminiClient::build_payload(&request);
        assert_eq!(payload["generationConfig"]["temperature"].as_f64(), Some(0.7));
        Ok(())
    }

    #[test]
    fn plain_question_has_no_generation_config() {
        let payload = GeminiClient::build_payload(&GenerationRequest::new("hi", ModelId::Text));
        assert!(payload.get("generationConfig").is_none());
    }

    #[test]
    fn image_request_asks_for_text_and_image() {
        let payload = GeminiClient::build_payload(&GenerationRequest::new(
            "a paper boat",
            ModelId::Multimodal,
        ));
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert!(payload["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn api_error_message_is_surfaced() {
        let body = json!({
            "error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}
        })
        .to_string();
        let err = parse_response(403, &body).unwrap_err();
        assert!(matches!(
            err,
            ActionError::NetworkOrApi {
                status: Some(403),
                ..
            }
        ));
        assert_eq!(err.to_string(), "Gemini request failed (403): API key not valid.");
    }

    #[test]
    fn non_json_error_body_is_truncated() {
        let body = "x".repeat(600);
        let err = parse_response(502, &body).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Gemini request failed (502): xxx"));
        assert!(message.ends_with('…'));
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn invalid_json_success_is_an_api_error() {
        let err = parse_response(200, "<html>").unwrap_err();
        assert_eq!(err.kind(), "network_or_api");
        assert!(err.to_string().starts_with("Gemini returned invalid JSON payload"));
    }

    #[test]
    fn success_body_parses_into_parts() -> anyhow::Result<()> {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Borrowing is..."}]}}]
        })
        .to_string();
        let response = parse_response(200, &body)?;
        assert_eq!(
            response.candidates[0].parts(),
            &[Part::text("Borrowing is...")]
        );
        Ok(())
    }
}
