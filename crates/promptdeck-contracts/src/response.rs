use serde::Deserialize;
use serde_json::{Map, Value};

/// Provider reply to a `generateContent` call.
///
/// Only the fields the interpreter and the session read are modelled; the
/// rest of the payload is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerationResponse {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
            usage_metadata: None,
        }
    }

    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Candidate {
    pub fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One unit of candidate content, classified once when the payload is read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WirePart")]
pub enum Part {
    Text(String),
    InlineImage { mime_type: String, data: String },
    /// Neither text nor inline data; keeps the field names for diagnostics.
    Unrecognized { fields: Vec<String> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline_image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineImage {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::InlineImage { .. } => "inline_image",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

pub const DEFAULT_INLINE_MIME: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<WireInlineData>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct WireInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

impl From<WirePart> for Part {
    fn from(wire: WirePart) -> Self {
        if let Some(inline) = wire.inline_data {
            let mime_type = inline
                .mime_type
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_INLINE_MIME.to_string());
            return Part::InlineImage {
                mime_type,
                data: inline.data,
            };
        }
        if let Some(text) = wire.text {
            return Part::Text(text);
        }
        Part::Unrecognized {
            fields: wire.other.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}
