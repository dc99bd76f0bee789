//! Failures of a single user action.

use std::path::PathBuf;

use promptdeck_contracts::request::OptionsError;

/// Every way an action can fail. Errors end the action they occurred in and
/// are turned into a message at the session boundary; only
/// [`ActionError::MissingCredential`] stops the application, at startup.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("missing API credential: set {}", .vars.join(" or "))]
    MissingCredential { vars: Vec<&'static str> },

    /// Any failure of the remote call, surfaced verbatim.
    #[error("{message}")]
    NetworkOrApi { status: Option<u16>, message: String },

    #[error("no content generated: {reason}")]
    NoContentGenerated { reason: String },

    #[error(transparent)]
    ImageDecode(#[from] ImageDecodeError),

    #[error("invalid generation options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("model selection failed: {0}")]
    ModelSelection(String),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ActionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::NetworkOrApi { .. } => "network_or_api",
            Self::NoContentGenerated { .. } => "no_content_generated",
            Self::ImageDecode(_) => "image_decode",
            Self::InvalidOptions(_) => "invalid_options",
            Self::EmptyPrompt => "empty_prompt",
            Self::ModelSelection(_) => "model_selection",
            Self::Io { .. } => "io",
        }
    }

    pub(crate) fn no_content(reason: impl Into<String>) -> Self {
        Self::NoContentGenerated {
            reason: reason.into(),
        }
    }
}

/// An inline payload that could not be turned into image bytes. Reported for
/// its part only; the rest of the response is still rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("part {part_index}: could not decode {mime_type} payload: {reason}")]
pub struct ImageDecodeError {
    pub part_index: usize,
    pub mime_type: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use promptdeck_contracts::request::OptionsError;

    use super::{ActionError, ImageDecodeError};

    #[test]
    fn messages_are_user_facing() {
        let missing = ActionError::MissingCredential {
            vars: vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        };
        assert_eq!(
            missing.to_string(),
            "missing API credential: set GEMINI_API_KEY or GOOGLE_API_KEY"
        );

        let api = ActionError::NetworkOrApi {
            status: Some(429),
            message: "Gemini request failed (429): Resource has been exhausted".to_string(),
        };
        assert_eq!(
            api.to_string(),
            "Gemini request failed (429): Resource has been exhausted"
        );

        let decode = ActionError::from(ImageDecodeError {
            part_index: 2,
            mime_type: "image/png".to_string(),
            reason: "Invalid symbol 33, offset 0.".to_string(),
        });
        assert_eq!(
            decode.to_string(),
            "part 2: could not decode image/png payload: Invalid symbol 33, offset 0."
        );
        assert_eq!(decode.kind(), "image_decode");
    }

    #[test]
    fn option_errors_convert() {
        let err = ActionError::from(OptionsError::ZeroMaxOutputTokens);
        assert_eq!(err.kind(), "invalid_options");
        assert_eq!(
            err.to_string(),
            "invalid generation options: max_output_tokens must be a positive integer"
        );
    }
}
