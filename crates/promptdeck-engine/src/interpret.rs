//! Turns a provider response into an ordered list of displayable outputs.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use promptdeck_contracts::response::{GenerationResponse, Part};
use tracing::{debug, warn};

use crate::error::{ActionError, ImageDecodeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutput {
    Text(String),
    Image(DecodedImage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl DecodedImage {
    /// Pixel size when the bytes are in a format the `image` crate knows.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    pub fn extension(&self) -> &'static str {
        let lowered = self.mime_type.to_ascii_lowercase();
        if lowered.contains("jpeg") || lowered.contains("jpg") {
            return "jpg";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        if lowered.contains("gif") {
            return "gif";
        }
        if lowered.contains("png") {
            return "png";
        }
        image::guess_format(&self.bytes)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin")
    }
}

/// Outcome for one part: a decode failure stays local to its part.
pub type PartOutcome = Result<DisplayOutput, ImageDecodeError>;

/// Walks the first candidate's parts in order.
///
/// Empty text is dropped (whitespace is content), unrecognized parts are
/// skipped with a warning, and inline payloads are base64-decoded. Only a
/// response without candidates fails as a whole.
pub fn interpret(response: &GenerationResponse) -> Result<Vec<PartOutcome>, ActionError> {
    let Some(candidate) = response.first_candidate() else {
        let reason = match response.block_reason() {
            Some(block) => format!("prompt blocked ({block})"),
            None => "response contained no candidates".to_string(),
        };
        return Err(ActionError::no_content(reason));
    };

    let mut outcomes = Vec::new();
    for (part_index, part) in candidate.parts().iter().enumerate() {
        match part {
            Part::Text(text) => {
                if text.is_empty() {
                    debug!(part_index, "skipping empty text part");
                    continue;
                }
                outcomes.push(Ok(DisplayOutput::Text(text.clone())));
            }
            Part::InlineImage { mime_type, data } => {
                outcomes.push(
                    decode_inline_payload(part_index, mime_type, data).map(DisplayOutput::Image),
                );
            }
            Part::Unrecognized { fields } => {
                warn!(part_index, ?fields, "skipping unrecognized response part");
            }
        }
    }
    Ok(outcomes)
}

pub fn decode_inline_payload(
    part_index: usize,
    mime_type: &str,
    data: &str,
) -> Result<DecodedImage, ImageDecodeError> {
    let failure = |reason: String| ImageDecodeError {
        part_index,
        mime_type: mime_type.to_string(),
        reason,
    };
    let compact: String = data.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|err| failure(err.to_string()))?;
    if bytes.is_empty() {
        return Err(failure("payload is empty".to_string()));
    }
    Ok(DecodedImage {
        bytes,
        mime_type: mime_type.to_string(),
    })
}
