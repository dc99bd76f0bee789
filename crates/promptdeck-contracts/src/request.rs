use std::fmt;

pub const MAX_TEMPERATURE: f64 = 2.0;

/// Which configured model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    Text,
    Multimodal,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Multimodal => "multimodal",
        }
    }

    /// Registry capability a model must carry to serve this id.
    pub fn capability(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Multimodal => "image",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    #[error("max_output_tokens must be a positive integer")]
    ZeroMaxOutputTokens,
    #[error("temperature must be within [0, 2] (got {0})")]
    TemperatureOutOfRange(f64),
}

/// Generation knobs. Values are validated once and then carried unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    max_output_tokens: u32,
    temperature: f64,
}

impl GenerationOptions {
    pub fn new(max_output_tokens: u32, temperature: f64) -> Result<Self, OptionsError> {
        if max_output_tokens == 0 {
            return Err(OptionsError::ZeroMaxOutputTokens);
        }
        if !temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(OptionsError::TemperatureOutOfRange(temperature));
        }
        Ok(Self {
            max_output_tokens,
            temperature,
        })
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    model_id: ModelId,
    options: Option<GenerationOptions>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model_id: ModelId) -> Self {
        Self {
            prompt: prompt.into(),
            model_id,
            options: None,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn options(&self) -> Option<&GenerationOptions> {
        self.options.as_ref()
    }

    /// Multimodal requests ask the provider for an image alongside text.
    pub fn expects_image(&self) -> bool {
        self.model_id == ModelId::Multimodal
    }
}
