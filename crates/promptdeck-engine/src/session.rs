use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use promptdeck_contracts::events::{EventKind, EventLog, EventPayload};
use promptdeck_contracts::models::{ModelSelector, ModelSpec};
use promptdeck_contracts::request::{GenerationOptions, GenerationRequest, ModelId};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::GenerationApi;
use crate::error::ActionError;
use crate::interpret::{interpret, DecodedImage, DisplayOutput};

/// The three things a user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Ask,
    Explain,
    GenerateImage,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Explain => "explain",
            Self::GenerateImage => "generate_image",
        }
    }

    fn model_id(&self) -> ModelId {
        match self {
            Self::Ask | Self::Explain => ModelId::Text,
            Self::GenerateImage => ModelId::Multimodal,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedItem {
    Text(String),
    Image {
        path: PathBuf,
        mime_type: String,
        dimensions: Option<(u32, u32)>,
    },
    /// A part that could not be shown; the message is user-facing.
    DecodeFailed(String),
}

/// What the user sees after an action. Failures carry their message and any
/// items that were rendered before the failure was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: ActionKind,
    pub model: Option<String>,
    pub items: Vec<RenderedItem>,
    pub error: Option<String>,
}

impl ActionReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn images(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().filter_map(|item| match item {
            RenderedItem::Image { path, .. } => Some(path.as_path()),
            _ => None,
        })
    }
}

/// Interactive defaults for the explanation action.
pub const DEFAULT_EXPLAIN_MAX_TOKENS: u32 = 256;
pub const DEFAULT_EXPLAIN_TEMPERATURE: f64 = 0.7;

pub struct Session {
    api: Box<dyn GenerationApi>,
    out_dir: PathBuf,
    events: EventLog,
    selector: ModelSelector,
    text_model: ModelSpec,
    image_model: ModelSpec,
    completed: u64,
    failed: u64,
}

impl Session {
    pub fn new(
        api: Box<dyn GenerationApi>,
        out_dir: impl Into<PathBuf>,
        mut events: EventLog,
        text_model: Option<&str>,
        image_model: Option<&str>,
    ) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        let selector = ModelSelector::new(None);
        let text_model = select_model(&selector, api.name(), text_model, ModelId::Text)?;
        let image_model = select_model(&selector, api.name(), image_model, ModelId::Multimodal)?;

        events.record(
            EventKind::SessionStarted,
            payload(json!({
                "api": api.name(),
                "out_dir": out_dir.to_string_lossy(),
                "text_model": text_model.name,
                "image_model": image_model.name,
            })),
        )?;

        Ok(Self {
            api,
            out_dir,
            events,
            selector,
            text_model,
            image_model,
            completed: 0,
            failed: 0,
        })
    }

    pub fn text_model(&self) -> &str {
        &self.text_model.name
    }

    pub fn image_model(&self) -> &str {
        &self.image_model.name
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn counts(&self) -> (u64, u64) {
        (self.completed, self.failed)
    }

    /// Switches the text model; returns the model actually selected.
    pub fn set_text_model(&mut self, requested: &str) -> Result<&str, ActionError> {
        self.text_model = select_model(
            &self.selector,
            self.api.name(),
            Some(requested),
            ModelId::Text,
        )?;
        Ok(&self.text_model.name)
    }

    pub fn set_image_model(&mut self, requested: &str) -> Result<&str, ActionError> {
        self.image_model = select_model(
            &self.selector,
            self.api.name(),
            Some(requested),
            ModelId::Multimodal,
        )?;
        Ok(&self.image_model.name)
    }

    pub fn ask(&mut self, prompt: &str) -> ActionReport {
        self.run(ActionKind::Ask, prompt, None)
    }

    pub fn explain(
        &mut self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f64,
    ) -> ActionReport {
        match GenerationOptions::new(max_output_tokens, temperature) {
            Ok(options) => self.run(ActionKind::Explain, prompt, Some(options)),
            Err(err) => self.fail(ActionKind::Explain, None, Vec::new(), err.into()),
        }
    }

    pub fn generate_image(&mut self, prompt: &str) -> ActionReport {
        self.run(ActionKind::GenerateImage, prompt, None)
    }

    /// Runs one action end to end. Never returns an error: every failure is
    /// converted into the report's message.
    pub fn run(
        &mut self,
        kind: ActionKind,
        prompt: &str,
        options: Option<GenerationOptions>,
    ) -> ActionReport {
        let spec = match kind.model_id() {
            ModelId::Text => &self.text_model,
            ModelId::Multimodal => &self.image_model,
        };
        let model = spec.name.clone();
        if let Some(options) = options {
            if spec.exceeds_output_limit(options.max_output_tokens()) {
                warn!(
                    %model,
                    limit = ?spec.output_token_limit,
                    max_output_tokens = options.max_output_tokens(),
                    "max_output_tokens is above the model's output limit"
                );
            }
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return self.fail(kind, Some(model), Vec::new(), ActionError::EmptyPrompt);
        }

        let mut request = GenerationRequest::new(prompt, kind.model_id());
        if let Some(options) = options {
            request = request.with_options(options);
        }
        self.log_event(
            EventKind::ActionStarted,
            json!({
                "action": kind.as_str(),
                "model": model,
                "prompt_chars": prompt.chars().count(),
                "max_output_tokens": options.map(|o| o.max_output_tokens()),
                "temperature": options.map(|o| o.temperature()),
            }),
        );

        let mut items = Vec::new();
        match self.execute(&model, &request, &mut items) {
            Ok(()) => {
                self.completed += 1;
                let decode_failures = items
                    .iter()
                    .filter(|item| matches!(item, RenderedItem::DecodeFailed(_)))
                    .count();
                let report = ActionReport {
                    action: kind,
                    model: Some(model),
                    items,
                    error: None,
                };
                self.log_event(
                    EventKind::ActionCompleted,
                    json!({
                        "action": kind.as_str(),
                        "model": report.model,
                        "items": report.items.len(),
                        "images": report
                            .images()
                            .map(|path| path.to_string_lossy().to_string())
                            .collect::<Vec<_>>(),
                        "decode_failures": decode_failures,
                    }),
                );
                info!(action = %kind, items = report.items.len(), "action completed");
                report
            }
            Err(err) => self.fail(kind, Some(model), items, err),
        }
    }

    fn execute(
        &self,
        model: &str,
        request: &GenerationRequest,
        items: &mut Vec<RenderedItem>,
    ) -> Result<(), ActionError> {
        let response = self.api.generate(model, request)?;
        let outcomes = interpret(&response)?;
        let stamp = timestamp_millis();
        let mut image_count = 0usize;
        let mut first_decode_error = None;

        for outcome in outcomes {
            match outcome {
                Ok(DisplayOutput::Text(text)) => items.push(RenderedItem::Text(text)),
                Ok(DisplayOutput::Image(image)) => {
                    let path = self.save_image(&image, stamp, image_count)?;
                    image_count += 1;
                    items.push(RenderedItem::Image {
                        path,
                        mime_type: image.mime_type.clone(),
                        dimensions: image.dimensions(),
                    });
                }
                Err(err) => {
                    warn!(error = %err, "inline image could not be decoded");
                    items.push(RenderedItem::DecodeFailed(err.to_string()));
                    first_decode_error.get_or_insert(err);
                }
            }
        }

        if request.expects_image() && image_count == 0 {
            // Image parts that all failed to decode keep their own error.
            return Err(match first_decode_error {
                Some(err) => ActionError::ImageDecode(err),
                None => ActionError::no_content("response contained no image"),
            });
        }
        if items.is_empty() {
            let reason = response
                .first_candidate()
                .and_then(|candidate| candidate.finish_reason.as_deref())
                .map(|reason| format!("no displayable parts (finish reason {reason})"))
                .unwrap_or_else(|| "no displayable parts".to_string());
            return Err(ActionError::no_content(reason));
        }
        Ok(())
    }

    fn save_image(
        &self,
        image: &DecodedImage,
        stamp: u128,
        index: usize,
    ) -> Result<PathBuf, ActionError> {
        let path = self
            .out_dir
            .join(format!("artifact-{stamp}-{index:02}.{}", image.extension()));
        fs::write(&path, &image.bytes).map_err(|source| ActionError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn fail(
        &mut self,
        kind: ActionKind,
        model: Option<String>,
        items: Vec<RenderedItem>,
        err: ActionError,
    ) -> ActionReport {
        self.failed += 1;
        let message = err.to_string();
        warn!(action = %kind, kind = err.kind(), %message, "action failed");
        self.log_event(
            EventKind::ActionFailed,
            json!({
                "action": kind.as_str(),
                "model": model,
                "error_kind": err.kind(),
                "message": message,
            }),
        );
        ActionReport {
            action: kind,
            model,
            items,
            error: Some(message),
        }
    }

    pub fn finish(&mut self) -> Result<()> {
        self.events.record(
            EventKind::SessionFinished,
            payload(json!({
                "completed": self.completed,
                "failed": self.failed,
            })),
        )?;
        Ok(())
    }

    fn log_event(&mut self, kind: EventKind, value: Value) {
        if let Err(err) = self.events.record(kind, payload(value)) {
            warn!(event = kind.as_str(), error = %err, "failed to record event");
        }
    }
}

fn select_model(
    selector: &ModelSelector,
    provider: &str,
    requested: Option<&str>,
    model_id: ModelId,
) -> Result<ModelSpec, ActionError> {
    let selection = selector
        .select_for_provider(requested, model_id.capability(), provider)
        .map_err(ActionError::ModelSelection)?;
    if let (Some(reason), Some(_)) = (&selection.fallback_reason, &selection.requested) {
        warn!(
            model_id = %model_id,
            selected = %selection.model.name,
            "{reason}"
        );
    }
    Ok(selection.model)
}

fn payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
