//! Request execution for promptdeck: the Gemini client, the response
//! interpreter, and the session that runs the three user actions.

pub mod client;
pub mod config;
pub mod dryrun;
pub mod error;
pub mod interpret;
pub mod session;

pub use client::{GeminiClient, GenerationApi};
pub use config::ClientConfig;
pub use dryrun::DryrunApi;
pub use error::{ActionError, ImageDecodeError};
pub use interpret::{interpret, DecodedImage, DisplayOutput, PartOutcome};
pub use session::{
    ActionKind, ActionReport, RenderedItem, Session, DEFAULT_EXPLAIN_MAX_TOKENS,
    DEFAULT_EXPLAIN_TEMPERATURE,
};
