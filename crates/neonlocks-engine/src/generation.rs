use std::io::{self, Write};

use neonlocks_contracts::encoded::{detect_mime, strip_data_prefix};
use neonlocks_contracts::events::{EventKind, EventLog, EventPayload};
use neonlocks_contracts::EncodedImage;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::CredentialSource;
use crate::editor::{truncate_text, EditRequest, ImageEditor};

pub const CONFIGURATION_MESSAGE: &str = "API Key configuration error. Please check setup.";
pub const NO_IMAGE_MESSAGE: &str = "No image data received from the model.";
pub const FALLBACK_MESSAGE: &str = "Something went wrong with the AI connection.";

/// Returned images are always labelled PNG, whatever the part declares.
const RESULT_MIME: &str = "image/png";
const MAX_ERROR_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API Key is missing")]
    Configuration,

    #[error("No image data received from the model.")]
    NoImageReturned,

    #[error("{message}")]
    RemoteService { message: String },
}

impl GenerationError {
    /// The banner text shown for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration => CONFIGURATION_MESSAGE.to_string(),
            Self::NoImageReturned => NO_IMAGE_MESSAGE.to_string(),
            Self::RemoteService { message } => {
                if mentions_api_key(message) {
                    CONFIGURATION_MESSAGE.to_string()
                } else if message.trim().is_empty() {
                    FALLBACK_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

fn mentions_api_key(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("api key") || lowered.contains("api_key")
}

/// Wraps a style instruction so the model edits only the hair.
pub fn wrap_instruction(instruction: &str) -> String {
    format!(
        "Edit this image: {instruction}. Maintain the original face identity, lighting, \
         and background exactly as they are. Only change the hair. High quality, \
         photorealistic 8k."
    )
}

pub fn build_edit_request(model: &str, image: &EncodedImage, instruction: &str) -> EditRequest {
    let raw = image.data_uri();
    EditRequest {
        model: model.to_string(),
        image_mime_type: detect_mime(raw).to_string(),
        image_data: strip_data_prefix(raw).to_string(),
        text: wrap_instruction(instruction),
    }
}

/// `candidates[0].content.parts[0].inlineData.data`, if present and non-empty.
pub fn extract_first_image(response: &Value) -> Option<&str> {
    let part = response
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?;
    part.get("inlineData")
        .or_else(|| part.get("inline_data"))?
        .get("data")?
        .as_str()
        .filter(|data| !data.is_empty())
}

/// Runs one image-edit request end to end.
pub struct StyleGenerator<E: ImageEditor> {
    editor: E,
    credentials: CredentialSource,
    model: String,
    events: Option<EventLog>,
}

impl<E: ImageEditor> StyleGenerator<E> {
    pub fn new(editor: E, credentials: CredentialSource, model: impl Into<String>) -> Self {
        Self {
            editor,
            credentials,
            model: model.into(),
            events: None,
        }
    }

    pub fn set_events(&mut self, events: Option<EventLog>) {
        self.events = events;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// The credential is checked before anything else; without it the editor
    /// is never called. Exactly one editor call otherwise, with no retry.
    pub fn generate(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<EncodedImage, GenerationError> {
        let Some(api_key) = self.credentials.resolve() else {
            return Err(GenerationError::Configuration);
        };

        let request = build_edit_request(&self.model, image, instruction);
        let response = self
            .editor
            .generate_image_edit(&request, &api_key)
            .map_err(|err| {
                let message = error_chain_text(&err, MAX_ERROR_CHARS);
                self.log(
                    EventKind::RemoteError,
                    json!({
                        "editor": self.editor.name(),
                        "model": self.model,
                        "error": message,
                    }),
                );
                GenerationError::RemoteService { message }
            })?;

        let Some(data) = extract_first_image(&response) else {
            self.log(
                EventKind::RemoteNoImage,
                json!({
                    "editor": self.editor.name(),
                    "model": self.model,
                    "candidates": response
                        .get("candidates")
                        .and_then(Value::as_array)
                        .map(|rows| rows.len())
                        .unwrap_or(0),
                }),
            );
            return Err(GenerationError::NoImageReturned);
        };
        Ok(EncodedImage::from_data_uri(&format!(
            "data:{RESULT_MIME};base64,{data}"
        )))
    }

    /// Remote failures go to stderr when no event log is attached, so they
    /// are never silently dropped.
    fn log(&self, kind: EventKind, payload: Value) {
        let details: EventPayload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match self.events.as_ref() {
            Some(events) => {
                if let Err(err) = events.record(kind, details) {
                    eprintln!("neonlocks warning: failed to write {kind} event: {err:#}");
                }
            }
            None if kind.is_remote_failure() => {
                let _ = report_unlogged(&mut io::stderr().lock(), kind, &details);
            }
            None => {}
        }
    }
}

fn report_unlogged(out: &mut impl Write, kind: EventKind, details: &EventPayload) -> io::Result<()> {
    let summary = details
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Value::Object(details.clone()).to_string());
    writeln!(out, "neonlocks {kind}: {summary}")
}

/// Flattens an error and its causes into one line, skipping blank and
/// repeated messages.
fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut causes: Vec<String> = err
        .chain()
        .map(|cause| cause.to_string().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    causes.dedup();
    let joined = if causes.is_empty() {
        err.to_string()
    } else {
        causes.join(" | caused by: ")
    };
    truncate_text(&joined, max_chars)
}
