use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use neonlocks_contracts::events::{EventKind, EventLog, EventPayload};
use neonlocks_contracts::session::{reduce, Phase, SessionEvent, SessionState};
use neonlocks_contracts::styles::{StyleCatalog, CUSTOM_STYLE_ID};
use neonlocks_contracts::EncodedImage;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::editor::ImageEditor;
use crate::generation::StyleGenerator;
use crate::intake::{accept_file, ImageSource, IntakeError};

/// What became of a [`Session::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The admission guard did not hold; nothing changed and no call was made.
    Rejected,
    Succeeded,
    Failed(String),
}

/// Owns the session record and is the only thing that mutates it.
///
/// Every transition goes through [`reduce`]; this type adds the effects
/// (file intake, the remote call, saving) and the event log around it.
pub struct Session<E: ImageEditor> {
    session_id: String,
    state: SessionState,
    generator: StyleGenerator<E>,
    catalog: StyleCatalog,
    events: Option<EventLog>,
}

impl<E: ImageEditor> Session<E> {
    pub fn new(generator: StyleGenerator<E>, catalog: StyleCatalog) -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            state: SessionState::default(),
            generator,
            catalog,
            events: None,
        }
    }

    /// Starts logging to `path`; the generator shares the same log.
    pub fn with_event_log(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let events = EventLog::create(path.as_ref(), &self.session_id)?;
        events.record(
            EventKind::SessionStarted,
            json_object(json!({
                "model": self.generator.model(),
                "editor": self.generator.editor().name(),
            })),
        )?;
        self.generator.set_events(Some(events.clone()));
        self.events = Some(events);
        Ok(self)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn generator(&self) -> &StyleGenerator<E> {
        &self.generator
    }

    fn dispatch(&mut self, event: SessionEvent) {
        self.state = reduce(&self.state, event);
    }

    /// Validation failures leave the state untouched.
    pub fn select_image(&mut self, file: &dyn ImageSource) -> Result<(), IntakeError> {
        let image = match accept_file(file) {
            Ok(image) => image,
            Err(err) => {
                self.log(
                    EventKind::ImageRejected,
                    json!({
                        "name": file.name(),
                        "content_type": file.content_type(),
                        "size": file.size(),
                        "reason": err.to_string(),
                    }),
                );
                return Err(err);
            }
        };
        self.log(
            EventKind::ImageSelected,
            json!({
                "name": file.name(),
                "mime_type": image.mime_type(),
                "bytes": image.byte_len(),
                "sha256": fingerprint(&image),
            }),
        );
        self.dispatch(SessionEvent::ImageSelected(image));
        Ok(())
    }

    /// Picks a preset by id, or `custom` to keep the typed prompt.
    pub fn select_style(&mut self, id: &str) -> Result<()> {
        let id = id.trim();
        let prompt = if id == CUSTOM_STYLE_ID {
            self.state.instruction.clone()
        } else {
            match self.catalog.get(id) {
                Some(preset) => preset.prompt.clone(),
                None => bail!(
                    "unknown style '{id}' (available: {}, {CUSTOM_STYLE_ID})",
                    self.catalog.ids().join(", ")
                ),
            }
        };
        self.dispatch(SessionEvent::StyleSelected {
            id: id.to_string(),
            prompt,
        });
        Ok(())
    }

    pub fn edit_custom_prompt(&mut self, text: &str) {
        self.dispatch(SessionEvent::CustomPromptEdited(text.to_string()));
    }

    /// Runs one generation if the guard holds. `in_flight` is cleared on
    /// every path that leaves this function.
    pub fn submit(&mut self) -> SubmitOutcome {
        if !self.state.can_submit() {
            return SubmitOutcome::Rejected;
        }
        let (Some(image), Some(instruction)) = (
            self.state.source_image.clone(),
            self.state.instruction().map(str::to_string),
        ) else {
            return SubmitOutcome::Rejected;
        };

        self.dispatch(SessionEvent::GenerationStarted);
        self.log(
            EventKind::GenerationStarted,
            json!({
                "style_id": self.state.selected_style_id,
                "instruction": instruction,
                "source_sha256": fingerprint(&image),
                "model": self.generator.model(),
            }),
        );

        let outcome = match self.generator.generate(&image, &instruction) {
            Ok(result) => {
                self.log(
                    EventKind::GenerationSucceeded,
                    json!({
                        "mime_type": result.mime_type(),
                        "bytes": result.byte_len(),
                        "sha256": fingerprint(&result),
                    }),
                );
                self.dispatch(SessionEvent::GenerationSucceeded(result));
                SubmitOutcome::Succeeded
            }
            Err(err) => {
                let message = err.user_message();
                self.log(
                    EventKind::GenerationFailed,
                    json!({
                        "error": err.to_string(),
                        "message": message,
                    }),
                );
                self.dispatch(SessionEvent::GenerationFailed(message.clone()));
                SubmitOutcome::Failed(message)
            }
        };
        self.dispatch(SessionEvent::GenerationFinished);
        outcome
    }

    pub fn reset_result(&mut self) {
        self.dispatch(SessionEvent::ResultReset);
    }

    pub fn clear(&mut self) {
        self.log(EventKind::SessionCleared, json!({}));
        self.dispatch(SessionEvent::Cleared);
    }

    /// Writes the current result as `neonlocks-<unix millis>.png` under `dir`.
    pub fn save_result(&self, dir: &Path) -> Result<PathBuf> {
        let Some(result) = self.state.result.as_ref() else {
            bail!("no generated image to save");
        };
        let bytes = result.decode()?;
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(result_file_name(chrono::Utc::now().timestamp_millis()));
        fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
        self.log(
            EventKind::ResultSaved,
            json!({
                "path": path.to_string_lossy().to_string(),
                "bytes": bytes.len(),
            }),
        );
        Ok(path)
    }

    fn log(&self, kind: EventKind, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.record(kind, json_object(payload)) {
            eprintln!("neonlocks warning: failed to write {kind} event: {err:#}");
        }
    }
}

pub fn result_file_name(stamp_millis: i64) -> String {
    format!("neonlocks-{stamp_millis}.png")
}

/// SHA-256 of the base64 payload, so logs can tell images apart without
/// carrying them.
pub fn fingerprint(image: &EncodedImage) -> String {
    hex::encode(Sha256::digest(image.raw_base64().as_bytes()))
}

fn json_object(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
