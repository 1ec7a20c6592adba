use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Keys every record owns; detail maps cannot shadow them.
const ENVELOPE_KEYS: [&str; 3] = ["type", "session_id", "ts"];

/// What happened during a try-on session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    ImageSelected,
    ImageRejected,
    GenerationStarted,
    GenerationSucceeded,
    GenerationFailed,
    RemoteError,
    RemoteNoImage,
    ResultSaved,
    SessionCleared,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::ImageSelected => "image_selected",
            Self::ImageRejected => "image_rejected",
            Self::GenerationStarted => "generation_started",
            Self::GenerationSucceeded => "generation_succeeded",
            Self::GenerationFailed => "generation_failed",
            Self::RemoteError => "remote_error",
            Self::RemoteNoImage => "remote_no_image",
            Self::ResultSaved => "result_saved",
            Self::SessionCleared => "session_cleared",
        }
    }

    /// Failures of the remote call, which are worth surfacing even when no
    /// log file is configured.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteError | Self::RemoteNoImage)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub details: EventPayload,
}

/// Append-only JSONL log shared by the session driver and the generator.
///
/// The file is opened once; clones write through the same handle.
#[derive(Debug, Clone)]
pub struct EventLog {
    session_id: Arc<str>,
    file: Arc<Mutex<File>>,
}

impl EventLog {
    pub fn create(path: &Path, session_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self {
            session_id: Arc::from(session_id),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn record(&self, kind: EventKind, mut details: EventPayload) -> Result<EventRecord> {
        for key in ENVELOPE_KEYS {
            details.remove(key);
        }
        let record = EventRecord {
            kind,
            session_id: self.session_id.to_string(),
            ts: now_utc_iso(),
            details,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append {kind} event"))?;
        Ok(record)
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
