use serde::{Deserialize, Serialize};

use crate::encoded::EncodedImage;

/// Phase of a session, derived from [`SessionState`] rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Ready,
    Generating,
    Success,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Generating => "generating",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// The single mutable record behind a session. `Default` is the cleared state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub source_image: Option<EncodedImage>,
    pub result: Option<EncodedImage>,
    pub selected_style_id: Option<String>,
    pub instruction: String,
    pub in_flight: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        if self.in_flight {
            return Phase::Generating;
        }
        if self.source_image.is_none() {
            return Phase::Idle;
        }
        if self.result.is_some() {
            return Phase::Success;
        }
        if self.last_error.is_some() {
            return Phase::Failed;
        }
        Phase::Ready
    }

    /// The instruction to send, if it is non-blank.
    pub fn instruction(&self) -> Option<&str> {
        let trimmed = self.instruction.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(self.instruction.as_str())
        }
    }

    /// Admission guard for a generation request.
    pub fn can_submit(&self) -> bool {
        self.source_image.is_some() && self.instruction().is_some() && !self.in_flight
    }
}
