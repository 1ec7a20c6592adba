use crate::encoded::EncodedImage;
use crate::styles::CUSTOM_STYLE_ID;

use super::state::SessionState;

/// Everything that can happen to a session.
///
/// Completions are applied in the order they arrive; a late completion from
/// an earlier request overwrites a newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ImageSelected(EncodedImage),
    StyleSelected { id: String, prompt: String },
    CustomPromptEdited(String),
    GenerationStarted,
    GenerationSucceeded(EncodedImage),
    GenerationFailed(String),
    GenerationFinished,
    ResultReset,
    Cleared,
}

/// Pure transition function.
///
/// `GenerationStarted` is ignored unless [`SessionState::can_submit`] holds, so
/// a rejected submit leaves the state untouched.
pub fn reduce(state: &SessionState, event: SessionEvent) -> SessionState {
    let mut next = state.clone();
    match event {
        SessionEvent::ImageSelected(image) => {
            next.source_image = Some(image);
            next.result = None;
            next.last_error = None;
        }
        SessionEvent::StyleSelected { id, prompt } => {
            if id != CUSTOM_STYLE_ID {
                next.instruction = prompt;
            }
            next.selected_style_id = Some(id);
        }
        SessionEvent::CustomPromptEdited(text) => {
            next.instruction = text;
            next.selected_style_id = Some(CUSTOM_STYLE_ID.to_string());
        }
        SessionEvent::GenerationStarted => {
            if !state.can_submit() {
                return next;
            }
            next.in_flight = true;
            next.result = None;
            next.last_error = None;
        }
        SessionEvent::GenerationSucceeded(image) => {
            next.result = Some(image);
        }
        SessionEvent::GenerationFailed(message) => {
            next.last_error = Some(message);
        }
        SessionEvent::GenerationFinished => {
            next.in_flight = false;
        }
        SessionEvent::ResultReset => {
            next.result = None;
            next.last_error = None;
        }
        SessionEvent::Cleared => return SessionState::default(),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;

    fn source() -> EncodedImage {
        EncodedImage::from_bytes("image/jpeg", b"portrait")
    }

    fn ready_with(instruction: &str) -> SessionState {
        let state = reduce(&SessionState::default(), SessionEvent::ImageSelected(source()));
        reduce(&state, SessionEvent::CustomPromptEdited(instruction.to_string()))
    }

    #[test]
    fn image_selection_clears_result_and_error() {
        let mut state = ready_with("buzz cut");
        state.result = Some(EncodedImage::from_data_uri("ZZZZ"));
        state.last_error = Some("old".to_string());

        let replacement = EncodedImage::from_bytes("image/png", b"other");
        let next = reduce(&state, SessionEvent::ImageSelected(replacement.clone()));
        assert_eq!(next.source_image, Some(replacement));
        assert!(next.result.is_none());
        assert!(next.last_error.is_none());
        assert_eq!(next.instruction, "buzz cut");
        assert_eq!(next.phase(), Phase::Ready);
    }

    #[test]
    fn preset_selection_sets_instruction_but_custom_keeps_text() {
        let state = ready_with("my own idea");
        let preset = reduce(
            &state,
            SessionEvent::StyleSelected {
                id: "buzz-cut".to_string(),
                prompt: "change the hair to a very short military buzz cut".to_string(),
            },
        );
        assert_eq!(preset.selected_style_id.as_deref(), Some("buzz-cut"));
        assert_eq!(
            preset.instruction,
            "change the hair to a very short military buzz cut"
        );

        let custom = reduce(
            &state,
            SessionEvent::StyleSelected {
                id: CUSTOM_STYLE_ID.to_string(),
                prompt: "ignored".to_string(),
            },
        );
        assert_eq!(custom.selected_style_id.as_deref(), Some("custom"));
        assert_eq!(custom.instruction, "my own idea");
    }

    #[test]
    fn custom_prompt_edit_selects_custom() {
        let state = reduce(
            &SessionState::default(),
            SessionEvent::StyleSelected {
                id: "silver-fox".to_string(),
                prompt: "silver".to_string(),
            },
        );
        let next = reduce(&state, SessionEvent::CustomPromptEdited("mohawk".to_string()));
        assert_eq!(next.selected_style_id.as_deref(), Some("custom"));
        assert_eq!(next.instruction, "mohawk");
        assert_eq!(next.phase(), Phase::Idle);
    }

    #[test]
    fn generation_started_is_rejected_without_instruction() {
        let state = reduce(&SessionState::default(), SessionEvent::ImageSelected(source()));
        let next = reduce(&state, SessionEvent::GenerationStarted);
        assert_eq!(next, state);
        assert!(!next.in_flight);
    }

    #[test]
    fn generation_started_is_rejected_while_in_flight() {
        let started = reduce(&ready_with("buzz cut"), SessionEvent::GenerationStarted);
        assert!(started.in_flight);
        let again = reduce(&started, SessionEvent::GenerationStarted);
        assert_eq!(again, started);
    }

    #[test]
    fn success_path_ends_in_success_with_flag_cleared() {
        let mut state = ready_with("buzz cut");
        state.last_error = Some("previous failure".to_string());
        let state = reduce(&state, SessionEvent::GenerationStarted);
        assert_eq!(state.phase(), Phase::Generating);
        assert!(state.last_error.is_none());

        let edited = EncodedImage::from_data_uri("data:image/png;base64,ZZZZ");
        let state = reduce(&state, SessionEvent::GenerationSucceeded(edited.clone()));
        let state = reduce(&state, SessionEvent::GenerationFinished);
        assert!(!state.in_flight);
        assert_eq!(state.result, Some(edited));
        assert_eq!(state.phase(), Phase::Success);
    }

    #[test]
    fn failure_path_ends_in_failed_with_flag_cleared() {
        let state = reduce(&ready_with("buzz cut"), SessionEvent::GenerationStarted);
        let state = reduce(&state, SessionEvent::GenerationFailed("network down".to_string()));
        let state = reduce(&state, SessionEvent::GenerationFinished);
        assert!(!state.in_flight);
        assert_eq!(state.last_error.as_deref(), Some("network down"));
        assert_eq!(state.phase(), Phase::Failed);
    }

    #[test]
    fn late_completion_overwrites_newer_result() {
        let first = EncodedImage::from_data_uri("AAAA");
        let second = EncodedImage::from_data_uri("BBBB");
        let state = reduce(&ready_with("buzz cut"), SessionEvent::GenerationStarted);
        let state = reduce(&state, SessionEvent::GenerationSucceeded(second));
        let state = reduce(&state, SessionEvent::GenerationSucceeded(first.clone()));
        assert_eq!(state.result, Some(first));
    }

    #[test]
    fn reset_result_keeps_source_and_instruction() {
        let mut state = ready_with("buzz cut");
        state.result = Some(EncodedImage::from_data_uri("ZZZZ"));
        state.last_error = Some("stale".to_string());
        let next = reduce(&state, SessionEvent::ResultReset);
        assert!(next.result.is_none());
        assert!(next.last_error.is_none());
        assert_eq!(next.source_image, state.source_image);
        assert_eq!(next.instruction, "buzz cut");
        assert_eq!(next.phase(), Phase::Ready);
    }

    #[test]
    fn clear_from_any_state_is_exactly_default() {
        let ready = ready_with("buzz cut");
        let generating = reduce(&ready, SessionEvent::GenerationStarted);
        let failed = reduce(&generating, SessionEvent::GenerationFailed("x".to_string()));
        for state in [SessionState::default(), ready, generating, failed] {
            assert_eq!(reduce(&state, SessionEvent::Cleared), SessionState::default());
        }
    }
}
