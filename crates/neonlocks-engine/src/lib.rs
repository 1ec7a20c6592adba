pub mod config;
pub mod editor;
pub mod generation;
pub mod intake;
pub mod session;

pub use config::{CredentialSource, EditorConfig};
pub use editor::{EditRequest, GeminiImageEditor, ImageEditor};
pub use generation::{GenerationError, StyleGenerator};
pub use intake::{accept_file, ImageSource, IntakeError, LocalImageFile, MemoryImageFile};
pub use session::{Session, SubmitOutcome};
