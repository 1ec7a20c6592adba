mod reducer;
mod state;

pub use reducer::{reduce, SessionEvent};
pub use state::{Phase, SessionState};
