pub mod session;
pub mod stats;

pub use session::{RecordingSession, TIMER_RESOLUTION};
pub use stats::{format_elapsed, RecordingEvent, RecordingStats};
