pub mod session;

pub use session::{PlaybackEvent, PlaybackSession, SpeakOptions};
