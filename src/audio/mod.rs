pub mod clip;
pub mod decode;
pub mod format;
pub mod level;
pub mod provider;
pub mod sim;
pub mod wav;

pub use clip::AudioClip;
pub use decode::{decode_audio, DecodedAudio};
pub use format::{negotiate_mime, ContainerFormat, DEFAULT_BIT_RATE};
pub use level::{level_from_samples, level_percent};
pub use provider::{
    AudioFrame, AudioProvider, DeviceCapabilities, EncodedChunk, MicrophoneConstraints,
    MicrophoneStream, PlaybackSink, RecorderOptions,
};
pub use sim::SimulatedAudio;
