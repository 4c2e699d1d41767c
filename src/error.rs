//! Error types for the voice subsystem

use thiserror::Error;

use crate::audio::ContainerFormat;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Classified microphone permission failure.
///
/// Mirrors the distinctions a runtime reports when a stream cannot be
/// acquired, so callers can show a targeted remedy instead of a generic
/// failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDenial {
    /// The user (or a platform policy) refused microphone access
    Denied,
    /// No usable input device is present
    DeviceNotFound,
    /// The device exists but another application holds it
    DeviceBusy,
    /// Anything else the runtime reported
    Other(String),
}

impl PermissionDenial {
    /// Short user-facing suggestion for getting past this denial.
    pub fn remedy(&self) -> &str {
        match self {
            PermissionDenial::Denied => {
                "Microphone access was denied. Allow microphone use in your device settings."
            }
            PermissionDenial::DeviceNotFound => {
                "No microphone was found. Connect one and try again."
            }
            PermissionDenial::DeviceBusy => {
                "The microphone is in use by another application. Close it and try again."
            }
            PermissionDenial::Other(_) => "Microphone access failed. Check your audio settings.",
        }
    }
}

impl std::fmt::Display for PermissionDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionDenial::Denied => write!(f, "permission denied"),
            PermissionDenial::DeviceNotFound => write!(f, "no input device found"),
            PermissionDenial::DeviceBusy => write!(f, "input device busy"),
            PermissionDenial::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Errors that can occur in the voice subsystem
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Required audio capabilities missing: {0}")]
    CapabilityMissing(String),

    #[error("Microphone permission failure: {0}")]
    Permission(PermissionDenial),

    #[error("No encodable MIME type for {format} (tried: {})", .tried.join(", "))]
    UnsupportedFormat {
        format: ContainerFormat,
        tried: Vec<String>,
    },

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Recording produced no data")]
    EmptyRecording,

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Pronunciation analysis error: {0}")]
    Analysis(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Grab the permission classification, if this is a permission failure.
    pub fn as_permission_denial(&self) -> Option<&PermissionDenial> {
        match self {
            VoiceError::Permission(denial) => Some(denial),
            _ => None,
        }
    }
}
