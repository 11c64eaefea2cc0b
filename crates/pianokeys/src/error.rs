//! Error types for pianokeys

use thiserror::Error;

/// Result type alias for pianokeys operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pianokeys
///
/// The input core (registry, tracker, normalizer) never produces these;
/// they come from building keyboards, loading config and talking to the host.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Note range that cannot be turned into a keyboard
    #[error("Invalid note range {low}..={high}")]
    InvalidRange { low: u8, high: u8 },

    /// MIDI backend error
    #[error("MIDI error: {0}")]
    Midi(String),

    /// JACK connection error
    #[error("JACK error: {0}")]
    Jack(#[from] jack::Error),

    /// The host event object does not support an operation
    #[error("Unsupported by host event: {0}")]
    Unsupported(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
