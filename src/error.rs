//! Error types for whenable streams
//!
//! A stream terminates with at most one [`StreamError`]; the stored error is
//! re-delivered verbatim to every subscriber that attaches after termination.

/// Terminal error carried by an errored stream.
///
/// The error is cloned for each subscriber it is delivered to, so variants
/// keep owned, cheaply cloneable payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Producer-signaled failure with a message
    #[error("Stream error: {0}")]
    Custom(String),

    /// I/O related failure, carried by message
    #[error("IO error: {0}")]
    IO(String),
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

/// Result type for whenable-stream operations
pub type StreamResult<T> = Result<T, StreamError>;
