use rmroutput::OutputError;
use thiserror::Error;

use crate::state::TransportState;

/// Typed failures returned synchronously to the command caller.
///
/// The protocol layer maps these onto its own error surface (the AVTransport
/// error-code table, for UPnP). A rejected command leaves transport state
/// exactly as it was.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The command is not legal in the current transport state.
    #[error("transition not available in state {0}")]
    TransitionNotAvailable(TransportState),

    /// Seek with no seekable resource, or before any resource was set.
    #[error("illegal seek target")]
    IllegalSeekTarget,

    /// The adapter cannot reach its backend.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The adapter rejected a requested transition.
    #[error("engine rejected transition: {0}")]
    EngineState(String),

    /// Propagated from the adapter when a resource cannot be staged.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Propagated from the adapter when a resource's media type is
    /// unsupported.
    #[error("unsupported media type: {0}")]
    IllegalMimeType(String),

    /// Propagated from an error event during playback.
    #[error("read error: {0}")]
    ReadError(String),
}

impl From<OutputError> for TransportError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::EngineUnavailable(msg) => TransportError::EngineUnavailable(msg),
            OutputError::EngineState(msg) => TransportError::EngineState(msg),
            OutputError::ResourceNotFound(uri) => TransportError::ResourceNotFound(uri),
            OutputError::IllegalMimeType(mime) => TransportError::IllegalMimeType(mime),
            // Registry-time errors; if one leaks through a command path,
            // the backend is unusable.
            OutputError::UnknownBackend(msg) | OutputError::InvalidOption(msg) => {
                TransportError::EngineUnavailable(msg)
            }
        }
    }
}
