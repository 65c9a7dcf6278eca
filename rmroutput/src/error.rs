use thiserror::Error;

/// Errors surfaced by output backends and the backend registry.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The backend process/device cannot be reached at all.
    #[error("output backend unavailable: {0}")]
    EngineUnavailable(String),

    /// The backend rejected a requested state transition.
    #[error("output backend rejected transition: {0}")]
    EngineState(String),

    /// A resource could not be staged because it does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A resource could not be staged because its media type is unsupported.
    #[error("unsupported media type: {0}")]
    IllegalMimeType(String),

    /// Registry lookup failed: no backend registered under that name.
    #[error("unknown output backend '{0}'")]
    UnknownBackend(String),

    /// A backend-specific option string could not be parsed.
    #[error("invalid backend option '{0}'")]
    InvalidOption(String),
}
