//! Backend registry.
//!
//! Backends are selected once at renderer start-up by name and injected into
//! the transport layer together with the receiving end of their event
//! channel. Option strings are opaque to everything but the selected backend.

use crate::engine::OutputEngine;
use crate::error::OutputError;
use crate::events::{OutputEventReceiver, event_channel};

pub mod clock;
pub mod null;

pub use clock::ClockOutput;
pub use null::NullOutput;

/// Names of the registered backends, with a one-line description each.
pub fn available() -> &'static [(&'static str, &'static str)] {
    &[
        ("null", "Inert output, accepts everything and renders nothing"),
        ("clock", "Simulated output advancing playback in real time"),
    ]
}

/// Instantiates the backend registered under `name` with its option strings,
/// returning the engine and the receiving end of its event channel.
pub fn create(
    name: &str,
    options: &[String],
) -> Result<(Box<dyn OutputEngine>, OutputEventReceiver), OutputError> {
    let (tx, rx) = event_channel();
    let engine: Box<dyn OutputEngine> = match name {
        "null" => Box::new(NullOutput::new(tx, options)),
        "clock" => Box::new(ClockOutput::new(tx, options)?),
        other => return Err(OutputError::UnknownBackend(other.to_string())),
    };
    Ok((engine, rx))
}
