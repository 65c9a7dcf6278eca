//! Asynchronous event stream from backend to transport.
//!
//! Backends push [`OutputEvent`]s from their own execution context; the
//! transport layer consumes them on its single event-processing thread.
//! Events arrive in production order, but at arbitrary times relative to
//! command calls — a consumer must treat every event as referring to
//! "whatever the engine currently has loaded" and reconcile against its own
//! state.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::engine::EngineState;
use crate::metadata::TrackMetadata;

/// Event emitted by an output backend.
#[derive(Clone, Debug)]
pub enum OutputEvent {
    /// The current resource played to its end.
    EndOfStream,

    /// Playback failed; the message is backend-specific.
    Error(String),

    /// The backend changed rendering state. Informational only.
    StateChanged {
        previous: EngineState,
        current: EngineState,
    },

    /// The backend extracted tags from the stream. Only the populated fields
    /// carry an update; absent fields mean "no information", not "cleared".
    MetadataUpdated(TrackMetadata),
}

pub type OutputEventSender = Sender<OutputEvent>;
pub type OutputEventReceiver = Receiver<OutputEvent>;

/// Creates the backend→transport event channel.
///
/// Unbounded on purpose: backends must never block on a slow consumer, and
/// the transport drains continuously.
pub fn event_channel() -> (OutputEventSender, OutputEventReceiver) {
    unbounded()
}
