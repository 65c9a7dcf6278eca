//! Transport state machine for RMRender.
//!
//! This crate owns the renderer's authoritative playback state. It sits
//! between two independent sources of truth:
//!
//! - **commands**, arriving synchronously from the control protocol layer
//!   (play, pause, stop, seek, set URI, volume);
//! - **events**, arriving asynchronously and unordered from the output
//!   engine's own execution context (end-of-stream, errors, tags).
//!
//! Both are reconciled under a single critical section, so a command never
//! observes a half-applied event and vice versa. Every externally visible
//! change is pushed through an evented variable set ([`rmrevents`]) that the
//! protocol layer forwards to remote subscribers.
//!
//! ## Architecture
//!
//! [`Transport`] holds the state, the current/queued-next media references,
//! the cached playback progress, and the metadata store behind one mutex; the
//! injected [`OutputEngine`](rmroutput::OutputEngine) lives behind the same
//! mutex so adapter calls are naturally serialized. A dedicated thread drains
//! the engine's event channel and applies each event under the same lock.

pub mod error;
pub mod machine;
pub mod state;
pub mod time_utils;

pub use error::TransportError;
pub use machine::Transport;
pub use rmroutput::{Progress, TrackMetadata};
pub use state::{MediaReference, TransportState};
