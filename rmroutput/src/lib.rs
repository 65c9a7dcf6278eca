//! Output-engine abstraction for RMRender.
//!
//! The renderer core never talks to a concrete playback backend directly; it
//! drives an [`OutputEngine`] — a uniform command/query surface over whatever
//! does the actual decode/render work — and consumes the engine's
//! asynchronous [`OutputEvent`] stream.
//!
//! ## Architecture
//!
//! - [`engine::OutputEngine`]: object-safe trait with the synchronous command
//!   surface (stage resource, start, stop, pause, seek, volume/mute,
//!   progress). Calls are made by the transport layer only, never
//!   concurrently with themselves.
//! - [`events::OutputEvent`]: typed events (end-of-stream, error, state
//!   change, metadata update) pushed by the backend's own execution context
//!   onto a crossbeam channel. Delivery order matches production order;
//!   nothing is guaranteed relative to in-flight command calls.
//! - [`metadata::TrackMetadata`]: the backend-neutral tag set; backends
//!   translate their own tag vocabulary through [`metadata::apply_tag`].
//! - [`backends`]: the registry that instantiates a backend by name with its
//!   opaque option strings. The selected engine is built once at start-up and
//!   injected into the transport layer.

pub mod backends;
pub mod engine;
pub mod error;
pub mod events;
pub mod metadata;

pub use engine::{EngineState, OutputEngine, Progress, clamp_volume};
pub use error::OutputError;
pub use events::{OutputEvent, OutputEventReceiver, OutputEventSender, event_channel};
pub use metadata::TrackMetadata;
