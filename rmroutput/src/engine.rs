//! The output-engine contract.

use std::time::Duration;

use crate::error::OutputError;
use crate::metadata::TrackMetadata;

/// Coarse backend rendering state, reported through
/// [`OutputEvent::StateChanged`](crate::events::OutputEvent::StateChanged).
///
/// Informational only: the transport layer keeps its own authoritative state
/// and never acts on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No rendering resources held.
    Inactive,
    /// Primed for the staged resource, not rendering.
    Ready,
    Paused,
    Playing,
}

/// Last durations/positions obtained from the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub duration: Duration,
    pub position: Duration,
}

/// Clamps a requested volume into the engine range.
///
/// Out-of-range values are clamped, not rejected; NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

/// Uniform command/query surface over a concrete playback backend.
///
/// Every method may be invoked only by the transport state machine and never
/// concurrently with itself. Implementations must keep these calls fast:
/// real blocking work (buffering, device I/O) belongs on the backend's own
/// execution context, which reports back through the event channel handed to
/// the backend at construction time.
pub trait OutputEngine: Send + std::fmt::Debug {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// Stages a new primary resource without starting playback.
    fn set_current(
        &mut self,
        uri: &str,
        metadata_hint: Option<&TrackMetadata>,
    ) -> Result<(), OutputError>;

    /// Stages the look-ahead resource for gapless hand-off; an empty URI
    /// clears the slot.
    fn set_next(&mut self, uri: &str) -> Result<(), OutputError>;

    /// Begins or resumes rendering of the current resource, priming the
    /// backend for it first when needed.
    fn start(&mut self) -> Result<(), OutputError>;

    /// Halts rendering and releases active rendering resources, retaining
    /// the staged resource reference.
    fn stop(&mut self) -> Result<(), OutputError>;

    /// Suspends rendering without releasing resources. Fails with
    /// [`OutputError::EngineState`] when not currently playing.
    fn pause(&mut self) -> Result<(), OutputError>;

    /// Relocates within the current resource. Buffered-ahead data is flushed
    /// so the next progress query reflects the new position.
    fn seek(&mut self, position: Duration) -> Result<(), OutputError>;

    /// Best-effort progress query. When the backend cannot answer in its
    /// current internal state (e.g. while paused), the last cached values
    /// are returned instead of an error.
    fn query_progress(&mut self) -> Progress;

    fn get_volume(&self) -> f32;

    /// Sets the volume; values outside `[0.0, 1.0]` are clamped.
    fn set_volume(&mut self, volume: f32);

    fn get_mute(&self) -> bool;

    fn set_mute(&mut self, mute: bool);
}
