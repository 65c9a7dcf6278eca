//! The transport state machine.
//!
//! Commands validate against the current state, forward to the output
//! engine, then publish variable changes. Engine events are drained by a
//! dedicated thread and applied under the same lock, so the two entry points
//! never observe each other half-applied.
//!
//! Variable notifications are always published after the state lock is
//! released, on whatever thread triggered the change. A separate publication
//! lock, acquired while the state lock is still held, keeps notification
//! order identical to mutation order across the command and event threads;
//! it is held while listeners run, so listeners must observe and return, not
//! issue transport commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use rmrevents::{ListenerToken, VariableListener, VariableSet, names};
use rmroutput::{OutputEngine, OutputEvent, OutputEventReceiver, Progress, TrackMetadata};

use crate::error::TransportError;
use crate::state::{MediaReference, TransportState};
use crate::time_utils::format_hhmmss;

/// How often the event thread checks its stop flag while idle.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

type Updates = Vec<(&'static str, String)>;

struct Inner {
    state: TransportState,
    current: Option<MediaReference>,
    queued_next: Option<MediaReference>,
    progress: Progress,
    metadata: TrackMetadata,
    engine: Box<dyn OutputEngine>,
}

/// The renderer's transport: authoritative state, media references, progress
/// and metadata caches, and the injected output engine.
pub struct Transport {
    inner: Arc<Mutex<Inner>>,
    variables: VariableSet,
    /// Publication order lock: taken while `inner` is still held, released
    /// once the update batch has been written to the variable set. Two
    /// batches therefore publish in the order their mutations happened.
    publish_order: Arc<Mutex<()>>,
    stop_flag: Arc<AtomicBool>,
    event_thread: Option<JoinHandle<()>>,
}

impl Transport {
    /// Builds the transport around an engine and spawns the event-processing
    /// thread consuming the engine's channel.
    pub fn new(engine: Box<dyn OutputEngine>, events: OutputEventReceiver) -> Self {
        let variables = VariableSet::new();
        let volume = engine.get_volume();
        let mute = engine.get_mute();
        let inner = Arc::new(Mutex::new(Inner {
            state: TransportState::NoMedia,
            current: None,
            queued_next: None,
            progress: Progress::default(),
            metadata: TrackMetadata::default(),
            engine,
        }));
        let publish_order = Arc::new(Mutex::new(()));

        // Seed every published variable so subscribers get a full initial
        // picture and later no-op writes are recognized as such.
        variables.set(names::TRANSPORT_STATE, TransportState::NoMedia.as_str());
        variables.set(names::TRANSPORT_STATUS, "OK");
        variables.set(names::CURRENT_TRACK_URI, "");
        variables.set(names::NEXT_TRACK_URI, "");
        variables.set(
            names::CURRENT_TRACK_METADATA,
            TrackMetadata::default().to_json(),
        );
        variables.set(
            names::CURRENT_TRACK_DURATION,
            format_hhmmss(Duration::ZERO),
        );
        variables.set(names::VOLUME, volume_percent(volume));
        variables.set(names::MUTE, if mute { "1" } else { "0" });

        let event_thread = {
            let inner = Arc::clone(&inner);
            let variables = variables.clone();
            let publish_order = Arc::clone(&publish_order);
            let stop_flag = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&stop_flag);
            let handle = thread::spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    match events.recv_timeout(EVENT_POLL_INTERVAL) {
                        Ok(event) => apply_event(&inner, &variables, &publish_order, event),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });
            (stop_flag, handle)
        };

        Self {
            inner,
            variables,
            publish_order,
            stop_flag: event_thread.0,
            event_thread: Some(event_thread.1),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Stages a new primary resource. From `NoMedia` this moves to
    /// `Stopped`; while playing or paused the engine is halted first, then
    /// the new resource is staged. Changing `current` clears metadata and
    /// zeroes progress.
    pub fn set_uri(
        &self,
        uri: &str,
        metadata_hint: Option<TrackMetadata>,
    ) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let staged;
        let _order = {
            let mut inner = self.inner.lock();
            if matches!(
                inner.state,
                TransportState::Playing | TransportState::Paused | TransportState::Transitioning
            ) {
                // Best effort: the restage proceeds whether or not the
                // engine manages a clean halt.
                if let Err(err) = inner.engine.stop() {
                    debug!(target: "rmrtransport", "stop before restage failed: {}", err);
                }
                set_state(&mut inner, TransportState::Stopped, &mut updates);
            }
            staged = inner.engine.set_current(uri, metadata_hint.as_ref());
            if staged.is_ok() {
                inner.current = Some(MediaReference {
                    uri: uri.to_string(),
                    metadata_hint,
                });
                inner.metadata.clear();
                inner.progress = Progress::default();
                set_state(&mut inner, TransportState::Stopped, &mut updates);
                updates.push((names::TRANSPORT_STATUS, "OK".into()));
                updates.push((names::CURRENT_TRACK_URI, uri.to_string()));
                updates.push((names::CURRENT_TRACK_METADATA, inner.metadata.to_json()));
                updates.push((
                    names::CURRENT_TRACK_DURATION,
                    format_hhmmss(Duration::ZERO),
                ));
            }
            self.publish_order.lock()
        };
        self.publish(updates);
        staged.map_err(Into::into)
    }

    /// Stages the look-ahead resource for gapless hand-off. Legal in any
    /// state; an empty URI clears the slot. No state transition.
    pub fn set_next_uri(&self, uri: &str) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            inner.engine.set_next(uri)?;
            inner.queued_next = if uri.is_empty() {
                None
            } else {
                Some(MediaReference::new(uri))
            };
            updates.push((names::TRANSPORT_STATUS, "OK".into()));
            updates.push((names::NEXT_TRACK_URI, uri.to_string()));
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    /// Begins or resumes playback. Legal from `Stopped` and `Paused`.
    ///
    /// From `Stopped` the machine passes through an internal
    /// `Transitioning`; the state variable is only published once `Playing`
    /// is reached, so a start failure leaves no partial effects.
    pub fn play(&self) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            match inner.state {
                TransportState::Stopped => {
                    inner.state = TransportState::Transitioning;
                    if let Err(err) = inner.engine.start() {
                        inner.state = TransportState::Stopped;
                        return Err(err.into());
                    }
                    inner.state = TransportState::Playing;
                }
                TransportState::Paused => {
                    inner.engine.start()?;
                    inner.state = TransportState::Playing;
                }
                state => return Err(TransportError::TransitionNotAvailable(state)),
            }
            updates.push((names::TRANSPORT_STATUS, "OK".into()));
            updates.push((
                names::TRANSPORT_STATE,
                TransportState::Playing.as_str().into(),
            ));
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    /// Suspends playback. Legal only from `Playing`.
    ///
    /// Progress is refreshed one last time before the engine suspends, so
    /// queries while paused return the position at the moment of pause.
    pub fn pause(&self) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            if inner.state != TransportState::Playing {
                return Err(TransportError::TransitionNotAvailable(inner.state));
            }
            inner.progress = inner.engine.query_progress();
            inner.engine.pause()?;
            set_state(&mut inner, TransportState::Paused, &mut updates);
            updates.push((names::TRANSPORT_STATUS, "OK".into()));
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    /// Halts playback and resets progress. Legal from `Playing`, `Paused`
    /// and `Transitioning`; an accepted no-op from `Stopped`.
    pub fn stop(&self) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            match inner.state {
                TransportState::Playing
                | TransportState::Paused
                | TransportState::Transitioning => {
                    inner.engine.stop()?;
                    inner.progress = Progress::default();
                    set_state(&mut inner, TransportState::Stopped, &mut updates);
                    updates.push((names::TRANSPORT_STATUS, "OK".into()));
                    updates.push((
                        names::CURRENT_TRACK_DURATION,
                        format_hhmmss(Duration::ZERO),
                    ));
                }
                // Accepted no-op, but still an accepted command: the status
                // variable recovers from a prior engine error.
                TransportState::Stopped => {
                    updates.push((names::TRANSPORT_STATUS, "OK".into()));
                }
                TransportState::NoMedia => {
                    return Err(TransportError::TransitionNotAvailable(inner.state));
                }
            }
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    /// Relocates within the current resource. Legal while `Playing` or
    /// `Paused`; rejected mid-hand-off, and an [`IllegalSeekTarget`]
    /// before any resource is playing.
    ///
    /// [`IllegalSeekTarget`]: TransportError::IllegalSeekTarget
    pub fn seek(&self, position: Duration) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        match inner.state {
            TransportState::Playing | TransportState::Paused => {
                inner.engine.seek(position)?;
                // The engine flushed; reflect the new position immediately
                // rather than waiting for the next progress refresh.
                inner.progress.position = position;
                Ok(())
            }
            TransportState::Transitioning => {
                Err(TransportError::TransitionNotAvailable(inner.state))
            }
            TransportState::NoMedia | TransportState::Stopped => {
                Err(TransportError::IllegalSeekTarget)
            }
        }
    }

    /// Sets the engine volume (clamped to `[0.0, 1.0]`) and publishes the
    /// percent-scaled variable.
    pub fn set_volume(&self, volume: f32) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            inner.engine.set_volume(volume);
            updates.push((names::VOLUME, volume_percent(inner.engine.get_volume())));
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    pub fn set_mute(&self, mute: bool) -> Result<(), TransportError> {
        let mut updates = Updates::new();
        let _order = {
            let mut inner = self.inner.lock();
            inner.engine.set_mute(mute);
            updates.push((names::MUTE, if inner.engine.get_mute() { "1" } else { "0" }.into()));
            self.publish_order.lock()
        };
        self.publish(updates);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn transport_state(&self) -> TransportState {
        self.inner.lock().state
    }

    /// Current `{duration, position}`. While `Playing` this refreshes from
    /// the engine and re-caches; otherwise the cached values are returned.
    /// Engine refusals are absorbed by the adapter contract — external
    /// callers always get stale-but-plausible values, never an error.
    pub fn position_info(&self) -> Progress {
        let mut updates = Updates::new();
        let (progress, _order) = {
            let mut inner = self.inner.lock();
            if inner.state == TransportState::Playing {
                inner.progress = inner.engine.query_progress();
                updates.push((
                    names::CURRENT_TRACK_DURATION,
                    format_hhmmss(inner.progress.duration),
                ));
            }
            (inner.progress, self.publish_order.lock())
        };
        self.publish(updates);
        progress
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().engine.get_volume()
    }

    pub fn mute(&self) -> bool {
        self.inner.lock().engine.get_mute()
    }

    pub fn current_metadata(&self) -> TrackMetadata {
        self.inner.lock().metadata.clone()
    }

    pub fn current_uri(&self) -> Option<String> {
        self.inner.lock().current.as_ref().map(|r| r.uri.clone())
    }

    pub fn next_uri(&self) -> Option<String> {
        self.inner.lock().queued_next.as_ref().map(|r| r.uri.clone())
    }

    // ------------------------------------------------------------------
    // Subscription
    // ------------------------------------------------------------------

    /// Registers a listener for every published state-variable change.
    pub fn subscribe(&self, listener: VariableListener) -> ListenerToken {
        self.variables.subscribe(listener)
    }

    pub fn unsubscribe(&self, token: ListenerToken) -> bool {
        self.variables.unsubscribe(token)
    }

    /// The underlying variable set, for observers that want the current
    /// values or a full snapshot.
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    fn publish(&self, updates: Updates) {
        publish(&self.variables, updates);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.event_thread.take() {
            let _ = handle.join();
        }
    }
}

fn publish(variables: &VariableSet, updates: Updates) {
    for (name, value) in updates {
        variables.set(name, value);
    }
}

fn set_state(inner: &mut Inner, next: TransportState, updates: &mut Updates) {
    if inner.state != next {
        inner.state = next;
        updates.push((names::TRANSPORT_STATE, next.as_str().into()));
    }
}

fn volume_percent(volume: f32) -> String {
    ((volume.clamp(0.0, 1.0) * 100.0).round() as u32).to_string()
}

// ----------------------------------------------------------------------
// Event path
// ----------------------------------------------------------------------

/// Applies one engine event under the transport lock.
///
/// Events refer to "whatever the engine currently has loaded"; anything that
/// no longer matches the machine's state is logged and dropped.
fn apply_event(
    inner: &Arc<Mutex<Inner>>,
    variables: &VariableSet,
    publish_order: &Mutex<()>,
    event: OutputEvent,
) {
    let mut updates = Updates::new();
    let _order = {
        let mut inner = inner.lock();
        match event {
            OutputEvent::EndOfStream => handle_end_of_stream(&mut inner, &mut updates),
            OutputEvent::Error(message) => handle_engine_error(&mut inner, &message, &mut updates),
            OutputEvent::StateChanged { previous, current } => {
                debug!(
                    target: "rmrtransport",
                    "engine state change {:?} -> {:?}", previous, current
                );
            }
            OutputEvent::MetadataUpdated(partial) => {
                if inner.metadata.merge(&partial) {
                    updates.push((names::CURRENT_TRACK_METADATA, inner.metadata.to_json()));
                }
            }
        }
        publish_order.lock()
    };
    publish(variables, updates);
}

fn handle_end_of_stream(inner: &mut Inner, updates: &mut Updates) {
    if inner.state != TransportState::Playing {
        debug!(
            target: "rmrtransport",
            "ignoring end-of-stream in state {}", inner.state
        );
        return;
    }

    let Some(next) = inner.queued_next.take() else {
        // Nothing queued: the track simply ran out.
        inner.progress = Progress::default();
        set_state(inner, TransportState::Stopped, updates);
        updates.push((
            names::CURRENT_TRACK_DURATION,
            format_hhmmss(Duration::ZERO),
        ));
        return;
    };

    // Gapless hand-off: the machine, not the adapter, performs the switch.
    set_state(inner, TransportState::Transitioning, updates);
    updates.push((names::NEXT_TRACK_URI, String::new()));

    let staged = inner
        .engine
        .set_current(&next.uri, next.metadata_hint.as_ref())
        .and_then(|_| inner.engine.start());
    if let Err(err) = staged {
        error!(
            target: "rmrtransport",
            "gapless hand-off to '{}' failed: {}", next.uri, err
        );
        // Degrade to the error path; keep the reference so Play can retry.
        inner.current = Some(next);
        inner.metadata.clear();
        inner.progress = Progress::default();
        set_state(inner, TransportState::Stopped, updates);
        updates.push((names::TRANSPORT_STATUS, "ERROR_OCCURRED".into()));
        return;
    }

    info!(target: "rmrtransport", "started next stream: {}", next.uri);
    updates.push((names::CURRENT_TRACK_URI, next.uri.clone()));
    inner.current = Some(next);
    inner.metadata.clear();
    inner.progress = Progress::default();
    updates.push((names::CURRENT_TRACK_METADATA, inner.metadata.to_json()));
    updates.push((
        names::CURRENT_TRACK_DURATION,
        format_hhmmss(Duration::ZERO),
    ));
    set_state(inner, TransportState::Playing, updates);
}

/// An engine error is never surfaced to a caller: it forces a clean
/// `Stopped`, clears the current reference, and leaves one log record.
fn handle_engine_error(inner: &mut Inner, message: &str, updates: &mut Updates) {
    error!(target: "rmrtransport", "output engine error: {}", message);
    if let Err(err) = inner.engine.stop() {
        debug!(target: "rmrtransport", "stop after engine error failed: {}", err);
    }
    inner.current = None;
    inner.metadata.clear();
    inner.progress = Progress::default();
    set_state(inner, TransportState::Stopped, updates);
    updates.push((names::TRANSPORT_STATUS, "ERROR_OCCURRED".into()));
    updates.push((names::CURRENT_TRACK_URI, String::new()));
    updates.push((names::CURRENT_TRACK_METADATA, inner.metadata.to_json()));
    updates.push((
        names::CURRENT_TRACK_DURATION,
        format_hhmmss(Duration::ZERO),
    ));
}
