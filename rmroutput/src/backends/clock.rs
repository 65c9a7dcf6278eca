//! Simulated output backend.
//!
//! Plays nothing, but behaves like a real engine: a background thread
//! advances the playback position in real time while playing and reports
//! end-of-stream when the configured track duration elapses. This gives the
//! transport layer a live event stream without any audio device, which is
//! what integration tests and headless runs need.
//!
//! Options:
//! - `duration=<secs>`: simulated track length (default 300)
//! - `tick-ms=<ms>`: clock granularity (default 100)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::{EngineState, OutputEngine, Progress, clamp_volume};
use crate::error::OutputError;
use crate::events::{OutputEvent, OutputEventSender};
use crate::metadata::TrackMetadata;

const DEFAULT_TRACK_DURATION: Duration = Duration::from_secs(300);
const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Shared {
    state: EngineState,
    uri: Option<String>,
    next_uri: Option<String>,
    position: Duration,
    duration: Duration,
}

#[derive(Debug)]
pub struct ClockOutput {
    shared: Arc<Mutex<Shared>>,
    events: OutputEventSender,
    /// Metadata hint staged with the current resource, emitted once on start.
    pending_meta: Option<TrackMetadata>,
    track_duration: Duration,
    volume: f32,
    mute: bool,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ClockOutput {
    pub fn new(events: OutputEventSender, options: &[String]) -> Result<Self, OutputError> {
        let mut track_duration = DEFAULT_TRACK_DURATION;
        let mut tick = DEFAULT_TICK;
        for option in options {
            match option.split_once('=') {
                Some(("duration", secs)) => {
                    let secs: u64 = secs
                        .parse()
                        .map_err(|_| OutputError::InvalidOption(option.clone()))?;
                    track_duration = Duration::from_secs(secs);
                }
                Some(("tick-ms", ms)) => {
                    let ms: u64 = ms
                        .parse()
                        .map_err(|_| OutputError::InvalidOption(option.clone()))?;
                    tick = Duration::from_millis(ms.max(1));
                }
                _ => warn!(target: "rmroutput", "clock backend ignores option '{}'", option),
            }
        }

        let shared = Arc::new(Mutex::new(Shared {
            state: EngineState::Inactive,
            uri: None,
            next_uri: None,
            position: Duration::ZERO,
            duration: track_duration,
        }));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker = spawn_clock(Arc::clone(&shared), events.clone(), Arc::clone(&stop_flag), tick);

        Ok(Self {
            shared,
            events,
            pending_meta: None,
            track_duration,
            volume: 1.0,
            mute: false,
            stop_flag,
            worker: Some(worker),
        })
    }

    fn publish_state(&self, previous: EngineState, current: EngineState) {
        let _ = self.events.send(OutputEvent::StateChanged { previous, current });
    }
}

/// The clock thread: advances position while playing, signals end-of-stream.
fn spawn_clock(
    shared: Arc<Mutex<Shared>>,
    events: OutputEventSender,
    stop_flag: Arc<AtomicBool>,
    tick: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            thread::sleep(tick);
            let mut shared = shared.lock();
            if shared.state != EngineState::Playing {
                continue;
            }
            shared.position += tick;
            if shared.duration > Duration::ZERO && shared.position >= shared.duration {
                shared.position = shared.duration;
                shared.state = EngineState::Ready;
                if let Some(next) = shared.next_uri.take() {
                    // The consumer performs the actual hand-off on
                    // end-of-stream; the slot is spent either way.
                    debug!(target: "rmroutput", "clock: '{}' staged as next at end of stream", next);
                }
                drop(shared);
                let _ = events.send(OutputEvent::StateChanged {
                    previous: EngineState::Playing,
                    current: EngineState::Ready,
                });
                let _ = events.send(OutputEvent::EndOfStream);
            }
        }
    })
}

impl OutputEngine for ClockOutput {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn set_current(
        &mut self,
        uri: &str,
        metadata_hint: Option<&TrackMetadata>,
    ) -> Result<(), OutputError> {
        debug!(target: "rmroutput", "clock: staging '{}'", uri);
        let mut shared = self.shared.lock();
        shared.uri = Some(uri.to_string());
        shared.position = Duration::ZERO;
        shared.duration = self.track_duration;
        if shared.state == EngineState::Inactive {
            shared.state = EngineState::Ready;
        }
        drop(shared);
        self.pending_meta = metadata_hint.filter(|m| !m.is_empty()).cloned();
        Ok(())
    }

    fn set_next(&mut self, uri: &str) -> Result<(), OutputError> {
        self.shared.lock().next_uri =
            if uri.is_empty() { None } else { Some(uri.to_string()) };
        Ok(())
    }

    fn start(&mut self) -> Result<(), OutputError> {
        let previous = {
            let mut shared = self.shared.lock();
            if shared.uri.is_none() {
                return Err(OutputError::EngineState("no resource staged".into()));
            }
            let previous = shared.state;
            shared.state = EngineState::Playing;
            previous
        };
        self.publish_state(previous, EngineState::Playing);
        if let Some(meta) = self.pending_meta.take() {
            let _ = self.events.send(OutputEvent::MetadataUpdated(meta));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), OutputError> {
        let previous = {
            let mut shared = self.shared.lock();
            let previous = shared.state;
            shared.state = EngineState::Ready;
            shared.position = Duration::ZERO;
            previous
        };
        if previous != EngineState::Ready {
            self.publish_state(previous, EngineState::Ready);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), OutputError> {
        {
            let mut shared = self.shared.lock();
            if shared.state != EngineState::Playing {
                return Err(OutputError::EngineState("not playing".into()));
            }
            shared.state = EngineState::Paused;
        }
        self.publish_state(EngineState::Playing, EngineState::Paused);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        let mut shared = self.shared.lock();
        shared.position = position.min(shared.duration);
        Ok(())
    }

    fn query_progress(&mut self) -> Progress {
        // The clock never stops answering; while paused the position is
        // simply frozen, which matches the cached-last-known contract.
        let shared = self.shared.lock();
        Progress {
            duration: shared.duration,
            position: shared.position,
        }
    }

    fn get_volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    fn get_mute(&self) -> bool {
        self.mute
    }

    fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }
}

impl Drop for ClockOutput {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
