//! Inert output backend.
//!
//! Accepts every command, renders nothing, never emits events. Useful for
//! headless runs and smoke tests where the renderer must stand up without
//! any audio device.

use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{EngineState, OutputEngine, Progress, clamp_volume};
use crate::error::OutputError;
use crate::events::OutputEventSender;
use crate::metadata::TrackMetadata;

#[derive(Debug)]
pub struct NullOutput {
    state: EngineState,
    current: Option<String>,
    next: Option<String>,
    progress: Progress,
    volume: f32,
    mute: bool,
    // Held so the transport's event loop sees a live (if silent) channel.
    _events: OutputEventSender,
}

impl NullOutput {
    pub fn new(events: OutputEventSender, options: &[String]) -> Self {
        for option in options {
            warn!(target: "rmroutput", "null backend ignores option '{}'", option);
        }
        Self {
            state: EngineState::Inactive,
            current: None,
            next: None,
            progress: Progress::default(),
            volume: 1.0,
            mute: false,
            _events: events,
        }
    }
}

impl OutputEngine for NullOutput {
    fn name(&self) -> &'static str {
        "null"
    }

    fn set_current(
        &mut self,
        uri: &str,
        _metadata_hint: Option<&TrackMetadata>,
    ) -> Result<(), OutputError> {
        debug!(target: "rmroutput", "null: staging '{}'", uri);
        self.current = Some(uri.to_string());
        self.progress = Progress::default();
        self.state = EngineState::Ready;
        Ok(())
    }

    fn set_next(&mut self, uri: &str) -> Result<(), OutputError> {
        self.next = if uri.is_empty() { None } else { Some(uri.to_string()) };
        Ok(())
    }

    fn start(&mut self) -> Result<(), OutputError> {
        if self.current.is_none() {
            return Err(OutputError::EngineState("no resource staged".into()));
        }
        self.state = EngineState::Playing;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), OutputError> {
        self.state = EngineState::Ready;
        self.progress.position = Duration::ZERO;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), OutputError> {
        if self.state != EngineState::Playing {
            return Err(OutputError::EngineState("not playing".into()));
        }
        self.state = EngineState::Paused;
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        self.progress.position = position;
        Ok(())
    }

    fn query_progress(&mut self) -> Progress {
        self.progress
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[test]
    fn start_without_resource_is_rejected() {
        let (tx, _rx) = event_channel();
        let mut output = NullOutput::new(tx, &[]);
        assert!(matches!(output.start(), Err(OutputError::EngineState(_))));
        output.set_current("http://example/a.flac", None).unwrap();
        assert!(output.start().is_ok());
    }

    #[test]
    fn pause_requires_playing() {
        let (tx, _rx) = event_channel();
        let mut output = NullOutput::new(tx, &[]);
        output.set_current("http://example/a.flac", None).unwrap();
        assert!(output.pause().is_err());
        output.start().unwrap();
        assert!(output.pause().is_ok());
    }

    #[test]
    fn volume_is_clamped() {
        let (tx, _rx) = event_channel();
        let mut output = NullOutput::new(tx, &[]);
        output.set_volume(2.0);
        assert_eq!(output.get_volume(), 1.0);
        output.set_volume(-0.5);
        assert_eq!(output.get_volume(), 0.0);
    }

    #[test]
    fn empty_next_uri_clears_the_slot() {
        let (tx, _rx) = event_channel();
        let mut output = NullOutput::new(tx, &[]);
        output.set_next("http://example/b.flac").unwrap();
        assert!(output.next.is_some());
        output.set_next("").unwrap();
        assert!(output.next.is_none());
    }
}
