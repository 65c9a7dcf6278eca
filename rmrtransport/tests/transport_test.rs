//! Integration tests for the transport state machine, driven through a
//! scripted mock engine: commands come in through the public surface, engine
//! events are injected on a separate thread through the event channel, the
//! way a real backend delivers them.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rmrevents::names;
use rmroutput::{
    OutputEngine, OutputError, OutputEvent, OutputEventSender, Progress, TrackMetadata,
    event_channel,
};
use rmrtransport::{Transport, TransportError, TransportState};

/// Shared handles into the mock, kept by the test while the engine itself is
/// owned by the transport.
#[derive(Clone, Debug, Default)]
struct MockHandle {
    calls: Arc<Mutex<Vec<String>>>,
    progress: Arc<Mutex<Progress>>,
}

impl MockHandle {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set_progress(&self, duration_secs: u64, position_secs: u64) {
        *self.progress.lock().unwrap() = Progress {
            duration: Duration::from_secs(duration_secs),
            position: Duration::from_secs(position_secs),
        };
    }
}

#[derive(Debug)]
struct MockOutput {
    handle: MockHandle,
    volume: f32,
    mute: bool,
}

impl MockOutput {
    fn record(&self, call: impl Into<String>) {
        self.handle.calls.lock().unwrap().push(call.into());
    }
}

impl OutputEngine for MockOutput {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn set_current(
        &mut self,
        uri: &str,
        _metadata_hint: Option<&TrackMetadata>,
    ) -> Result<(), OutputError> {
        self.record(format!("set_current:{uri}"));
        Ok(())
    }

    fn set_next(&mut self, uri: &str) -> Result<(), OutputError> {
        self.record(format!("set_next:{uri}"));
        Ok(())
    }

    fn start(&mut self) -> Result<(), OutputError> {
        self.record("start");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), OutputError> {
        self.record("stop");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), OutputError> {
        self.record("pause");
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        self.record(format!("seek:{}", position.as_secs()));
        self.handle.progress.lock().unwrap().position = position;
        Ok(())
    }

    fn query_progress(&mut self) -> Progress {
        *self.handle.progress.lock().unwrap()
    }

    fn get_volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn get_mute(&self) -> bool {
        self.mute
    }

    fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }
}

fn transport_with_mock() -> (Transport, MockHandle, OutputEventSender) {
    let (tx, rx) = event_channel();
    let handle = MockHandle::default();
    let engine = MockOutput {
        handle: handle.clone(),
        volume: 1.0,
        mute: false,
    };
    (Transport::new(Box::new(engine), rx), handle, tx)
}

/// Polls until `predicate` holds, failing the test after two seconds. Event
/// application runs on the transport's own thread, so tests must wait for
/// it rather than assert immediately.
fn wait_until(mut predicate: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for: {what}");
}

#[test]
fn illegal_commands_are_rejected_and_leave_state_unchanged() {
    let (transport, handle, _tx) = transport_with_mock();

    assert!(matches!(
        transport.play(),
        Err(TransportError::TransitionNotAvailable(TransportState::NoMedia))
    ));
    assert!(matches!(
        transport.pause(),
        Err(TransportError::TransitionNotAvailable(TransportState::NoMedia))
    ));
    assert!(matches!(
        transport.stop(),
        Err(TransportError::TransitionNotAvailable(TransportState::NoMedia))
    ));
    assert_eq!(transport.transport_state(), TransportState::NoMedia);
    assert!(handle.calls().is_empty(), "engine must not be touched");

    transport.set_uri("http://example/a.flac", None).unwrap();
    assert!(matches!(
        transport.pause(),
        Err(TransportError::TransitionNotAvailable(TransportState::Stopped))
    ));
    assert_eq!(transport.transport_state(), TransportState::Stopped);
}

#[test]
fn restaging_before_play_replaces_current() {
    let (transport, _handle, _tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport
        .set_uri(
            "http://example/b.flac",
            Some(TrackMetadata {
                title: Some("B".into()),
                ..TrackMetadata::default()
            }),
        )
        .unwrap();

    assert_eq!(
        transport.current_uri().as_deref(),
        Some("http://example/b.flac")
    );
    // Metadata is cleared on restage; hints only surface through engine
    // metadata events.
    assert!(transport.current_metadata().is_empty());
    assert_eq!(transport.position_info(), Progress::default());
    assert_eq!(transport.transport_state(), TransportState::Stopped);
}

#[test]
fn gapless_hand_off_consumes_the_next_slot_once() {
    let (transport, handle, tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.set_next_uri("http://example/b.flac").unwrap();
    transport.play().unwrap();

    // Watch the hand-off from the observer's side.
    let uri_changes = Arc::new(Mutex::new(Vec::<String>::new()));
    let states = Arc::new(Mutex::new(Vec::<String>::new()));
    {
        let uri_changes = Arc::clone(&uri_changes);
        let states = Arc::clone(&states);
        transport.subscribe(Arc::new(move |name, _old, new| {
            if name == names::CURRENT_TRACK_URI {
                uri_changes.lock().unwrap().push(new.to_string());
            }
            if name == names::TRANSPORT_STATE {
                states.lock().unwrap().push(new.to_string());
            }
        }));
    }

    tx.send(OutputEvent::EndOfStream).unwrap();
    wait_until(
        || transport.current_uri().as_deref() == Some("http://example/b.flac"),
        "hand-off to the queued resource",
    );

    assert_eq!(transport.transport_state(), TransportState::Playing);
    assert_eq!(transport.next_uri(), None);
    assert_eq!(
        uri_changes.lock().unwrap().as_slice(),
        ["http://example/b.flac"],
        "exactly one started-next-stream notification"
    );
    assert_eq!(
        states.lock().unwrap().as_slice(),
        ["TRANSITIONING", "PLAYING"]
    );
    // The machine, not the adapter, performed the switch.
    let calls = handle.calls();
    assert!(calls.contains(&"set_current:http://example/b.flac".to_string()));
    assert_eq!(calls.iter().filter(|c| *c == "start").count(), 2);
}

#[test]
fn end_of_stream_without_next_stops() {
    let (transport, _handle, tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();
    tx.send(OutputEvent::EndOfStream).unwrap();

    wait_until(
        || transport.transport_state() == TransportState::Stopped,
        "stop after end of stream",
    );
    // The current reference is retained; only progress resets.
    assert_eq!(
        transport.current_uri().as_deref(),
        Some("http://example/a.flac")
    );
    assert_eq!(transport.position_info(), Progress::default());
}

#[test]
fn pause_freezes_progress_at_the_moment_of_pause() {
    let (transport, handle, _tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();
    handle.set_progress(240, 17);
    transport.pause().unwrap();

    // Time keeps passing in the engine; the cached values must not move.
    handle.set_progress(240, 99);
    let progress = transport.position_info();
    assert_eq!(progress.position, Duration::from_secs(17));
    assert_eq!(progress.duration, Duration::from_secs(240));
}

#[test]
fn error_event_forces_clean_stopped_state() {
    let (transport, _handle, tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();
    tx.send(OutputEvent::Error("decode failed".into())).unwrap();

    wait_until(
        || transport.transport_state() == TransportState::Stopped,
        "forced stop after engine error",
    );
    assert_eq!(transport.current_uri(), None);
    assert_eq!(
        transport.variables().get(names::TRANSPORT_STATUS).as_deref(),
        Some("ERROR_OCCURRED")
    );

    // No stuck state: the renderer is immediately reusable.
    transport.set_uri("http://example/b.flac", None).unwrap();
    assert_eq!(transport.transport_state(), TransportState::Stopped);
    assert_eq!(
        transport.variables().get(names::TRANSPORT_STATUS).as_deref(),
        Some("OK")
    );
    transport.play().unwrap();
    assert_eq!(transport.transport_state(), TransportState::Playing);
}

#[test]
fn restaging_while_playing_stops_the_engine_before_staging() {
    let (transport, handle, _tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();
    transport.set_uri("http://example/b.flac", None).unwrap();

    let calls = handle.calls();
    let stop = calls.iter().position(|c| c == "stop").unwrap();
    let restage = calls
        .iter()
        .position(|c| c == "set_current:http://example/b.flac")
        .unwrap();
    assert!(stop < restage, "engine must be halted before the restage");
    assert_eq!(transport.transport_state(), TransportState::Stopped);
}

#[test]
fn accepted_stop_no_op_resets_transport_status() {
    let (transport, _handle, tx) = transport_with_mock();

    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();
    tx.send(OutputEvent::Error("decode failed".into())).unwrap();
    wait_until(
        || {
            transport.variables().get(names::TRANSPORT_STATUS).as_deref()
                == Some("ERROR_OCCURRED")
        },
        "error status published",
    );

    transport.stop().unwrap();
    assert_eq!(
        transport.variables().get(names::TRANSPORT_STATUS).as_deref(),
        Some("OK")
    );
}

#[test]
fn state_variable_follows_mutation_order_under_concurrent_errors() {
    let (transport, _handle, tx) = transport_with_mock();
    let transport = Arc::new(transport);

    // Race a Play command against an injected engine error, then force one
    // final known transition. Whatever the interleaving, the last published
    // TransportState value must agree with the authoritative state.
    for _ in 0..50 {
        transport.set_uri("http://example/a.flac", None).unwrap();
        let racer = Arc::clone(&transport);
        let command = std::thread::spawn(move || {
            let _ = racer.play();
        });
        tx.send(OutputEvent::Error("transient".into())).unwrap();
        command.join().unwrap();

        tx.send(OutputEvent::Error("transient".into())).unwrap();
        wait_until(
            || {
                transport.variables().get(names::TRANSPORT_STATE).as_deref()
                    == Some("STOPPED")
            },
            "final stop published",
        );
        assert_eq!(transport.transport_state(), TransportState::Stopped);
        assert_eq!(
            transport.variables().get(names::TRANSPORT_STATE).as_deref(),
            Some("STOPPED")
        );
    }
}

#[test]
fn seek_is_rejected_without_a_seekable_resource() {
    let (transport, handle, _tx) = transport_with_mock();

    assert!(matches!(
        transport.seek(Duration::from_secs(10)),
        Err(TransportError::IllegalSeekTarget)
    ));
    transport.set_uri("http://example/a.flac", None).unwrap();
    assert!(matches!(
        transport.seek(Duration::from_secs(10)),
        Err(TransportError::IllegalSeekTarget)
    ));
    assert!(
        !handle.calls().iter().any(|c| c.starts_with("seek")),
        "rejected seeks must not reach the adapter"
    );

    transport.play().unwrap();
    transport.seek(Duration::from_secs(10)).unwrap();
    assert!(handle.calls().contains(&"seek:10".to_string()));
    assert_eq!(transport.position_info().position, Duration::from_secs(10));
}

#[test]
fn metadata_events_merge_and_notify_once_per_change() {
    let (transport, _handle, tx) = transport_with_mock();
    transport.set_uri("http://example/a.flac", None).unwrap();
    transport.play().unwrap();

    let notifications = Arc::new(Mutex::new(0usize));
    {
        let notifications = Arc::clone(&notifications);
        transport.subscribe(Arc::new(move |name, _, _| {
            if name == names::CURRENT_TRACK_METADATA {
                *notifications.lock().unwrap() += 1;
            }
        }));
    }

    tx.send(OutputEvent::MetadataUpdated(TrackMetadata {
        title: Some("Song".into()),
        artist: Some("Band".into()),
        ..TrackMetadata::default()
    }))
    .unwrap();
    wait_until(
        || transport.current_metadata().title.is_some(),
        "metadata merge",
    );
    // Two fields changed, one aggregated notification.
    assert_eq!(*notifications.lock().unwrap(), 1);

    // Partial update: only the title changes, the artist is retained.
    tx.send(OutputEvent::MetadataUpdated(TrackMetadata {
        title: Some("Song (live)".into()),
        ..TrackMetadata::default()
    }))
    .unwrap();
    wait_until(
        || transport.current_metadata().title.as_deref() == Some("Song (live)"),
        "partial metadata merge",
    );
    let metadata = transport.current_metadata();
    assert_eq!(metadata.artist.as_deref(), Some("Band"));
    assert_eq!(*notifications.lock().unwrap(), 2);

    // Re-sending identical tags is a no-op, no notification.
    tx.send(OutputEvent::MetadataUpdated(TrackMetadata {
        title: Some("Song (live)".into()),
        ..TrackMetadata::default()
    }))
    .unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(*notifications.lock().unwrap(), 2);
}

#[test]
fn stop_is_an_accepted_no_op_when_already_stopped() {
    let (transport, handle, _tx) = transport_with_mock();
    transport.set_uri("http://example/a.flac", None).unwrap();

    transport.stop().unwrap();
    assert_eq!(transport.transport_state(), TransportState::Stopped);
    assert!(!handle.calls().contains(&"stop".to_string()));
}

#[test]
fn volume_and_mute_publish_scaled_variables() {
    let (transport, _handle, _tx) = transport_with_mock();

    transport.set_volume(0.5).unwrap();
    assert_eq!(
        transport.variables().get(names::VOLUME).as_deref(),
        Some("50")
    );
    transport.set_volume(7.5).unwrap();
    assert_eq!(
        transport.variables().get(names::VOLUME).as_deref(),
        Some("100"),
        "out-of-range volume is clamped, not rejected"
    );

    transport.set_mute(true).unwrap();
    assert_eq!(transport.variables().get(names::MUTE).as_deref(), Some("1"));
    assert!(transport.mute());
}

#[test]
fn startup_seeds_the_full_variable_picture() {
    let (transport, _handle, _tx) = transport_with_mock();
    let snapshot = transport.variables().snapshot();

    for name in [
        names::TRANSPORT_STATE,
        names::TRANSPORT_STATUS,
        names::CURRENT_TRACK_URI,
        names::NEXT_TRACK_URI,
        names::CURRENT_TRACK_METADATA,
        names::CURRENT_TRACK_DURATION,
        names::VOLUME,
        names::MUTE,
    ] {
        assert!(snapshot.contains_key(name), "missing seed for {name}");
    }
    assert_eq!(
        snapshot.get(names::TRANSPORT_STATE).map(String::as_str),
        Some("NO_MEDIA_PRESENT")
    );
}
