//! Transport state and media references.

use rmroutput::TrackMetadata;

/// The renderer's current playback phase. Exactly one holds at any time;
/// transitions are driven only by the transport machine under its lock.
///
/// The string forms follow the AVTransport vocabulary so that observers see
/// the values a control point expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    NoMedia,
    Stopped,
    Playing,
    Paused,
    Transitioning,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::NoMedia => "NO_MEDIA_PRESENT",
            TransportState::Stopped => "STOPPED",
            TransportState::Playing => "PLAYING",
            TransportState::Paused => "PAUSED_PLAYBACK",
            TransportState::Transitioning => "TRANSITIONING",
        }
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque playable-resource locator plus an optional metadata hint.
///
/// At most two are tracked at once: `current` and the single look-ahead
/// `queued_next` slot for gapless hand-off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaReference {
    pub uri: String,
    pub metadata_hint: Option<TrackMetadata>,
}

impl MediaReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            metadata_hint: None,
        }
    }

    pub fn with_hint(uri: impl Into<String>, hint: TrackMetadata) -> Self {
        Self {
            uri: uri.into(),
            metadata_hint: Some(hint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_strings_follow_avtransport_vocabulary() {
        assert_eq!(TransportState::NoMedia.as_str(), "NO_MEDIA_PRESENT");
        assert_eq!(TransportState::Paused.as_str(), "PAUSED_PLAYBACK");
        assert_eq!(TransportState::Playing.to_string(), "PLAYING");
    }
}
