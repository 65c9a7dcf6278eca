//! Backend-neutral track metadata and tag-vocabulary translation.
//!
//! Backends speak their own tag dialects (ID3 frames, MP4 atoms, Vorbis
//! comments, ...). The translation into the core's [`TrackMetadata`] fields
//! happens here, inside the adapter boundary, through a small fixed table —
//! the transport layer stays ignorant of any backend-specific naming.

use serde::{Deserialize, Serialize};

/// Last-observed track metadata. All fields optional.
///
/// Used both as the transport's metadata store and as the partial payload of
/// a metadata event: in the latter case only populated fields carry meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

impl TrackMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.genre.is_none()
    }

    pub fn clear(&mut self) {
        *self = TrackMetadata::default();
    }

    /// Merges a partial update field by field. Fields absent from `update`
    /// retain their prior values; a field only counts as changed when the
    /// new value differs. Returns whether anything changed.
    pub fn merge(&mut self, update: &TrackMetadata) -> bool {
        let mut changed = false;
        changed |= merge_field(&mut self.title, &update.title);
        changed |= merge_field(&mut self.artist, &update.artist);
        changed |= merge_field(&mut self.album, &update.album);
        changed |= merge_field(&mut self.genre, &update.genre);
        changed
    }

    /// Serializes to the JSON object string published as the metadata
    /// state variable.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn merge_field(field: &mut Option<String>, update: &Option<String>) -> bool {
    match update {
        Some(value) if field.as_deref() != Some(value.as_str()) => {
            *field = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Metadata field a backend tag maps onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagField {
    Title,
    Artist,
    Album,
    Genre,
}

/// Translates a backend tag name into a core metadata field.
///
/// Covers the common dialects: plain names, ID3v2 frames, MP4 atoms.
/// Unknown tags map to `None` and are dropped by the adapter.
pub fn tag_field(tag: &str) -> Option<TagField> {
    match tag {
        "title" | "TITLE" | "TIT2" | "\u{a9}nam" => Some(TagField::Title),
        "artist" | "ARTIST" | "TPE1" | "\u{a9}ART" => Some(TagField::Artist),
        "album" | "ALBUM" | "TALB" | "\u{a9}alb" => Some(TagField::Album),
        "genre" | "GENRE" | "TCON" | "\u{a9}gen" => Some(TagField::Genre),
        _ => None,
    }
}

/// Applies one raw `(tag, value)` pair to a metadata record.
///
/// Returns `true` when a field actually changed, so callers can aggregate a
/// single notification over a batch of tags.
pub fn apply_tag(meta: &mut TrackMetadata, tag: &str, value: &str) -> bool {
    let destination = match tag_field(tag) {
        Some(TagField::Title) => &mut meta.title,
        Some(TagField::Artist) => &mut meta.artist,
        Some(TagField::Album) => &mut meta.album,
        Some(TagField::Genre) => &mut meta.genre,
        None => return false,
    };
    if destination.as_deref() == Some(value) {
        return false;
    }
    *destination = Some(value.to_string());
    true
}
