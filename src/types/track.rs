//! Track metadata snapshots and artifact keys.
//!
//! A [`TrackMetadata`] is what a media source reports for the session that is
//! currently playing. Snapshots carry no identity of their own: two snapshots
//! are the same track when all their fields are equal.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A snapshot of the currently playing media track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title.
    #[serde(default)]
    pub title: String,

    /// Track artist (possibly several, joined by the player).
    #[serde(default)]
    pub artist: String,

    /// Album title.
    #[serde(default)]
    pub album: String,

    /// Identifier of the reporting application, e.g. "Spotify.exe" or "spotify".
    #[serde(default)]
    pub app_id: String,

    /// Whether the session is currently playing (as opposed to paused/stopped).
    #[serde(default = "default_is_playing")]
    pub is_playing: bool,
}

fn default_is_playing() -> bool {
    true
}

impl TrackMetadata {
    /// Creates a playing snapshot with trimmed fields.
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            app_id: app_id.into(),
            is_playing: true,
        }
        .trimmed()
    }

    /// Returns the same snapshot with the playing flag replaced.
    pub fn with_playing(mut self, is_playing: bool) -> Self {
        self.is_playing = is_playing;
        self
    }

    /// Strips surrounding whitespace from every text field.
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            artist: self.artist.trim().to_string(),
            album: self.album.trim().to_string(),
            app_id: self.app_id.trim().to_string(),
            is_playing: self.is_playing,
        }
    }

    /// Returns true if at least one of title, artist or album is set.
    ///
    /// Players report an all-empty snapshot while no track is loaded.
    pub fn has_content(&self) -> bool {
        !(self.title.is_empty() && self.artist.is_empty() && self.album.is_empty())
    }
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} by {:?}", self.title, self.artist)?;
        if !self.album.is_empty() {
            write!(f, " on {:?}", self.album)?;
        }
        if !self.app_id.is_empty() {
            write!(f, " [{}]", self.app_id)?;
        }
        Ok(())
    }
}

/// Opaque key identifying the rendered content of a wallpaper.
///
/// Two renders with equal keys produce the same image, so the second one
/// never needs to reach the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Returns the key as a 16-character hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes a deterministic artifact key from the parts that affect rendering.
///
/// The key is the first 16 hex characters of the SHA256 hash of the parts
/// joined by the ASCII unit separator, so ("ab", "c") and ("a", "bc") differ.
pub fn compute_artifact_key<S: AsRef<str>>(parts: &[S]) -> ArtifactKey {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_ref().as_bytes());
    }
    let result = hasher.finalize();
    ArtifactKey(hex::encode(&result[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_fields() {
        let track = TrackMetadata::new("  Midnight ", "Artist\n", "", " spotify ");
        assert_eq!(track.title, "Midnight");
        assert_eq!(track.artist, "Artist");
        assert_eq!(track.app_id, "spotify");
        assert!(track.is_playing);
    }

    #[test]
    fn has_content() {
        assert!(TrackMetadata::new("t", "", "", "").has_content());
        assert!(!TrackMetadata::new("", "", "", "app").has_content());
    }

    #[test]
    fn deserialize_with_defaults() {
        let track: TrackMetadata = serde_json::from_str(r#"{"title": "Stronger"}"#).unwrap();
        assert_eq!(track.title, "Stronger");
        assert_eq!(track.artist, "");
        assert!(track.is_playing);

        let paused: TrackMetadata =
            serde_json::from_str(r#"{"title": "Stronger", "is_playing": false}"#).unwrap();
        assert!(!paused.is_playing);
    }

    #[test]
    fn equality_covers_playing_flag() {
        let a = TrackMetadata::new("t", "a", "b", "app");
        let b = a.clone().with_playing(false);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn display_names_track() {
        let track = TrackMetadata::new("Stronger", "Kanye West", "Graduation", "Spotify.exe");
        let text = track.to_string();
        assert!(text.contains("Stronger"));
        assert!(text.contains("Kanye West"));
        assert!(text.contains("Spotify.exe"));
    }

    #[test]
    fn artifact_key_deterministic() {
        let k1 = compute_artifact_key(&["overlay", "bg.jpg", "Midnight"]);
        let k2 = compute_artifact_key(&["overlay", "bg.jpg", "Midnight"]);
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 16);
        assert!(k1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn artifact_key_separates_parts() {
        let k1 = compute_artifact_key(&["ab", "c"]);
        let k2 = compute_artifact_key(&["a", "bc"]);
        assert_ne!(k1, k2);
    }
}
