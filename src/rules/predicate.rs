//! Match predicates and their compiled form.

use regex::Regex;
use std::fmt;

use crate::error::{Result, WallpaperError};
use crate::types::TrackMetadata;

/// Which metadata field a condition looks at, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    ArtistContains,
    TitleContains,
    AlbumContains,
    AppIdContains,
    ArtistRegex,
    TitleRegex,
    AlbumRegex,
}

impl Predicate {
    /// Every predicate, in the order they are documented.
    pub const ALL: [Predicate; 7] = [
        Predicate::ArtistContains,
        Predicate::TitleContains,
        Predicate::AlbumContains,
        Predicate::AppIdContains,
        Predicate::ArtistRegex,
        Predicate::TitleRegex,
        Predicate::AlbumRegex,
    ];

    /// Returns the configuration key of the predicate.
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::ArtistContains => "artist_contains",
            Predicate::TitleContains => "title_contains",
            Predicate::AlbumContains => "album_contains",
            Predicate::AppIdContains => "app_id_contains",
            Predicate::ArtistRegex => "artist_regex",
            Predicate::TitleRegex => "title_regex",
            Predicate::AlbumRegex => "album_regex",
        }
    }

    /// Parses a predicate from its configuration key.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == key)
    }

    /// Returns true for the regex predicates.
    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            Predicate::ArtistRegex | Predicate::TitleRegex | Predicate::AlbumRegex
        )
    }

    /// Returns the metadata field this predicate tests.
    pub fn field<'a>(&self, metadata: &'a TrackMetadata) -> &'a str {
        match self {
            Predicate::ArtistContains | Predicate::ArtistRegex => &metadata.artist,
            Predicate::TitleContains | Predicate::TitleRegex => &metadata.title,
            Predicate::AlbumContains | Predicate::AlbumRegex => &metadata.album,
            Predicate::AppIdContains => &metadata.app_id,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern compiled once when the rules are loaded.
#[derive(Debug, Clone)]
enum Matcher {
    /// Lowercased needle for case-insensitive containment.
    Contains(String),
    /// Unanchored search. Case-sensitive unless the pattern says `(?i)`.
    Regex(Regex),
}

/// One predicate/pattern pair of a rule.
#[derive(Debug, Clone)]
pub struct Condition {
    pub predicate: Predicate,
    pub pattern: String,
    matcher: Matcher,
}

impl Condition {
    /// Validates and compiles a condition of the rule at `rule_index`.
    pub fn new(rule_index: usize, predicate: Predicate, pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(WallpaperError::invalid_rule(
                rule_index,
                format!("{} has an empty pattern", predicate),
            ));
        }

        let matcher = if predicate.is_regex() {
            let regex = Regex::new(&pattern)
                .map_err(|e| WallpaperError::invalid_regex(rule_index, &pattern, e))?;
            Matcher::Regex(regex)
        } else {
            Matcher::Contains(pattern.to_lowercase())
        };

        Ok(Self {
            predicate,
            pattern,
            matcher,
        })
    }

    /// Tests the condition against a snapshot.
    pub fn matches(&self, metadata: &TrackMetadata) -> bool {
        let field = self.predicate.field(metadata);
        match &self.matcher {
            Matcher::Contains(needle) => {
                !field.is_empty() && field.to_lowercase().contains(needle.as_str())
            }
            Matcher::Regex(regex) => regex.is_match(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TrackMetadata {
        TrackMetadata::new("Flashing Lights", "Kanye West", "Graduation", "Spotify.exe")
    }

    #[test]
    fn predicate_keys_round_trip() {
        for p in Predicate::ALL {
            assert_eq!(Predicate::parse(p.as_str()), Some(p));
        }
        assert_eq!(Predicate::parse("genre_contains"), None);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let c = Condition::new(0, Predicate::ArtistContains, "kanye").unwrap();
        assert!(c.matches(&track()));
        let c = Condition::new(0, Predicate::AppIdContains, "SPOTIFY").unwrap();
        assert!(c.matches(&track()));
        let c = Condition::new(0, Predicate::AlbumContains, "yeezus").unwrap();
        assert!(!c.matches(&track()));
    }

    #[test]
    fn contains_never_matches_empty_field() {
        let c = Condition::new(0, Predicate::AlbumContains, "a").unwrap();
        let mut t = track();
        t.album.clear();
        assert!(!c.matches(&t));
    }

    #[test]
    fn regex_is_unanchored_search() {
        let c = Condition::new(0, Predicate::TitleRegex, "Light").unwrap();
        assert!(c.matches(&track()));
        let c = Condition::new(0, Predicate::TitleRegex, "^Lights$").unwrap();
        assert!(!c.matches(&track()));
    }

    #[test]
    fn regex_is_case_sensitive_unless_requested() {
        let c = Condition::new(0, Predicate::ArtistRegex, "kanye").unwrap();
        assert!(!c.matches(&track()));
        let c = Condition::new(0, Predicate::ArtistRegex, "(?i)kanye").unwrap();
        assert!(c.matches(&track()));
    }

    #[test]
    fn empty_pattern_rejected() {
        let err = Condition::new(3, Predicate::TitleContains, "").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidRule);
        assert!(err.message.contains("#3"));
    }

    #[test]
    fn bad_regex_rejected_at_construction() {
        let err = Condition::new(1, Predicate::TitleRegex, "(unclosed").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidRegex);
        assert!(err.message.contains("(unclosed"));
    }
}
