//! Rule sets: loading from JSON and selecting a wallpaper for a track.
//!
//! Rule file format:
//!
//! ```json
//! {
//!   "default_wallpaper": "walls/default.jpg",
//!   "rules": [
//!     {"match": {"artist_contains": "Kanye"}, "wallpaper": "walls/kanye.jpg"},
//!     {"match": {"app_id_contains": "Spotify"}, "wallpaper": "walls/spotify.jpg", "priority": 5},
//!     {"match": {"title_regex": "(?i)night"}, "wallpaper": {"overlay": "walls/stars.png"}}
//!   ]
//! }
//! ```
//!
//! A wallpaper is either a path or `{"overlay": <path | true | null>}`; the
//! overlay form draws the track text over the given background, or over the
//! render configuration's background when no path is given.

use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use crate::config::resolve_path;
use crate::error::{ErrorCode, Result, WallpaperError};
use crate::types::{ArtifactReference, TrackMetadata};

use super::predicate::{Condition, Predicate};

/// A rule mapping matching tracks to a wallpaper.
#[derive(Debug, Clone)]
pub struct MatchRule {
    /// Position in the rule file. Breaks priority ties (earliest wins).
    pub index: usize,
    /// All conditions must hold for the rule to match.
    pub conditions: Vec<Condition>,
    /// Higher priority wins among matching rules.
    pub priority: i64,
    /// Wallpaper selected when the rule wins.
    pub target: ArtifactReference,
}

impl MatchRule {
    /// Builds a rule, compiling every pattern.
    pub fn new(
        index: usize,
        conditions: Vec<(Predicate, String)>,
        priority: i64,
        target: ArtifactReference,
    ) -> Result<Self> {
        if conditions.is_empty() {
            return Err(WallpaperError::invalid_rule(index, "no match predicate given"));
        }
        let conditions = conditions
            .into_iter()
            .map(|(predicate, pattern)| Condition::new(index, predicate, pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            index,
            conditions,
            priority,
            target,
        })
    }

    /// Returns true if every condition holds for the snapshot.
    pub fn matches(&self, metadata: &TrackMetadata) -> bool {
        self.conditions.iter().all(|c| c.matches(metadata))
    }
}

/// An ordered set of rules plus the fallback wallpaper.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
    default_target: ArtifactReference,
}

impl RuleSet {
    /// Creates a rule set from already-built rules.
    ///
    /// Rules are kept in the given order; their `index` is used for tie-breaking.
    pub fn new(rules: Vec<MatchRule>, default_target: ArtifactReference) -> Self {
        Self {
            rules,
            default_target,
        }
    }

    /// Loads and validates a rule file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WallpaperError::config_not_found(path));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            WallpaperError::config_invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&text, base).map_err(|e| e.context(path.display()))
    }

    /// Parses and validates rule JSON, resolving relative paths against `base`.
    pub fn from_json_str(text: &str, base: &Path) -> Result<Self> {
        let raw: RawRuleFile = serde_json::from_str(text)
            .map_err(|e| WallpaperError::config_invalid(e.to_string()))?;

        let default_target = match raw.default_wallpaper {
            Some(target) => target
                .resolve(base)
                .map_err(|reason| WallpaperError::config_invalid(format!("default_wallpaper: {reason}")))?,
            None => {
                return Err(WallpaperError::new(
                    ErrorCode::DefaultWallpaperMissing,
                    "default_wallpaper is required",
                ))
            }
        };
        if let Some(path) = default_target.path() {
            if !path.is_file() {
                return Err(WallpaperError::default_wallpaper_missing(path));
            }
        }

        let rules = raw
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.build(index, base))
            .collect::<Result<Vec<_>>>()?;

        for rule in &rules {
            if let Some(path) = rule.target.path() {
                if !path.is_file() {
                    log::warn!(
                        "Rule #{} wallpaper does not exist yet: {} (reported when selected)",
                        rule.index,
                        path.display()
                    );
                }
            }
        }

        Ok(Self::new(rules, default_target))
    }

    /// Selects the wallpaper for a track.
    ///
    /// The matching rule with the highest priority wins; ties go to the
    /// earliest declared rule. Without a match the default is returned.
    pub fn select(&self, metadata: &TrackMetadata) -> &ArtifactReference {
        match self.winning_rule(metadata) {
            Some(rule) => &rule.target,
            None => &self.default_target,
        }
    }

    /// Returns the index of the rule `select` would use, or None for the default.
    pub fn explain(&self, metadata: &TrackMetadata) -> Option<usize> {
        self.winning_rule(metadata).map(|rule| rule.index)
    }

    fn winning_rule(&self, metadata: &TrackMetadata) -> Option<&MatchRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(metadata))
            .max_by_key(|rule| (rule.priority, Reverse(rule.index)))
    }

    /// Returns the rules in declaration order.
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Returns the fallback wallpaper.
    pub fn default_target(&self) -> &ArtifactReference {
        &self.default_target
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules (every track gets the default).
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleFile {
    default_wallpaper: Option<RawTarget>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "match")]
    conditions: serde_json::Map<String, Value>,
    wallpaper: RawTarget,
    #[serde(default)]
    priority: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Path(PathBuf),
    Overlay(RawOverlay),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverlay {
    overlay: Value,
}

impl RawTarget {
    fn resolve(self, base: &Path) -> std::result::Result<ArtifactReference, String> {
        match self {
            RawTarget::Path(path) => Ok(ArtifactReference::Static(resolve_path(base, &path))),
            RawTarget::Overlay(RawOverlay { overlay }) => match overlay {
                Value::Null | Value::Bool(true) => Ok(ArtifactReference::Overlay { background: None }),
                Value::String(path) if !path.is_empty() => Ok(ArtifactReference::Overlay {
                    background: Some(resolve_path(base, Path::new(&path))),
                }),
                other => Err(format!(
                    "overlay must be a background path, true or null, got {other}"
                )),
            },
        }
    }
}

impl RawRule {
    fn build(self, index: usize, base: &Path) -> Result<MatchRule> {
        let mut priority = self.priority.unwrap_or(0);
        let mut conditions = Vec::new();

        for (key, value) in self.conditions {
            if key == "priority" {
                priority = value.as_i64().ok_or_else(|| {
                    WallpaperError::invalid_rule(index, format!("priority must be an integer, got {value}"))
                })?;
                continue;
            }
            let predicate = Predicate::parse(&key).ok_or_else(|| {
                WallpaperError::invalid_rule(index, format!("unknown predicate {key:?}"))
            })?;
            let pattern = match value {
                Value::String(s) => s,
                other => {
                    return Err(WallpaperError::invalid_rule(
                        index,
                        format!("{key} must be a string, got {other}"),
                    ))
                }
            };
            conditions.push((predicate, pattern));
        }

        let target = self
            .wallpaper
            .resolve(base)
            .map_err(|reason| WallpaperError::invalid_rule(index, reason))?;

        MatchRule::new(index, conditions, priority, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rule(index: usize, predicate: Predicate, pattern: &str, priority: i64, target: &str) -> MatchRule {
        MatchRule::new(
            index,
            vec![(predicate, pattern.to_string())],
            priority,
            ArtifactReference::Static(PathBuf::from(target)),
        )
        .unwrap()
    }

    fn default_target() -> ArtifactReference {
        ArtifactReference::Static(PathBuf::from("default.jpg"))
    }

    fn kanye_on_spotify() -> TrackMetadata {
        TrackMetadata::new("Stronger", "Kanye West", "Graduation", "Spotify.exe")
    }

    #[test]
    fn priority_beats_declaration_order() {
        let rules = RuleSet::new(
            vec![
                rule(0, Predicate::ArtistContains, "Kanye", 0, "kanye.jpg"),
                rule(1, Predicate::AppIdContains, "Spotify", 5, "spotify.jpg"),
            ],
            default_target(),
        );
        assert_eq!(
            rules.select(&kanye_on_spotify()),
            &ArtifactReference::Static(PathBuf::from("spotify.jpg"))
        );
        assert_eq!(rules.explain(&kanye_on_spotify()), Some(1));
    }

    #[test]
    fn ties_go_to_earliest_rule() {
        let rules = RuleSet::new(
            vec![
                rule(0, Predicate::TitleContains, "nomatch", 3, "x.jpg"),
                rule(1, Predicate::ArtistContains, "kanye", 3, "first.jpg"),
                rule(2, Predicate::AppIdContains, "spotify", 3, "second.jpg"),
            ],
            default_target(),
        );
        assert_eq!(
            rules.select(&kanye_on_spotify()),
            &ArtifactReference::Static(PathBuf::from("first.jpg"))
        );
    }

    #[test]
    fn no_match_returns_default() {
        let rules = RuleSet::new(
            vec![rule(0, Predicate::ArtistContains, "Radiohead", 10, "rh.jpg")],
            default_target(),
        );
        assert_eq!(rules.select(&kanye_on_spotify()), &default_target());
        assert_eq!(rules.explain(&kanye_on_spotify()), None);

        let empty = RuleSet::new(Vec::new(), default_target());
        assert!(empty.is_empty());
        assert_eq!(empty.select(&kanye_on_spotify()), &default_target());
    }

    #[test]
    fn select_is_deterministic() {
        let rules = RuleSet::new(
            vec![
                rule(0, Predicate::ArtistRegex, "Kan.e", 1, "a.jpg"),
                rule(1, Predicate::AlbumContains, "grad", 1, "b.jpg"),
            ],
            default_target(),
        );
        let track = kanye_on_spotify();
        let first = rules.select(&track).clone();
        for _ in 0..10 {
            assert_eq!(rules.select(&track), &first);
        }
    }

    #[test]
    fn all_conditions_must_hold() {
        let both = MatchRule::new(
            0,
            vec![
                (Predicate::ArtistContains, "kanye".to_string()),
                (Predicate::TitleContains, "heartless".to_string()),
            ],
            0,
            ArtifactReference::Static(PathBuf::from("808s.jpg")),
        )
        .unwrap();
        assert!(!both.matches(&kanye_on_spotify()));
    }

    #[test]
    fn rule_without_conditions_rejected() {
        let err = MatchRule::new(2, Vec::new(), 0, default_target()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRule);
    }

    fn write_image(path: &Path) {
        image::RgbImage::new(4, 4).save(path).unwrap();
    }

    #[test]
    fn load_rule_file() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("default.jpg"));
        write_image(&dir.path().join("kanye.jpg"));
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{
                "default_wallpaper": "default.jpg",
                "rules": [
                    {"match": {"artist_contains": "Kanye"}, "wallpaper": "kanye.jpg"},
                    {"match": {"app_id_contains": "Spotify", "priority": 5}, "wallpaper": "spotify.jpg"},
                    {"match": {"title_regex": "(?i)night"}, "wallpaper": {"overlay": null}, "priority": 9}
                ]
            }"#,
        )
        .unwrap();

        let rules = RuleSet::load(&path).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules.default_target(),
            &ArtifactReference::Static(dir.path().join("default.jpg"))
        );
        assert_eq!(rules.rules()[1].priority, 5);
        assert_eq!(
            rules.select(&kanye_on_spotify()),
            &ArtifactReference::Static(dir.path().join("spotify.jpg"))
        );

        let night = TrackMetadata::new("Midnight City", "M83", "", "spotify");
        assert_eq!(
            rules.select(&night),
            &ArtifactReference::Overlay { background: None }
        );
    }

    #[test]
    fn overlay_targets() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("bg.png"));
        let rules = RuleSet::from_json_str(
            r#"{"default_wallpaper": {"overlay": "bg.png"},
                "rules": [{"match": {"album_contains": "x"}, "wallpaper": {"overlay": true}}]}"#,
            dir.path(),
        )
        .unwrap();
        assert_eq!(
            rules.default_target(),
            &ArtifactReference::Overlay {
                background: Some(dir.path().join("bg.png"))
            }
        );
        assert_eq!(
            rules.rules()[0].target,
            ArtifactReference::Overlay { background: None }
        );
    }

    #[test]
    fn missing_default_fails_fast() {
        let dir = tempdir().unwrap();
        let err = RuleSet::from_json_str(r#"{"default_wallpaper": "gone.jpg"}"#, dir.path())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DefaultWallpaperMissing);

        let err = RuleSet::from_json_str(r#"{"rules": []}"#, dir.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DefaultWallpaperMissing);
    }

    #[test]
    fn invalid_regex_fails_at_load() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("d.jpg"));
        let err = RuleSet::from_json_str(
            r#"{"default_wallpaper": "d.jpg",
                "rules": [{"match": {"title_regex": "[unclosed"}, "wallpaper": "a.jpg"}]}"#,
            dir.path(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRegex);
        assert!(err.message.contains("#0"));
    }

    #[test]
    fn invalid_rules_fail_at_load() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("d.jpg"));
        let cases = [
            r#"{"default_wallpaper": "d.jpg", "rules": [{"match": {"genre_contains": "x"}, "wallpaper": "a.jpg"}]}"#,
            r#"{"default_wallpaper": "d.jpg", "rules": [{"match": {"title_contains": ""}, "wallpaper": "a.jpg"}]}"#,
            r#"{"default_wallpaper": "d.jpg", "rules": [{"match": {}, "wallpaper": "a.jpg"}]}"#,
            r#"{"default_wallpaper": "d.jpg", "rules": [{"match": {"title_contains": 3}, "wallpaper": "a.jpg"}]}"#,
            r#"{"default_wallpaper": "d.jpg", "rules": [{"match": {"title_contains": "a"}, "wallpaper": {"overlay": 5}}]}"#,
        ];
        for case in cases {
            let err = RuleSet::from_json_str(case, dir.path()).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidRule, "{case}");
        }
    }

    #[test]
    fn malformed_json_is_config_invalid() {
        let err = RuleSet::from_json_str("{not json", Path::new(".")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);
    }

    #[test]
    fn missing_rule_file() {
        let dir = tempdir().unwrap();
        let err = RuleSet::load(&dir.path().join("rules.json")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }
}
