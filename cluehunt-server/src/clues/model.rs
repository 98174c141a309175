//! Clue and game configuration types
//!
//! [`ClueRecord`] is the on-disk shape of a clue (camelCase JSON, legacy
//! field names accepted). It is normalized into a [`Clue`] exactly once, when
//! the file is loaded or an admin edit is applied, so the engine never
//! re-derives the validation mode per request.

use crate::geofence::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Maximum hints per hint list
pub const MAX_HINTS: usize = 3;

/// Radius given to clues created without one
pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

/// Which proofs a clue requires before a team may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Matching photo
    Photo,
    /// Correct answer
    Qa,
    /// Photo and answer, in any order
    Both,
    /// Photo or answer
    Either,
}

impl ValidationMode {
    /// Resolve the mode from an explicit value or the legacy flags
    ///
    /// Without an explicit mode: both flags → `Both`, only `require_qa` →
    /// `Qa`, anything else → `Photo`. `require_photo` defaults to true and
    /// `require_qa` to false.
    pub fn resolve(
        explicit: Option<ValidationMode>,
        require_photo: Option<bool>,
        require_qa: Option<bool>,
    ) -> Self {
        if let Some(mode) = explicit {
            return mode;
        }
        match (require_photo.unwrap_or(true), require_qa.unwrap_or(false)) {
            (true, true) => ValidationMode::Both,
            (false, true) => ValidationMode::Qa,
            _ => ValidationMode::Photo,
        }
    }

    pub fn requires_photo(self) -> bool {
        matches!(
            self,
            ValidationMode::Photo | ValidationMode::Both | ValidationMode::Either
        )
    }

    pub fn requires_qa(self) -> bool {
        matches!(
            self,
            ValidationMode::Qa | ValidationMode::Both | ValidationMode::Either
        )
    }
}

/// Hint kinds, each with its own list and cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    Generic,
    Photo,
    Answer,
}

/// Progressive hints for one clue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HintSet {
    pub generic: Vec<String>,
    pub photo_failure: Vec<String>,
    pub answer_failure: Vec<String>,
}

impl HintSet {
    pub fn list(&self, kind: HintKind) -> &[String] {
        match kind {
            HintKind::Generic => &self.generic,
            HintKind::Photo => &self.photo_failure,
            HintKind::Answer => &self.answer_failure,
        }
    }
}

/// A location-bound challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClueRecord", into = "ClueRecord")]
pub struct Clue {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub radius_meters: f64,
    pub mode: ValidationMode,
    /// Legacy flags, kept for the public summary
    pub require_photo: bool,
    pub require_qa: bool,
    /// Path relative to the data folder
    pub reference_image: Option<String>,
    pub question: String,
    pub expected_answer: String,
    pub hints: HintSet,
    pub success_message: String,
    pub next_clue_id: Option<String>,
}

/// On-disk representation of a clue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_mode: Option<ValidationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_photo: Option<bool>,
    #[serde(default, rename = "requireQA", skip_serializing_if = "Option::is_none")]
    pub require_qa: Option<bool>,
    #[serde(default, alias = "imagePath", skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub expected_answer: String,
    #[serde(default, alias = "hints")]
    pub hints_generic: Vec<String>,
    #[serde(default, alias = "hintsPhoto")]
    pub hints_photo_failure: Vec<String>,
    #[serde(default, alias = "hintsAnswer")]
    pub hints_answer_failure: Vec<String>,
    #[serde(default, alias = "hint")]
    pub success_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_clue_id: Option<String>,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

/// Drop blank entries and enforce the per-list cap
fn clean_hints(clue_id: &str, kind: &str, hints: Vec<String>) -> Result<Vec<String>, String> {
    let hints: Vec<String> = hints
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if hints.len() > MAX_HINTS {
        return Err(format!(
            "clue '{}' has {} {} hints, at most {} allowed",
            clue_id,
            hints.len(),
            kind,
            MAX_HINTS
        ));
    }
    Ok(hints)
}

impl TryFrom<ClueRecord> for Clue {
    type Error = String;

    fn try_from(record: ClueRecord) -> Result<Self, Self::Error> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err("clue id must not be empty".to_string());
        }
        if !(record.radius_meters.is_finite() && record.radius_meters > 0.0) {
            return Err(format!(
                "clue '{}' radiusMeters must be a positive number, got {}",
                id, record.radius_meters
            ));
        }
        if !(-90.0..=90.0).contains(&record.lat) || !(-180.0..=180.0).contains(&record.lng) {
            return Err(format!(
                "clue '{}' has out-of-range coordinates ({}, {})",
                id, record.lat, record.lng
            ));
        }

        let mode = ValidationMode::resolve(
            record.validation_mode,
            record.require_photo,
            record.require_qa,
        );

        let hints = HintSet {
            generic: clean_hints(&id, "generic", record.hints_generic)?,
            photo_failure: clean_hints(&id, "photo", record.hints_photo_failure)?,
            answer_failure: clean_hints(&id, "answer", record.hints_answer_failure)?,
        };

        let next_clue_id = record
            .next_clue_id
            .map(|next| next.trim().to_string())
            .filter(|next| !next.is_empty());

        Ok(Clue {
            name: if record.name.trim().is_empty() {
                id.clone()
            } else {
                record.name
            },
            id,
            location: GeoPoint::new(record.lat, record.lng),
            radius_meters: record.radius_meters,
            mode,
            require_photo: record.require_photo.unwrap_or(true),
            require_qa: record.require_qa.unwrap_or(false),
            reference_image: record.reference_image.filter(|p| !p.trim().is_empty()),
            question: record.question,
            expected_answer: record.expected_answer,
            hints,
            success_message: record.success_message,
            next_clue_id,
        })
    }
}

impl From<Clue> for ClueRecord {
    fn from(clue: Clue) -> Self {
        ClueRecord {
            id: clue.id,
            name: clue.name,
            lat: clue.location.lat,
            lng: clue.location.lng,
            radius_meters: clue.radius_meters,
            validation_mode: Some(clue.mode),
            require_photo: Some(clue.require_photo),
            require_qa: Some(clue.require_qa),
            reference_image: clue.reference_image,
            question: clue.question,
            expected_answer: clue.expected_answer,
            hints_generic: clue.hints.generic,
            hints_photo_failure: clue.hints.photo_failure,
            hints_answer_failure: clue.hints.answer_failure,
            success_message: clue.success_message,
            next_clue_id: clue.next_clue_id,
        }
    }
}

/// Whole persisted game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub start_clue_id: String,
    #[serde(default)]
    pub clues: Vec<Clue>,
    #[serde(default)]
    pub wrong_image_tips: Vec<String>,
    #[serde(default)]
    pub wrong_answer_tips: Vec<String>,
}

impl GameConfig {
    /// Single-clue config written when no config file exists yet
    pub fn sample() -> Self {
        let clue = Clue {
            id: "start".to_string(),
            name: "Town Square Fountain".to_string(),
            location: GeoPoint::new(51.5007, -0.1246),
            radius_meters: DEFAULT_RADIUS_METERS,
            mode: ValidationMode::Photo,
            require_photo: true,
            require_qa: false,
            reference_image: Some("assets/clues/start.jpg".to_string()),
            question: String::new(),
            expected_answer: String::new(),
            hints: HintSet {
                generic: vec!["Look for running water.".to_string()],
                ..Default::default()
            },
            success_message: "Well done, you found the fountain!".to_string(),
            next_clue_id: None,
        };
        GameConfig {
            start_clue_id: clue.id.clone(),
            clues: vec![clue],
            wrong_image_tips: Vec::new(),
            wrong_answer_tips: Vec::new(),
        }
    }
}

/// Read-only view of a [`GameConfig`] with clues indexed by id
///
/// Requests hold one `Arc<ClueGraph>` for their whole duration, so an admin
/// edit landing mid-request is never half-visible.
#[derive(Debug, Clone)]
pub struct ClueGraph {
    config: GameConfig,
    index: HashMap<String, usize>,
}

impl ClueGraph {
    /// Index and validate a configuration
    ///
    /// Clue ids must be unique and a non-empty clue set needs a start clue
    /// that exists. Dangling `nextClueId` pointers are tolerated (teams
    /// advancing from such a clue stay in place) but logged.
    pub fn new(config: GameConfig) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(config.clues.len());
        for (position, clue) in config.clues.iter().enumerate() {
            if index.insert(clue.id.clone(), position).is_some() {
                return Err(format!("duplicate clue id '{}'", clue.id));
            }
        }

        if !config.clues.is_empty() && !index.contains_key(&config.start_clue_id) {
            return Err(format!(
                "start clue '{}' does not exist",
                config.start_clue_id
            ));
        }

        for clue in &config.clues {
            if let Some(next) = &clue.next_clue_id {
                if !index.contains_key(next) {
                    warn!(
                        clue_id = %clue.id,
                        next_clue_id = %next,
                        "nextClueId points at a missing clue; teams will stay in place"
                    );
                }
            }
        }

        Ok(Self { config, index })
    }

    pub fn clue(&self, id: &str) -> Option<&Clue> {
        self.index.get(id).map(|&position| &self.config.clues[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn start_clue_id(&self) -> &str {
        &self.config.start_clue_id
    }

    pub fn clues(&self) -> &[Clue] {
        &self.config.clues
    }

    pub fn wrong_image_tips(&self) -> &[String] {
        &self.config.wrong_image_tips
    }

    pub fn wrong_answer_tips(&self) -> &[String] {
        &self.config.wrong_answer_tips
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Successor of `clue` if it points at a clue that exists
    pub fn successor(&self, clue: &Clue) -> Option<&Clue> {
        clue.next_clue_id.as_deref().and_then(|next| self.clue(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_resolution_from_legacy_flags() {
        assert_eq!(ValidationMode::resolve(None, None, None), ValidationMode::Photo);
        assert_eq!(
            ValidationMode::resolve(None, Some(true), Some(true)),
            ValidationMode::Both
        );
        assert_eq!(
            ValidationMode::resolve(None, Some(false), Some(true)),
            ValidationMode::Qa
        );
        assert_eq!(
            ValidationMode::resolve(None, Some(false), Some(false)),
            ValidationMode::Photo
        );
        assert_eq!(
            ValidationMode::resolve(Some(ValidationMode::Either), Some(false), Some(false)),
            ValidationMode::Either
        );
    }

    #[test]
    fn test_mode_requirements() {
        assert!(ValidationMode::Either.requires_photo());
        assert!(ValidationMode::Either.requires_qa());
        assert!(!ValidationMode::Qa.requires_photo());
        assert!(!ValidationMode::Photo.requires_qa());
    }

    #[test]
    fn test_legacy_clue_json_is_accepted() {
        let clue: Clue = serde_json::from_value(json!({
            "id": "bridge",
            "name": "Old Bridge",
            "lat": 50.0,
            "lng": 8.0,
            "radiusMeters": 30,
            "imagePath": "assets/clues/bridge.jpg",
            "hint": "You crossed it!",
            "requireQA": true,
            "question": "How many arches?",
            "expectedAnswer": "seven",
            "hints": ["Count carefully", ""],
            "hintsAnswer": ["It's odd"],
            "nextClueId": "tower"
        }))
        .unwrap();

        assert_eq!(clue.mode, ValidationMode::Both);
        assert_eq!(clue.reference_image.as_deref(), Some("assets/clues/bridge.jpg"));
        assert_eq!(clue.success_message, "You crossed it!");
        assert_eq!(clue.hints.generic, vec!["Count carefully".to_string()]);
        assert_eq!(clue.hints.answer_failure.len(), 1);
        assert_eq!(clue.next_clue_id.as_deref(), Some("tower"));
    }

    #[test]
    fn test_serialized_clue_carries_explicit_mode() {
        let clue = GameConfig::sample().clues.remove(0);
        let json = serde_json::to_value(&clue).unwrap();
        assert_eq!(json["validationMode"], "photo");
        assert_eq!(json["radiusMeters"], 50.0);
        assert!(json.get("nextClueId").is_none());
    }

    #[test]
    fn test_non_positive_radius_rejected() {
        let result: Result<Clue, _> = serde_json::from_value(json!({
            "id": "x", "lat": 0.0, "lng": 0.0, "radiusMeters": 0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_too_many_hints_rejected() {
        let result: Result<Clue, _> = serde_json::from_value(json!({
            "id": "x", "lat": 0.0, "lng": 0.0,
            "hints": ["a", "b", "c", "d"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_graph_rejects_duplicate_ids_and_missing_start() {
        let mut config = GameConfig::sample();
        config.clues.push(config.clues[0].clone());
        assert!(ClueGraph::new(config).is_err());

        let mut config = GameConfig::sample();
        config.start_clue_id = "nowhere".to_string();
        assert!(ClueGraph::new(config).is_err());
    }

    #[test]
    fn test_dangling_successor_resolves_to_none() {
        let mut config = GameConfig::sample();
        config.clues[0].next_clue_id = Some("missing".to_string());
        let graph = ClueGraph::new(config).unwrap();
        let clue = graph.clue("start").unwrap();
        assert!(graph.successor(clue).is_none());
    }
}
