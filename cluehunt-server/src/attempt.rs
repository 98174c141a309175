//! Per-clue attempt state and the advancement rule
//!
//! [`evaluate`] is the whole decision table: given a clue's mode, the proofs
//! already accepted for it, the proof just scored and the geofence result, it
//! says whether the team advances. It touches no shared state.

use crate::clues::ValidationMode;
use serde::{Deserialize, Serialize};

/// Proofs already accepted for the team's current clue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satisfaction {
    pub photo: bool,
    pub qa: bool,
}

impl Satisfaction {
    /// Fold an accepted proof in; flags only ever turn on
    pub fn record(self, proof: Proof) -> Self {
        match proof {
            Proof::Photo { accepted } => Self {
                photo: self.photo || accepted,
                ..self
            },
            Proof::Answer { accepted } => Self {
                qa: self.qa || accepted,
                ..self
            },
        }
    }
}

/// The proof carried by one submission, after scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proof {
    Photo { accepted: bool },
    Answer { accepted: bool },
}

/// Outcome of one submission against the current clue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Not advanced; carries the satisfaction to keep for this clue
    Pending(Satisfaction),
    /// Team moves past the clue
    Advanced,
}

impl Attempt {
    pub fn is_advanced(&self) -> bool {
        matches!(self, Attempt::Advanced)
    }
}

/// Decide whether a submission advances the team
///
/// A photo in `photo` mode (or an answer in `qa` mode) advances on its own
/// acceptance. The other proof kind in those modes only advances if the
/// mode's own proof was accepted earlier. `both` needs both flags and `either`
/// needs one. Every case requires the team to be inside the geofence.
pub fn evaluate(mode: ValidationMode, prior: Satisfaction, proof: Proof, geo_ok: bool) -> Attempt {
    let satisfaction = prior.record(proof);

    let proofs_ok = match (mode, proof) {
        (ValidationMode::Photo, Proof::Photo { accepted }) => accepted,
        (ValidationMode::Photo, Proof::Answer { .. }) => satisfaction.photo,
        (ValidationMode::Qa, Proof::Answer { accepted }) => accepted,
        (ValidationMode::Qa, Proof::Photo { .. }) => satisfaction.qa,
        (ValidationMode::Both, _) => satisfaction.photo && satisfaction.qa,
        (ValidationMode::Either, _) => satisfaction.photo || satisfaction.qa,
    };

    if geo_ok && proofs_ok {
        Attempt::Advanced
    } else {
        Attempt::Pending(satisfaction)
    }
}
