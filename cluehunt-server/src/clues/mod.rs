//! Clue definitions and the persisted game configuration

pub mod model;
pub mod store;

pub use model::{
    Clue, ClueGraph, ClueRecord, GameConfig, HintKind, HintSet, ValidationMode,
    DEFAULT_RADIUS_METERS, MAX_HINTS,
};
pub use store::{ClueUpdate, ConfigStore, NewClue};
