//! Similarity scorers
//!
//! Both scorers return a value in `[0, 1]`, higher meaning more similar.
//! Acceptance thresholds are applied by the engine, not here.

pub mod photo;
pub mod text;

pub use self::photo::{image_similarity, ImageScorer, PixelDiffScorer};
pub use self::text::{normalize_text, text_similarity};

use thiserror::Error;

/// Scoring failures
#[derive(Debug, Error)]
pub enum ScoreError {
    /// One of the two images could not be decoded
    #[error("failed to decode {which} image: {source}")]
    Decode {
        which: &'static str,
        #[source]
        source: image::ImageError,
    },
}
