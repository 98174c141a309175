//! Perceptual pixel-diff similarity between a reference photo and an upload
//!
//! Both images are cover-resized (centre crop) to a fixed square and given an
//! alpha channel. A pixel counts as mismatched when its YIQ colour distance,
//! after blending translucent pixels over white, exceeds the tolerance.
//! Similarity is the share of pixels that still match.

use super::ScoreError;
use image::{imageops::FilterType, DynamicImage, RgbaImage};

/// Side length both images are normalized to
pub const NORMALIZED_SIZE: u32 = 256;

/// Per-pixel tolerance in `[0, 1]`; smaller is stricter
pub const PIXEL_THRESHOLD: f64 = 0.1;

/// Largest possible YIQ delta between two opaque pixels
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Pluggable photo scorer
///
/// Contract: returns a value in `[0, 1]`, deterministic for identical inputs,
/// and fails with [`ScoreError::Decode`] when either image is unreadable.
/// Implementations run on the blocking thread pool.
pub trait ImageScorer: Send + Sync {
    fn similarity(&self, reference: &[u8], candidate: &[u8]) -> Result<f64, ScoreError>;
}

/// Default scorer: normalized resize followed by YIQ pixel comparison
#[derive(Debug, Clone, Copy)]
pub struct PixelDiffScorer {
    pub size: u32,
    pub threshold: f64,
}

impl Default for PixelDiffScorer {
    fn default() -> Self {
        Self {
            size: NORMALIZED_SIZE,
            threshold: PIXEL_THRESHOLD,
        }
    }
}

impl ImageScorer for PixelDiffScorer {
    fn similarity(&self, reference: &[u8], candidate: &[u8]) -> Result<f64, ScoreError> {
        let reference = normalize(&decode(reference, "reference")?, self.size);
        let candidate = normalize(&decode(candidate, "candidate")?, self.size);
        Ok(compare(&reference, &candidate, self.threshold))
    }
}

/// Score two encoded images with the default scorer
pub fn image_similarity(reference: &[u8], candidate: &[u8]) -> Result<f64, ScoreError> {
    PixelDiffScorer::default().similarity(reference, candidate)
}

fn decode(bytes: &[u8], which: &'static str) -> Result<DynamicImage, ScoreError> {
    image::load_from_memory(bytes).map_err(|source| ScoreError::Decode { which, source })
}

/// Cover-resize to `size`×`size` and expand to RGBA
pub fn normalize(img: &DynamicImage, size: u32) -> RgbaImage {
    img.resize_to_fill(size, size, FilterType::Triangle).to_rgba8()
}

/// Fraction of matching pixels between two equally sized RGBA images
pub fn compare(a: &RgbaImage, b: &RgbaImage, threshold: f64) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions());

    let total = u64::from(a.width()) * u64::from(a.height());
    if total == 0 {
        return 1.0;
    }

    let max_delta = MAX_YIQ_DELTA * threshold * threshold;
    let mismatched = a
        .pixels()
        .zip(b.pixels())
        .filter(|(p, q)| p != q && color_delta(p.0, q.0) > max_delta)
        .count() as u64;

    1.0 - mismatched as f64 / total as f64
}

/// Squared YIQ distance between two RGBA pixels
fn color_delta(p: [u8; 4], q: [u8; 4]) -> f64 {
    let (r1, g1, b1) = blend_over_white(p);
    let (r2, g2, b2) = blend_over_white(q);

    let y = rgb2y(r1, g1, b1) - rgb2y(r2, g2, b2);
    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q
}

fn blend_over_white(px: [u8; 4]) -> (f64, f64, f64) {
    let [r, g, b, a] = px.map(f64::from);
    if a >= 255.0 {
        return (r, g, b);
    }
    let alpha = a / 255.0;
    let blend = |c: f64| 255.0 + (c - 255.0) * alpha;
    (blend(r), blend(g), blend(b))
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}
