//! Per-chunk glyph selection.
//!
//! Every chunk is matched against each depth's index. The globally closest
//! stack wins unless a shallower stack is *close enough*: for the best depth
//! `a` with distance `d_a`, a shallower depth `b` with distance `d_b` is
//! accepted when
//!
//! ```text
//! (d_b − d_a) / ((a − b) × meanDistance_b) < cutoff
//! ```
//!
//! where `meanDistance_b` is the RMS distance from the chunk to every glyph
//! at depth `b`. Depths are compared deepest to shallowest against the same
//! best candidate and the shallowest accepted depth wins, so raising the
//! cutoff can only make the choice shallower.
//!
//! Chunks are independent; [`Matcher::match_grid`] fans them out with rayon.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;

use crate::chunk::{Chunk, ChunkGrid};
use crate::error::{GlyphError, MatchError};
use crate::glyph::Glyph;
use crate::index::IndexSet;
use crate::simd;

/// Result type for matching operations.
pub type MatchResult<T> = std::result::Result<T, MatchError>;

/// Glyph chosen for one chunk.
#[derive(Debug, Clone)]
pub struct Match {
    pub glyph: Arc<Glyph>,
    /// Distance to the (possibly background-blended) chunk. `None` when the
    /// chunk was fully transparent and the background was used directly.
    pub distance: Option<f64>,
    /// Index depth the glyph came from; 0 for the background overlay.
    pub depth: usize,
}

/// Distance figures for one depth, as seen from one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthScore {
    pub depth: usize,
    /// Distance to the nearest glyph at this depth.
    pub distance: f64,
    /// RMS distance to all glyphs at this depth.
    pub mean_distance: f64,
}

/// Pick which of `scores` (shallowest first) to use under `cutoff`.
///
/// Returns the position in `scores`, or `None` if `scores` is empty.
pub fn choose_depth(scores: &[DepthScore], cutoff: f64) -> Option<usize> {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        // Strict: equal distances stay with the shallower stack.
        if score.distance < scores[best].distance {
            best = i;
        }
    }
    let best_score = scores.get(best)?;

    let mut chosen = best;
    for i in (0..best).rev() {
        let candidate = &scores[i];
        let denominator =
            (best_score.depth - candidate.depth) as f64 * candidate.mean_distance;
        if denominator <= 0.0 {
            continue;
        }
        let ratio = (candidate.distance - best_score.distance) / denominator;
        if ratio < cutoff {
            chosen = i;
        }
    }
    Some(chosen)
}

/// Matches chunks against one [`IndexSet`] snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    indexes: &'a IndexSet,
    cutoff: f64,
    background: Option<&'a Arc<Glyph>>,
}

impl<'a> Matcher<'a> {
    pub fn new(indexes: &'a IndexSet, cutoff: f64) -> Self {
        Self {
            indexes,
            cutoff,
            background: None,
        }
    }

    /// Blend transparent chunk regions toward `background`.
    pub fn with_background(mut self, background: &'a Arc<Glyph>) -> MatchResult<Self> {
        if background.fingerprint().len() != self.indexes.dim() {
            return Err(GlyphError::SamplesMismatch {
                expected: format!("{} samples", self.indexes.dim()),
                actual: background.samples().to_string(),
            }
            .into());
        }
        self.background = Some(background);
        Ok(self)
    }

    /// Match every chunk of `grid`, returning glyphs in grid order.
    ///
    /// All chunks are validated before any matching starts.
    pub fn match_grid(&self, grid: &ChunkGrid) -> MatchResult<Vec<Match>> {
        let expected = self.indexes.dim();
        for (i, chunk) in grid.chunks().iter().enumerate() {
            let (row, column) = (i / grid.width(), i % grid.width());
            if chunk.values.len() != expected {
                return Err(MatchError::DimensionMismatch {
                    row,
                    column,
                    expected,
                    actual: chunk.values.len(),
                });
            }
            if let Some(alpha) = &chunk.alpha {
                if alpha.len() != expected {
                    return Err(MatchError::AlphaShape {
                        row,
                        column,
                        expected,
                        actual: alpha.len(),
                    });
                }
            }
        }
        self.check_library()?;

        grid.chunks()
            .par_iter()
            .map(|chunk| self.match_chunk(chunk))
            .collect()
    }

    /// Match a single chunk.
    pub fn match_chunk(&self, chunk: &Chunk) -> MatchResult<Match> {
        let expected = self.indexes.dim();
        if chunk.values.len() != expected {
            return Err(MatchError::DimensionMismatch {
                row: 0,
                column: 0,
                expected,
                actual: chunk.values.len(),
            });
        }

        let mut target: Cow<'_, [f32]> = Cow::Borrowed(&chunk.values);
        let mut background_distance = None;

        if let (Some(background), Some(alpha)) = (self.background, chunk.alpha.as_deref()) {
            if alpha.iter().all(|&a| a == 0) {
                return Ok(Match {
                    glyph: Arc::clone(background),
                    distance: None,
                    depth: 0,
                });
            }
            if alpha.iter().any(|&a| a < 255) {
                let blended = blend(&chunk.values, background.fingerprint(), alpha);
                let d = simd::kernel().squared_distance(background.fingerprint(), &blended);
                background_distance = Some((d as f64).sqrt());
                target = Cow::Owned(blended);
            }
        }

        self.check_library()?;

        let mut scores = Vec::with_capacity(self.indexes.max_depth());
        let mut picks = Vec::with_capacity(self.indexes.max_depth());
        for index in self.indexes.iter().filter(|index| !index.is_empty()) {
            let nearest = index.nearest(&target)?;
            scores.push(DepthScore {
                depth: index.depth(),
                distance: nearest.distance,
                mean_distance: index.mean_distance(&target)?,
            });
            picks.push(nearest.glyph);
        }

        let best_distance = scores
            .iter()
            .map(|s| s.distance)
            .fold(f64::INFINITY, f64::min);
        if let (Some(background), Some(d)) = (self.background, background_distance) {
            if d < best_distance {
                return Ok(Match {
                    glyph: Arc::clone(background),
                    distance: Some(d),
                    depth: 0,
                });
            }
        }

        let chosen = choose_depth(&scores, self.cutoff)
            .ok_or(MatchError::EmptyLibrary { depth: 1 })?;
        Ok(Match {
            glyph: Arc::clone(picks[chosen]),
            distance: Some(scores[chosen].distance),
            depth: scores[chosen].depth,
        })
    }

    fn check_library(&self) -> MatchResult<()> {
        match self.indexes.depth(1) {
            Some(index) if !index.is_empty() => Ok(()),
            _ => Err(MatchError::EmptyLibrary { depth: 1 }),
        }
    }
}

/// Mix chunk values toward the background in proportion to transparency.
fn blend(values: &[f32], background: &[f32], alpha: &[u8]) -> Vec<f32> {
    values
        .iter()
        .zip(background)
        .zip(alpha)
        .map(|((&v, &b), &a)| {
            let a = a as f32 / 255.0;
            v * a + b * (1.0 - a)
        })
        .collect()
}
