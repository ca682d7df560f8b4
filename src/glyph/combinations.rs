//! Lazy generation of overtype stacks.
//!
//! [`Combinations`] walks the exact-size subsets of a glyph pool in
//! lexicographic index order without materializing them up front, and can be
//! restarted. [`stacks`] merges each subset into one combined [`Glyph`].
//!
//! With `K` combinable glyphs there are `C(K, d)` stacks at depth `d`, so
//! depths beyond 3 get expensive quickly for realistic key sets.

use std::sync::Arc;

use super::Glyph;

/// Restartable iterator over all `size`-element subsets of a glyph pool.
#[derive(Debug, Clone)]
pub struct Combinations {
    pool: Arc<[Arc<Glyph>]>,
    size: usize,
    indices: Vec<usize>,
    exhausted: bool,
}

impl Combinations {
    pub fn new(pool: impl Into<Arc<[Arc<Glyph>]>>, size: usize) -> Self {
        let pool = pool.into();
        let exhausted = size == 0 || size > pool.len();
        Self {
            pool,
            size,
            indices: (0..size).collect(),
            exhausted,
        }
    }

    /// Rewind to the first subset.
    pub fn restart(&mut self) {
        self.indices = (0..self.size).collect();
        self.exhausted = self.size == 0 || self.size > self.pool.len();
    }

    /// Total number of subsets this generator yields from the start.
    pub fn total(&self) -> u128 {
        combination_count(self.pool.len(), self.size)
    }

    /// Step `indices` to the next subset in lexicographic order.
    fn advance(&mut self) {
        let n = self.pool.len();
        let k = self.size;
        // Rightmost index that can still move right.
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < n - k + i) else {
            self.exhausted = true;
            return;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<Arc<Glyph>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let subset = self
            .indices
            .iter()
            .map(|&i| Arc::clone(&self.pool[i]))
            .collect();
        self.advance();
        Some(subset)
    }
}

/// Combined glyphs for every `depth`-sized subset of `pool`.
///
/// Subsets whose members share a key (possible when the pool holds glyphs
/// with explicit component lists) cannot be typed and are skipped.
pub fn stacks(pool: impl Into<Arc<[Arc<Glyph>]>>, depth: usize) -> impl Iterator<Item = Glyph> {
    Combinations::new(pool, depth).filter_map(|subset| {
        let (first, rest) = subset.split_first()?;
        let mut merged = Glyph::clone(first);
        for glyph in rest {
            match merged.combine(glyph) {
                Ok(next) => merged = next,
                Err(e) => {
                    tracing::trace!(stack = %merged.name(), with = %glyph.name(), error = %e, "skipping untypeable stack");
                    return None;
                }
            }
        }
        Some(merged)
    })
}

/// Binomial coefficient `C(n, k)`, saturating at `u128::MAX`.
pub fn combination_count(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = match result.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    result
}
