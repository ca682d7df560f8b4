//! Fingerprint indexes: nearest-neighbor search and centroid statistics.
//!
//! One [`FingerprintIndex`] is built per stack depth. Besides exact nearest
//! neighbor queries it answers "how far is this query from the collection on
//! average" in O(1), using
//!
//! ```text
//! RMSD(p)² = |centroid − p|² + mean(|x_i − centroid|²)
//! ```
//!
//! which holds exactly because the deviations `x_i − centroid` sum to zero.
//!
//! [`IndexSet`] bundles the indexes for depths `1..=D` built from one version
//! of a [`GlyphCollection`]. It is immutable; a collection change produces a
//! new set.

pub mod kdtree;

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::IndexError;
use crate::glyph::Glyph;
use crate::glyph::collection::GlyphCollection;
use crate::simd::{self, PixelKernel};

use kdtree::KdTree;

/// Result type for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Closest glyph to a query.
#[derive(Debug, Clone)]
pub struct Neighbor<'a> {
    pub glyph: &'a Arc<Glyph>,
    /// Euclidean distance in fingerprint space.
    pub distance: f64,
}

/// Nearest-neighbor index over the glyphs of one stack depth.
pub struct FingerprintIndex {
    depth: usize,
    glyphs: Vec<Arc<Glyph>>,
    tree: KdTree,
    centroid: Vec<f64>,
    mean_square_from_centroid: f64,
    kernel: &'static dyn PixelKernel,
}

impl FingerprintIndex {
    /// Build an index over `glyphs`, all of which must have `dim`-long fingerprints.
    pub fn build(depth: usize, glyphs: Vec<Arc<Glyph>>, dim: usize) -> IndexResult<Self> {
        let mut points = Vec::with_capacity(glyphs.len() * dim);
        for glyph in &glyphs {
            let fp = glyph.fingerprint();
            if fp.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: fp.len(),
                });
            }
            points.extend_from_slice(fp);
        }

        let (centroid, mean_square_from_centroid) = centroid_stats(&points, dim);
        let tree = KdTree::build(points, dim);

        Ok(Self {
            depth,
            glyphs,
            tree,
            centroid,
            mean_square_from_centroid,
            kernel: simd::kernel(),
        })
    }

    /// Exact nearest glyph by Euclidean distance. Ties go to the glyph listed first.
    pub fn nearest(&self, query: &[f32]) -> IndexResult<Neighbor<'_>> {
        self.check_dim(query)?;
        let found = self
            .tree
            .nearest(self.kernel, query)
            .ok_or(IndexError::EmptyIndex { depth: self.depth })?;
        Ok(Neighbor {
            glyph: &self.glyphs[found.id],
            distance: (found.squared_distance as f64).sqrt(),
        })
    }

    /// Root-mean-square distance from `query` to every glyph in the index.
    pub fn mean_distance(&self, query: &[f32]) -> IndexResult<f64> {
        self.check_dim(query)?;
        if self.is_empty() {
            return Err(IndexError::EmptyIndex { depth: self.depth });
        }
        let to_centroid: f64 = self
            .centroid
            .iter()
            .zip(query)
            .map(|(&c, &q)| {
                let d = c - q as f64;
                d * d
            })
            .sum();
        Ok((to_centroid + self.mean_square_from_centroid).sqrt())
    }

    fn check_dim(&self, query: &[f32]) -> IndexResult<()> {
        if query.len() != self.tree.dim() {
            return Err(IndexError::DimensionMismatch {
                expected: self.tree.dim(),
                actual: query.len(),
            });
        }
        Ok(())
    }

    /// Number of keys stacked in each glyph of this index.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn glyphs(&self) -> &[Arc<Glyph>] {
        &self.glyphs
    }

    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    pub fn mean_square_from_centroid(&self) -> f64 {
        self.mean_square_from_centroid
    }

    pub fn dim(&self) -> usize {
        self.tree.dim()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl std::fmt::Debug for FingerprintIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintIndex")
            .field("depth", &self.depth)
            .field("len", &self.glyphs.len())
            .field("dim", &self.tree.dim())
            .field("mean_square_from_centroid", &self.mean_square_from_centroid)
            .finish()
    }
}

/// Centroid of flattened points and mean squared distance to it.
fn centroid_stats(points: &[f32], dim: usize) -> (Vec<f64>, f64) {
    let n = points.len() / dim;
    let mut centroid = vec![0f64; dim];
    if n == 0 {
        return (centroid, 0.0);
    }
    for p in points.chunks_exact(dim) {
        for (c, &v) in centroid.iter_mut().zip(p) {
            *c += v as f64;
        }
    }
    for c in &mut centroid {
        *c /= n as f64;
    }

    let total: f64 = points
        .chunks_exact(dim)
        .map(|p| {
            p.iter()
                .zip(&centroid)
                .map(|(&v, &c)| {
                    let d = v as f64 - c;
                    d * d
                })
                .sum::<f64>()
        })
        .sum();
    (centroid, total / n as f64)
}

/// Indexes for every depth `1..=D`, built from one collection version.
#[derive(Debug)]
pub struct IndexSet {
    version: u64,
    dim: usize,
    depths: Vec<FingerprintIndex>,
    average_values: Vec<f32>,
}

impl IndexSet {
    /// Build indexes for depths `1..=glyph_depth`. Depths are built in parallel.
    pub fn build(collection: &GlyphCollection, glyph_depth: usize) -> IndexResult<Self> {
        let dim = collection.samples().len();

        let depths: Vec<FingerprintIndex> = (1..=glyph_depth)
            .into_par_iter()
            .map(|depth| FingerprintIndex::build(depth, collection.glyphs_at_depth(depth), dim))
            .collect::<IndexResult<_>>()?;

        let average_values = depths
            .iter()
            .flat_map(|index| index.glyphs().iter().map(|g| g.mean_value()))
            .collect();

        for index in &depths {
            if index.is_empty() {
                tracing::debug!(depth = index.depth(), "no glyphs at depth");
            }
        }
        tracing::info!(
            version = collection.version(),
            depths = glyph_depth,
            glyphs = ?depths.iter().map(FingerprintIndex::len).collect::<Vec<_>>(),
            "built fingerprint indexes"
        );

        Ok(Self {
            version: collection.version(),
            dim,
            depths,
            average_values,
        })
    }

    /// Index for stacks of exactly `depth` keys.
    pub fn depth(&self, depth: usize) -> Option<&FingerprintIndex> {
        depth.checked_sub(1).and_then(|i| self.depths.get(i))
    }

    /// All indexes, shallowest first.
    pub fn iter(&self) -> impl Iterator<Item = &FingerprintIndex> {
        self.depths.iter()
    }

    /// Deepest configured depth.
    pub fn max_depth(&self) -> usize {
        self.depths.len()
    }

    /// Collection version these indexes were built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Fingerprint length every query must have.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Mean fingerprint value of every indexed glyph, all depths.
    pub fn average_values(&self) -> &[f32] {
        &self.average_values
    }

    /// Darkest and lightest mean glyph value, for contrast preprocessing.
    pub fn value_extrema(&self) -> Option<(f32, f32)> {
        self.average_values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
    }

    /// Total number of indexed glyphs across depths.
    pub fn len(&self) -> usize {
        self.depths.iter().map(FingerprintIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::config::Samples;

    fn random_glyphs(rng: &mut impl Rng, n: usize, samples: Samples) -> Vec<Arc<Glyph>> {
        (0..n)
            .map(|i| {
                let (w, h) = (samples.width * 2, samples.height * 2);
                let image = GrayImage::from_fn(w, h, |_, _| Luma([rng.r#gen()]));
                Arc::new(Glyph::new(format!("g{i}"), image, samples).unwrap())
            })
            .collect()
    }

    fn naive_rmsd(glyphs: &[Arc<Glyph>], query: &[f32]) -> f64 {
        let total: f64 = glyphs
            .iter()
            .map(|g| {
                g.fingerprint()
                    .iter()
                    .zip(query)
                    .map(|(&a, &b)| {
                        let d = a as f64 - b as f64;
                        d * d
                    })
                    .sum::<f64>()
            })
            .sum();
        (total / glyphs.len() as f64).sqrt()
    }

    #[test]
    fn centroid_shortcut_equals_naive_rmsd() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let samples = Samples::new(3, 4);
        for n in [1, 2, 7, 64] {
            let glyphs = random_glyphs(&mut rng, n, samples);
            let index = FingerprintIndex::build(1, glyphs.clone(), samples.len()).unwrap();
            for _ in 0..20 {
                let query: Vec<f32> = (0..samples.len()).map(|_| rng.gen_range(0.0..255.0)).collect();
                let fast = index.mean_distance(&query).unwrap();
                let slow = naive_rmsd(&glyphs, &query);
                assert!(
                    (fast - slow).abs() <= 1e-6 * slow.max(1.0),
                    "n={n}: {fast} vs {slow}"
                );
            }
        }
    }

    #[test]
    fn nearest_returns_exact_match() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let samples = Samples::square(3);
        let glyphs = random_glyphs(&mut rng, 40, samples);
        let index = FingerprintIndex::build(1, glyphs.clone(), samples.len()).unwrap();
        for g in &glyphs {
            let n = index.nearest(g.fingerprint()).unwrap();
            assert_eq!(n.glyph.name(), g.name());
            assert_eq!(n.distance, 0.0);
        }
    }

    #[test]
    fn query_dimension_checked() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let samples = Samples::square(3);
        let index =
            FingerprintIndex::build(1, random_glyphs(&mut rng, 4, samples), samples.len()).unwrap();
        assert!(matches!(
            index.nearest(&[0.0; 4]),
            Err(IndexError::DimensionMismatch {
                expected: 9,
                actual: 4
            })
        ));
        assert!(matches!(
            index.mean_distance(&[0.0; 10]),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn empty_index_errors_on_query() {
        let index = FingerprintIndex::build(2, Vec::new(), 9).unwrap();
        assert!(matches!(
            index.nearest(&[0.0; 9]),
            Err(IndexError::EmptyIndex { depth: 2 })
        ));
        assert!(matches!(
            index.mean_distance(&[0.0; 9]),
            Err(IndexError::EmptyIndex { depth: 2 })
        ));
    }

    #[test]
    fn build_rejects_mismatched_fingerprints() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let glyphs = random_glyphs(&mut rng, 3, Samples::square(2));
        assert!(matches!(
            FingerprintIndex::build(1, glyphs, 9),
            Err(IndexError::DimensionMismatch {
                expected: 9,
                actual: 4
            })
        ));
    }

    #[test]
    fn index_set_covers_each_depth() {
        let samples = Samples::square(2);
        let glyphs = ["a", "b", "c", "d"].iter().enumerate().map(|(i, name)| {
            Glyph::new(*name, GrayImage::from_pixel(2, 2, Luma([40 * i as u8 + 10])), samples)
                .unwrap()
        });
        let mut collection = GlyphCollection::from_glyphs(samples, glyphs).unwrap();
        let standalone =
            Glyph::new("s", GrayImage::from_pixel(2, 2, Luma([250])), samples).unwrap();
        collection.add(standalone, false).unwrap();

        let set = IndexSet::build(&collection, 3).unwrap();
        assert_eq!(set.max_depth(), 3);
        assert_eq!(set.version(), collection.version());
        assert_eq!(set.depth(1).unwrap().len(), 5);
        assert_eq!(set.depth(2).unwrap().len(), 6);
        assert_eq!(set.depth(3).unwrap().len(), 4);
        assert!(set.depth(0).is_none());
        assert!(set.depth(4).is_none());
        assert_eq!(set.len(), 15);
        assert_eq!(set.value_extrema(), Some((10.0, 250.0)));
    }
}
