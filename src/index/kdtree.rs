//! Exact nearest-neighbor search over fingerprint vectors.
//!
//! A balanced, implicit k-d tree: the points of a range `[lo, hi)` of `order`
//! are split around the median at `mid = (lo + hi) / 2` along the axis of
//! greatest spread, recursively. No node allocations; the tree is two
//! `Vec`s next to the flattened point data.

use crate::simd::PixelKernel;

/// Implicit k-d tree over `len` points of dimension `dim`.
#[derive(Debug, Clone)]
pub struct KdTree {
    dim: usize,
    points: Vec<f32>,
    /// Point ids in tree order.
    order: Vec<usize>,
    /// Split axis of the node stored at each position of `order`.
    axes: Vec<usize>,
}

/// Closest point found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Position of the point in the input sequence.
    pub id: usize,
    /// Squared Euclidean distance to the query.
    pub squared_distance: f32,
}

impl KdTree {
    /// Build from flattened points (`points.len()` must be a multiple of `dim`).
    pub fn build(points: Vec<f32>, dim: usize) -> Self {
        debug_assert!(dim > 0);
        debug_assert_eq!(points.len() % dim, 0);
        let len = points.len() / dim;
        let mut tree = Self {
            dim,
            points,
            order: (0..len).collect(),
            axes: vec![0; len],
        };
        tree.split(0, len);
        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinates of the point with the given id.
    pub fn point(&self, id: usize) -> &[f32] {
        &self.points[id * self.dim..(id + 1) * self.dim]
    }

    fn split(&mut self, lo: usize, hi: usize) {
        if hi - lo <= 1 {
            return;
        }
        let axis = self.widest_axis(lo, hi);
        let mid = lo + (hi - lo) / 2;

        let dim = self.dim;
        let points = &self.points;
        self.order[lo..hi].select_nth_unstable_by(mid - lo, |&a, &b| {
            points[a * dim + axis]
                .total_cmp(&points[b * dim + axis])
                .then(a.cmp(&b))
        });
        self.axes[mid] = axis;

        self.split(lo, mid);
        self.split(mid + 1, hi);
    }

    fn widest_axis(&self, lo: usize, hi: usize) -> usize {
        let mut best_axis = 0;
        let mut best_spread = f32::NEG_INFINITY;
        for axis in 0..self.dim {
            let (min, max) = self.order[lo..hi].iter().fold(
                (f32::INFINITY, f32::NEG_INFINITY),
                |(min, max), &id| {
                    let v = self.points[id * self.dim + axis];
                    (min.min(v), max.max(v))
                },
            );
            if max - min > best_spread {
                best_spread = max - min;
                best_axis = axis;
            }
        }
        best_axis
    }

    /// Exact nearest point to `query`; ties resolve to the smallest id.
    pub fn nearest(&self, kernel: &dyn PixelKernel, query: &[f32]) -> Option<Nearest> {
        debug_assert_eq!(query.len(), self.dim);
        let mut best: Option<Nearest> = None;
        self.search(kernel, query, 0, self.len(), &mut best);
        best
    }

    fn search(
        &self,
        kernel: &dyn PixelKernel,
        query: &[f32],
        lo: usize,
        hi: usize,
        best: &mut Option<Nearest>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let id = self.order[mid];
        let point = self.point(id);

        let squared_distance = kernel.squared_distance(point, query);
        let better = match best {
            None => true,
            Some(b) => {
                squared_distance < b.squared_distance
                    || (squared_distance == b.squared_distance && id < b.id)
            }
        };
        if better {
            *best = Some(Nearest {
                id,
                squared_distance,
            });
        }

        if hi - lo == 1 {
            return;
        }

        let axis = self.axes[mid];
        let diff = query[axis] - point[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(kernel, query, near.0, near.1, best);
        // `<=` keeps equidistant candidates reachable so tie-breaking stays exact.
        let bound = best.map_or(f32::INFINITY, |b| b.squared_distance);
        if diff * diff <= bound {
            self.search(kernel, query, far.0, far.1, best);
        }
    }
}
