//! Pure-Rust scalar fallback for pixel kernel operations.
//!
//! This implementation works on all platforms and serves as the reference
//! implementation for correctness testing.

use super::{IsaLevel, PixelKernel};

/// Pure-Rust scalar pixel kernel, no SIMD intrinsics.
#[derive(Debug, Clone, Copy)]
pub struct GenericKernel;

impl PixelKernel for GenericKernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }

    fn darken_u8(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());
        for ((o, &av), &bv) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
            *o = av.min(bv);
        }
    }

    fn darken_f32(&self, a: &[f32], b: &[f32], out: &mut [f32]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());
        for ((o, &av), &bv) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
            *o = av.min(bv);
        }
    }

    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(&av, &bv)| {
                let d = av - bv;
                d * d
            })
            .sum()
    }
}
