//! AVX2 (256-bit) SIMD kernel for x86_64 pixel operations.
//!
//! Falls through to scalar code for tail elements that don't fill
//! a full 256-bit register.

use super::{IsaLevel, PixelKernel};

/// AVX2-accelerated pixel kernel.
///
/// Uses 256-bit SIMD for bulk operations and scalar fallback for tails.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel;

#[cfg(target_arch = "x86_64")]
impl PixelKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Avx2
    }

    fn darken_u8(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());

        if is_x86_feature_detected!("avx2") {
            // Safety: we've confirmed AVX2 support at runtime.
            unsafe { self.darken_u8_avx2(a, b, out) }
        } else {
            super::generic::GenericKernel.darken_u8(a, b, out);
        }
    }

    fn darken_f32(&self, a: &[f32], b: &[f32], out: &mut [f32]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());

        if is_x86_feature_detected!("avx2") {
            unsafe { self.darken_f32_avx2(a, b, out) }
        } else {
            super::generic::GenericKernel.darken_f32(a, b, out);
        }
    }

    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        // Typical fingerprints (3x3) are shorter than one register.
        if a.len() >= 8 && is_x86_feature_detected!("avx2") {
            unsafe { self.squared_distance_avx2(a, b) }
        } else {
            super::generic::GenericKernel.squared_distance(a, b)
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl Avx2Kernel {
    #[target_feature(enable = "avx2")]
    unsafe fn darken_u8_avx2(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 32;
        let remainder = len % 32;

        for i in 0..chunks {
            let offset = i * 32;
            unsafe {
                let va = _mm256_loadu_si256(a.as_ptr().add(offset) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(offset) as *const __m256i);
                let result = _mm256_min_epu8(va, vb);
                _mm256_storeu_si256(out.as_mut_ptr().add(offset) as *mut __m256i, result);
            }
        }

        // Scalar tail
        let tail_start = chunks * 32;
        for i in 0..remainder {
            out[tail_start + i] = a[tail_start + i].min(b[tail_start + i]);
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn darken_f32_avx2(&self, a: &[f32], b: &[f32], out: &mut [f32]) {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;
        let remainder = len % 8;

        for i in 0..chunks {
            let offset = i * 8;
            unsafe {
                let va = _mm256_loadu_ps(a.as_ptr().add(offset));
                let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
                let result = _mm256_min_ps(va, vb);
                _mm256_storeu_ps(out.as_mut_ptr().add(offset), result);
            }
        }

        let tail_start = chunks * 8;
        for i in 0..remainder {
            out[tail_start + i] = a[tail_start + i].min(b[tail_start + i]);
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn squared_distance_avx2(&self, a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;

        let mut acc;
        unsafe {
            acc = _mm256_setzero_ps();
            for i in 0..chunks {
                let offset = i * 8;
                let va = _mm256_loadu_ps(a.as_ptr().add(offset));
                let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
                let diff = _mm256_sub_ps(va, vb);
                acc = _mm256_add_ps(acc, _mm256_mul_ps(diff, diff));
            }
        }

        let mut total = unsafe { hsum_ps(acc) };

        // Scalar tail
        for i in chunks * 8..len {
            let d = a[i] - b[i];
            total += d * d;
        }
        total
    }
}

/// Horizontal sum of 8 packed f32 values in a __m256 register.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hsum_ps(v: std::arch::x86_64::__m256) -> f32 {
    use std::arch::x86_64::*;
    let hi = _mm256_extractf128_ps(v, 1);
    let lo = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sum64 = _mm_add_ps(sum128, shuf);
    let hi64 = _mm_movehl_ps(shuf, sum64);
    let sum32 = _mm_add_ss(sum64, hi64);
    _mm_cvtss_f32(sum32)
}

// Provide a stub for non-x86_64 targets so the module compiles.
#[cfg(not(target_arch = "x86_64"))]
impl PixelKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }
    fn darken_u8(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        super::generic::GenericKernel.darken_u8(a, b, out);
    }
    fn darken_f32(&self, a: &[f32], b: &[f32], out: &mut [f32]) {
        super::generic::GenericKernel.darken_f32(a, b, out);
    }
    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        super::generic::GenericKernel.squared_distance(a, b)
    }
}
