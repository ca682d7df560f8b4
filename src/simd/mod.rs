//! SIMD-accelerated kernels for bitmap and fingerprint arithmetic.
//!
//! This module provides a `PixelKernel` trait with CPU-specific implementations.
//! At runtime, [`detect_isa`] determines the best available instruction set and
//! [`best_kernel`] returns the fastest implementation for the current CPU.
//! [`kernel`] hands out a process-wide shared instance.
//!
//! # Supported ISA levels
//!
//! - **Generic**: Pure-Rust scalar fallback, works everywhere
//! - **AVX2**: 256-bit SIMD for x86_64 systems with AVX2 support

pub mod avx2;
pub mod generic;

use std::sync::OnceLock;

/// Instruction set architecture level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsaLevel {
    /// Pure-Rust scalar operations, no SIMD.
    Generic,
    /// x86_64 AVX2 (256-bit vectors).
    Avx2,
}

impl std::fmt::Display for IsaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaLevel::Generic => write!(f, "Generic (scalar)"),
            IsaLevel::Avx2 => write!(f, "AVX2 (256-bit)"),
        }
    }
}

/// Detect the best ISA level available on the current CPU.
pub fn detect_isa() -> IsaLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return IsaLevel::Avx2;
        }
    }
    IsaLevel::Generic
}

/// Trait for SIMD-accelerated pixel kernels.
///
/// Intensities follow the paper convention: 0 is full ink, 255 is blank.
/// All slice arguments of one call must have the same length.
pub trait PixelKernel: Send + Sync {
    /// The ISA level this kernel targets.
    fn isa_level(&self) -> IsaLevel;

    /// Darken-composite two 8-bit bitmaps: each output pixel is the darker input.
    fn darken_u8(&self, a: &[u8], b: &[u8], out: &mut [u8]);

    /// Darken-composite two fingerprint vectors.
    fn darken_f32(&self, a: &[f32], b: &[f32], out: &mut [f32]);

    /// Squared Euclidean distance between two fingerprint vectors.
    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32;
}

/// Return the best available kernel for the current CPU.
pub fn best_kernel() -> Box<dyn PixelKernel> {
    match detect_isa() {
        #[cfg(target_arch = "x86_64")]
        IsaLevel::Avx2 => Box::new(avx2::Avx2Kernel),
        _ => Box::new(generic::GenericKernel),
    }
}

/// Shared kernel, detected once per process.
pub fn kernel() -> &'static dyn PixelKernel {
    static KERNEL: OnceLock<Box<dyn PixelKernel>> = OnceLock::new();
    KERNEL.get_or_init(best_kernel).as_ref()
}
