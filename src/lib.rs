// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # typograph
//!
//! Converts images into instructions for a monospaced typing device,
//! choosing for every cell the best single key or overtyped stack of keys.
//!
//! ## Architecture
//!
//! - **Glyphs** (`glyph`): bitmaps, block-averaged fingerprints, darken overtyping
//! - **Indexes** (`index`): exact k-d tree nearest neighbor plus O(1) RMS distance per depth
//! - **Matching** (`matcher`): close-enough substitution of shallower stacks, rayon fan-out
//! - **Composition** (`compose`): packs stacks into run-length encoded carriage passes
//! - **SIMD acceleration** (`simd`): runtime-dispatched AVX2/generic pixel kernels
//!
//! ## Library usage
//!
//! ```no_run
//! use image::{GrayImage, Luma};
//! use typograph::chunk::ChunkGrid;
//! use typograph::config::{Samples, TypographConfig};
//! use typograph::glyph::Glyph;
//! use typograph::typograph::Typograph;
//!
//! let samples = Samples::default();
//! let dash = Glyph::new("-", GrayImage::from_pixel(9, 18, Luma([180])), samples).unwrap();
//! let hash = Glyph::new("#", GrayImage::from_pixel(9, 18, Luma([60])), samples).unwrap();
//!
//! let typo = Typograph::new(TypographConfig::default(), [dash, hash]).unwrap();
//! let chunks = ChunkGrid::from_vectors(2, 1, vec![vec![200.0; 9], vec![40.0; 9]]).unwrap();
//! let art = typo.convert(&chunks).unwrap();
//! println!("{}", art.instructions());
//! ```

pub mod art;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod glyph;
pub mod index;
pub mod matcher;
pub mod simd;
pub mod typograph;
