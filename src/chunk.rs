//! Chunk grids: per-cell fingerprint vectors fed to the matcher.
//!
//! Chunking proper (resizing, contrast work) happens upstream. A grid here is
//! `width * height` chunks listed row by row, each a `samples`-sized vector
//! of intensities with optional per-sample alpha.

use image::GrayAlphaImage;
use image::GrayImage;

use crate::config::Samples;
use crate::error::MatchError;

/// Fingerprint-space vector for one typing position.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub values: Vec<f32>,
    /// Per-sample opacity, 0 = transparent, 255 = opaque.
    pub alpha: Option<Vec<u8>>,
}

impl Chunk {
    pub fn opaque(values: Vec<f32>) -> Self {
        Self {
            values,
            alpha: None,
        }
    }

    pub fn with_alpha(values: Vec<f32>, alpha: Vec<u8>) -> Self {
        Self {
            values,
            alpha: Some(alpha),
        }
    }
}

/// Row-major grid of chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkGrid {
    width: usize,
    height: usize,
    chunks: Vec<Chunk>,
}

impl ChunkGrid {
    pub fn new(width: usize, height: usize, chunks: Vec<Chunk>) -> Result<Self, MatchError> {
        if width.checked_mul(height) != Some(chunks.len()) {
            return Err(MatchError::GridShape {
                width,
                height,
                chunks: chunks.len(),
            });
        }
        Ok(Self {
            width,
            height,
            chunks,
        })
    }

    /// Grid of opaque chunks from plain vectors.
    pub fn from_vectors(
        width: usize,
        height: usize,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, MatchError> {
        Self::new(width, height, vectors.into_iter().map(Chunk::opaque).collect())
    }

    /// Split a preprocessed image into chunks of `samples` pixels each.
    ///
    /// The image must already be sized to `columns * samples.width` by
    /// `rows * samples.height`.
    pub fn from_luma(image: &GrayImage, samples: Samples) -> Result<Self, MatchError> {
        let (width, height) = grid_size(image.dimensions(), samples)?;
        let mut chunks = Vec::with_capacity(width * height);
        for row in 0..height as u32 {
            for column in 0..width as u32 {
                let values = block(samples, row, column, |x, y| image.get_pixel(x, y).0[0]);
                chunks.push(Chunk::opaque(values.into_iter().map(f32::from).collect()));
            }
        }
        Self::new(width, height, chunks)
    }

    /// Like [`ChunkGrid::from_luma`], keeping the alpha channel per sample.
    pub fn from_luma_alpha(image: &GrayAlphaImage, samples: Samples) -> Result<Self, MatchError> {
        let (width, height) = grid_size(image.dimensions(), samples)?;
        let mut chunks = Vec::with_capacity(width * height);
        for row in 0..height as u32 {
            for column in 0..width as u32 {
                let values = block(samples, row, column, |x, y| image.get_pixel(x, y).0[0]);
                let alpha = block(samples, row, column, |x, y| image.get_pixel(x, y).0[1]);
                chunks.push(Chunk::with_alpha(
                    values.into_iter().map(f32::from).collect(),
                    alpha,
                ));
            }
        }
        Self::new(width, height, chunks)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Chunk> {
        if column >= self.width {
            return None;
        }
        self.chunks.get(row * self.width + column)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn grid_size((w, h): (u32, u32), samples: Samples) -> Result<(usize, usize), MatchError> {
    if samples.is_empty() || w % samples.width != 0 || h % samples.height != 0 {
        return Err(MatchError::ImageSize {
            width: w,
            height: h,
            samples: samples.to_string(),
        });
    }
    Ok(((w / samples.width) as usize, (h / samples.height) as usize))
}

fn block(samples: Samples, row: u32, column: u32, pixel: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len());
    for dy in 0..samples.height {
        for dx in 0..samples.width {
            out.push(pixel(column * samples.width + dx, row * samples.height + dy));
        }
    }
    out
}
