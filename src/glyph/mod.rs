//! Glyphs: the ink typed into one monospaced cell.
//!
//! A glyph is either *elemental* (one key, its component set is itself),
//! declared with an explicit component list (a pre-typed stack supplied by a
//! loader), or the overtype combination of other glyphs. This module provides:
//!
//! - [`Glyph`]: immutable bitmap + fingerprint + components
//! - [`fingerprint`]: block-averaged reduction of a bitmap
//! - [`collection::GlyphCollection`]: the combinable/standalone library
//! - [`combinations::Combinations`]: lazy exact-size subset generator
//!
//! Overtyping composites with the darker pixel winning, applied identically to
//! bitmaps and fingerprints. `min` is commutative and associative, so a stack's
//! result depends only on its component set.

pub mod collection;
pub mod combinations;

use std::collections::BTreeSet;

use image::{GrayImage, Luma};

use crate::config::Samples;
use crate::error::GlyphError;
use crate::simd;

/// Result type for glyph operations.
pub type GlyphResult<T> = std::result::Result<T, GlyphError>;

/// Separator between component names in a combined glyph's name.
pub const NAME_SEPARATOR: char = ' ';

/// The ink typed into one monospaced cell.
#[derive(Debug, Clone)]
pub struct Glyph {
    name: String,
    image: GrayImage,
    samples: Samples,
    fingerprint: Vec<f32>,
    components: BTreeSet<String>,
}

impl Glyph {
    /// Create an elemental glyph: a single key whose component set is itself.
    pub fn new(name: impl Into<String>, image: GrayImage, samples: Samples) -> GlyphResult<Self> {
        let name = name.into();
        let components = BTreeSet::from([name.clone()]);
        Self::build(name, image, samples, components)
    }

    /// Create a glyph that is known to be a stack of the named keys.
    ///
    /// Used when a loader supplies a scanned overtype directly, so that the
    /// instruction composer can still split it into carriage passes.
    pub fn with_components<I, S>(
        name: impl Into<String>,
        image: GrayImage,
        components: I,
        samples: Samples,
    ) -> GlyphResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let components: BTreeSet<String> = components.into_iter().map(Into::into).collect();
        if components.is_empty() {
            return Err(GlyphError::EmptyComponents { name });
        }
        Self::build(name, image, samples, components)
    }

    /// A glyph that leaves the paper untouched.
    pub fn blank(
        name: impl Into<String>,
        width: u32,
        height: u32,
        samples: Samples,
    ) -> GlyphResult<Self> {
        Self::new(name, GrayImage::from_pixel(width, height, Luma([255])), samples)
    }

    fn build(
        name: String,
        image: GrayImage,
        samples: Samples,
        components: BTreeSet<String>,
    ) -> GlyphResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(GlyphError::EmptyImage { name });
        }
        if samples.is_empty() {
            return Err(GlyphError::SamplesMismatch {
                expected: "non-zero samples".into(),
                actual: samples.to_string(),
            });
        }
        let fingerprint = fingerprint(&image, samples);
        Ok(Self {
            name,
            image,
            samples,
            fingerprint,
            components,
        })
    }

    /// Overtype `other` onto this glyph.
    ///
    /// Fails if the two stacks share a key (including combining a glyph with
    /// itself), or if bitmap size or samples differ.
    pub fn combine(&self, other: &Glyph) -> GlyphResult<Glyph> {
        if self.samples != other.samples {
            return Err(GlyphError::SamplesMismatch {
                expected: self.samples.to_string(),
                actual: other.samples.to_string(),
            });
        }
        self.check_size(other)?;
        if let Some(shared) = self.components.intersection(&other.components).next() {
            return Err(GlyphError::SelfCombination {
                name: self.name.clone(),
                component: shared.clone(),
            });
        }

        let kernel = simd::kernel();

        let mut pixels = vec![0u8; self.image.as_raw().len()];
        kernel.darken_u8(self.image.as_raw(), other.image.as_raw(), &mut pixels);
        let image = GrayImage::from_raw(self.image.width(), self.image.height(), pixels)
            .ok_or_else(|| GlyphError::EmptyImage {
                name: self.name.clone(),
            })?;

        let mut fingerprint = vec![0f32; self.fingerprint.len()];
        kernel.darken_f32(&self.fingerprint, &other.fingerprint, &mut fingerprint);

        let components: BTreeSet<String> = self
            .components
            .union(&other.components)
            .cloned()
            .collect();
        let name = stack_name(components.iter().map(String::as_str));

        Ok(Glyph {
            name,
            image,
            samples: self.samples,
            fingerprint,
            components,
        })
    }

    /// Ensure `other` is typed into the same cell size as this glyph.
    pub fn check_size(&self, other: &Glyph) -> GlyphResult<()> {
        if self.image.dimensions() != other.image.dimensions() {
            return Err(GlyphError::SizeMismatch {
                expected_width: self.image.width(),
                expected_height: self.image.height(),
                actual_width: other.image.width(),
                actual_height: other.image.height(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn samples(&self) -> Samples {
        self.samples
    }

    /// Block-averaged intensities, row by row.
    pub fn fingerprint(&self) -> &[f32] {
        &self.fingerprint
    }

    /// Names of the keys typed to produce this glyph, in canonical order.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        self.components.iter().map(String::as_str)
    }

    pub fn component_set(&self) -> &BTreeSet<String> {
        &self.components
    }

    /// Number of keys overtyped in this cell.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Whether this glyph is a single key typed once under its own name.
    pub fn is_elemental(&self) -> bool {
        self.components.len() == 1 && self.components.contains(&self.name)
    }

    /// Mean fingerprint intensity (0 = solid ink, 255 = blank).
    pub fn mean_value(&self) -> f32 {
        self.fingerprint.iter().sum::<f32>() / self.fingerprint.len() as f32
    }

    /// The fingerprint scaled back up to bitmap size, showing what matching sees.
    pub fn fingerprint_display(&self) -> GrayImage {
        let (width, height) = self.image.dimensions();
        let sw = self.samples.width as u64;
        let sh = self.samples.height as u64;
        GrayImage::from_fn(width, height, |x, y| {
            let cx = (x as u64 * sw / width as u64) as usize;
            let cy = (y as u64 * sh / height as u64) as usize;
            let value = self.fingerprint[cy * sw as usize + cx];
            Luma([value.round().clamp(0.0, 255.0) as u8])
        })
    }
}

impl PartialEq for Glyph {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.samples == other.samples && self.image == other.image
    }
}

impl std::fmt::Display for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Canonical name for a stack of keys: sorted names joined by [`NAME_SEPARATOR`].
pub fn stack_name<'a>(components: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = components.into_iter().collect();
    names.sort_unstable();
    let mut out = String::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.push(NAME_SEPARATOR);
        }
        out.push_str(name);
    }
    out
}

/// Block-average a bitmap into `samples.width * samples.height` cells.
///
/// Cell boundaries fall on fractional pixel positions when the bitmap size is
/// not a multiple of the samples; edge pixels then contribute by covered area.
pub fn fingerprint(image: &GrayImage, samples: Samples) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let step_x = width as f64 / samples.width as f64;
    let step_y = height as f64 / samples.height as f64;

    let mut out = Vec::with_capacity(samples.len());
    for cy in 0..samples.height {
        let y0 = cy as f64 * step_y;
        let y1 = y0 + step_y;
        for cx in 0..samples.width {
            let x0 = cx as f64 * step_x;
            let x1 = x0 + step_x;

            let mut sum = 0.0;
            let mut area = 0.0;
            for py in (y0.floor() as u32)..(y1.ceil() as u32).min(height) {
                let wy = coverage(py, y0, y1);
                if wy <= 0.0 {
                    continue;
                }
                for px in (x0.floor() as u32)..(x1.ceil() as u32).min(width) {
                    let weight = coverage(px, x0, x1) * wy;
                    sum += weight * image.get_pixel(px, py).0[0] as f64;
                    area += weight;
                }
            }
            out.push(if area > 0.0 { (sum / area) as f32 } else { 255.0 });
        }
    }
    out
}

/// Length of `[p, p + 1)` that lies inside `[lo, hi)`.
fn coverage(p: u32, lo: f64, hi: f64) -> f64 {
    let p = p as f64;
    (hi.min(p + 1.0) - lo.max(p)).max(0.0)
}
