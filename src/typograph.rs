//! Typograph facade: top-level API for converting images into typed art.
//!
//! The `Typograph` owns the glyph collection and the fingerprint indexes
//! built from it. Conversions read one index snapshot; mutations build a new
//! collection and index set off to the side and swap them in only once the
//! rebuild has succeeded, so a conversion never sees a half-built index.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use image::GrayImage;

use crate::art::{GlyphGrid, TypedArt};
use crate::chunk::ChunkGrid;
use crate::compose::Composer;
use crate::config::{ConvertOptions, TypographConfig};
use crate::error::{GlyphError, MatchError, TypoResult};
use crate::glyph::Glyph;
use crate::glyph::collection::{GlyphCollection, RemoveScope};
use crate::index::IndexSet;
use crate::matcher::Matcher;
use crate::simd;

/// Image-to-typewriter converter over one glyph library.
pub struct Typograph {
    config: TypographConfig,
    collection: RwLock<GlyphCollection>,
    indexes: RwLock<Arc<IndexSet>>,
}

impl Typograph {
    /// Create a converter with every glyph combinable.
    pub fn new(config: TypographConfig, glyphs: impl IntoIterator<Item = Glyph>) -> TypoResult<Self> {
        config.validate()?;
        let collection = GlyphCollection::from_glyphs(config.samples, glyphs)?;
        Self::with_collection(config, collection)
    }

    /// Create a converter over a prepared collection.
    pub fn with_collection(config: TypographConfig, collection: GlyphCollection) -> TypoResult<Self> {
        config.validate()?;
        if collection.samples() != config.samples {
            return Err(GlyphError::SamplesMismatch {
                expected: config.samples.to_string(),
                actual: collection.samples().to_string(),
            }
            .into());
        }

        tracing::info!(
            isa = %simd::kernel().isa_level(),
            samples = %config.samples,
            glyph_depth = config.glyph_depth,
            glyphs = collection.len(),
            "initializing typograph"
        );
        let indexes = IndexSet::build(&collection, config.glyph_depth)?;

        Ok(Self {
            config,
            collection: RwLock::new(collection),
            indexes: RwLock::new(Arc::new(indexes)),
        })
    }

    /// Add or replace a glyph and rebuild the indexes.
    ///
    /// On error neither the collection nor the indexes change.
    pub fn add_glyph(&self, glyph: Glyph, use_in_combinations: bool) -> TypoResult<()> {
        self.add_glyphs([glyph], use_in_combinations)
    }

    /// Add several glyphs with a single index rebuild.
    pub fn add_glyphs(
        &self,
        glyphs: impl IntoIterator<Item = Glyph>,
        use_in_combinations: bool,
    ) -> TypoResult<()> {
        let mut current = write(&self.collection);
        let mut next = current.clone();
        for glyph in glyphs {
            next.add(glyph, use_in_combinations)?;
        }
        self.swap(&mut current, next)
    }

    /// Remove a glyph from the given subsets and rebuild the indexes.
    ///
    /// Returns `Ok(None)` without rebuilding when the name is absent.
    pub fn remove_glyph(&self, name: &str, scope: RemoveScope) -> TypoResult<Option<Arc<Glyph>>> {
        let mut current = write(&self.collection);
        let mut next = current.clone();
        let Some(removed) = next.remove(name, scope) else {
            tracing::debug!(name, ?scope, "glyph not in collection");
            return Ok(None);
        };
        self.swap(&mut current, next)?;
        Ok(Some(removed))
    }

    fn swap(
        &self,
        current: &mut RwLockWriteGuard<'_, GlyphCollection>,
        next: GlyphCollection,
    ) -> TypoResult<()> {
        let indexes = IndexSet::build(&next, self.config.glyph_depth)?;
        **current = next;
        *write(&self.indexes) = Arc::new(indexes);
        Ok(())
    }

    /// Convert a chunk grid with the configured options.
    pub fn convert(&self, chunks: &ChunkGrid) -> TypoResult<TypedArt> {
        self.convert_with(chunks, &self.config.convert_options())
    }

    /// Chunk a preprocessed grayscale image and convert it.
    ///
    /// The image must be `columns * samples.width` by `rows * samples.height`.
    pub fn convert_image(&self, image: &GrayImage, options: &ConvertOptions) -> TypoResult<TypedArt> {
        let chunks = ChunkGrid::from_luma(image, self.config.samples)?;
        self.convert_with(&chunks, options)
    }

    /// Convert a chunk grid with per-call options.
    pub fn convert_with(&self, chunks: &ChunkGrid, options: &ConvertOptions) -> TypoResult<TypedArt> {
        options.validate()?;
        if let Some(background) = &options.background {
            read(&self.collection).check(background)?;
        }

        let indexes = self.indexes();
        let mut matcher = Matcher::new(&indexes, options.cutoff);
        if let Some(background) = &options.background {
            matcher = matcher.with_background(background)?;
        }
        let matches = matcher.match_grid(chunks)?;

        let cells = matches.into_iter().map(|m| m.glyph).collect();
        let grid = GlyphGrid::new(chunks.width(), chunks.height(), cells).ok_or(
            MatchError::GridShape {
                width: chunks.width(),
                height: chunks.height(),
                chunks: chunks.len(),
            },
        )?;
        let lines = Composer::from_options(options).compose(&grid);

        tracing::debug!(
            width = grid.width(),
            height = grid.height(),
            cutoff = options.cutoff,
            lines = lines.len(),
            version = indexes.version(),
            "converted chunk grid"
        );
        Ok(TypedArt { lines, grid })
    }

    /// Current index snapshot.
    pub fn indexes(&self) -> Arc<IndexSet> {
        Arc::clone(&read(&self.indexes))
    }

    /// Look up a glyph in the collection by name.
    pub fn glyph(&self, name: &str) -> Option<Arc<Glyph>> {
        read(&self.collection).get(name).cloned()
    }

    /// Copy of the current collection.
    pub fn collection(&self) -> GlyphCollection {
        read(&self.collection).clone()
    }

    /// Collection version the current indexes were built from.
    pub fn version(&self) -> u64 {
        self.indexes().version()
    }

    pub fn config(&self) -> &TypographConfig {
        &self.config
    }

    /// Summary of the library and indexes.
    pub fn info(&self) -> TypographInfo {
        let collection = read(&self.collection);
        let indexes = self.indexes();
        TypographInfo {
            samples: self.config.samples.to_string(),
            glyph_depth: self.config.glyph_depth,
            isa_level: simd::kernel().isa_level().to_string(),
            combinable: collection.combinable().count(),
            standalone: collection.standalone().count(),
            indexed: indexes.iter().map(|index| index.len()).collect(),
            value_extrema: indexes.value_extrema(),
            version: indexes.version(),
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Summary information about a [`Typograph`].
#[derive(Debug, Clone)]
pub struct TypographInfo {
    pub samples: String,
    pub glyph_depth: usize,
    pub isa_level: String,
    pub combinable: usize,
    pub standalone: usize,
    /// Glyph count per depth, shallowest first.
    pub indexed: Vec<usize>,
    /// Darkest and lightest mean glyph value.
    pub value_extrema: Option<(f32, f32)>,
    pub version: u64,
}

impl std::fmt::Display for TypographInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "typograph info")?;
        writeln!(f, "  samples:      {}", self.samples)?;
        writeln!(f, "  depth:        {}", self.glyph_depth)?;
        writeln!(f, "  isa:          {}", self.isa_level)?;
        writeln!(f, "  combinable:   {}", self.combinable)?;
        writeln!(f, "  standalone:   {}", self.standalone)?;
        writeln!(f, "  indexed:      {:?}", self.indexed)?;
        if let Some((min, max)) = self.value_extrema {
            writeln!(f, "  values:       {min:.1}..{max:.1}")?;
        }
        writeln!(f, "  version:      {}", self.version)?;
        Ok(())
    }
}

impl std::fmt::Debug for Typograph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typograph")
            .field("config", &self.config)
            .field("indexes", &self.indexes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::config::Samples;
    use crate::error::{ConfigError, TypoError};

    fn config() -> TypographConfig {
        TypographConfig {
            samples: Samples::square(1),
            glyph_depth: 2,
            cutoff: 0.0,
            ..Default::default()
        }
    }

    fn solid(name: &str, value: u8) -> Glyph {
        Glyph::new(name, GrayImage::from_pixel(2, 2, Luma([value])), Samples::square(1)).unwrap()
    }

    #[test]
    fn invalid_config_rejected_before_building() {
        let bad = TypographConfig {
            glyph_depth: 0,
            ..config()
        };
        assert!(matches!(
            Typograph::new(bad, [solid("a", 0)]),
            Err(TypoError::Config(ConfigError::InvalidDepth { depth: 0 }))
        ));
    }

    #[test]
    fn add_rebuilds_indexes() {
        let typo = Typograph::new(config(), [solid("a", 100)]).unwrap();
        let before = typo.indexes();
        assert_eq!(before.depth(2).unwrap().len(), 0);

        typo.add_glyph(solid("b", 200), true).unwrap();
        let after = typo.indexes();
        assert_eq!(after.depth(1).unwrap().len(), 2);
        assert_eq!(after.depth(2).unwrap().len(), 1);
        assert!(after.version() > before.version());
        // Old snapshot untouched.
        assert_eq!(before.depth(1).unwrap().len(), 1);
    }

    #[test]
    fn failed_add_leaves_state_unchanged() {
        let typo = Typograph::new(config(), [solid("a", 100)]).unwrap();
        let version = typo.version();
        let wrong_size =
            Glyph::new("big", GrayImage::new(3, 3), Samples::square(1)).unwrap();
        assert!(matches!(
            typo.add_glyph(wrong_size, true),
            Err(TypoError::Glyph(GlyphError::SizeMismatch { .. }))
        ));
        assert_eq!(typo.version(), version);
        assert!(typo.glyph("big").is_none());
    }

    #[test]
    fn removing_missing_glyph_is_not_an_error() {
        let typo = Typograph::new(config(), [solid("a", 100)]).unwrap();
        let version = typo.version();
        assert!(typo.remove_glyph("zz", RemoveScope::Both).unwrap().is_none());
        assert_eq!(typo.version(), version);
    }

    #[test]
    fn remove_rebuilds_indexes() {
        let typo = Typograph::new(config(), [solid("a", 100), solid("b", 200)]).unwrap();
        let removed = typo.remove_glyph("b", RemoveScope::Both).unwrap().unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(typo.indexes().depth(1).unwrap().len(), 1);
        assert_eq!(typo.indexes().depth(2).unwrap().len(), 0);
    }

    #[test]
    fn convert_produces_lines_and_grid() {
        let typo = Typograph::new(config(), [solid("a", 0), solid("b", 255)]).unwrap();
        let chunks =
            ChunkGrid::from_vectors(3, 1, vec![vec![0.0], vec![0.0], vec![250.0]]).unwrap();
        let art = typo.convert(&chunks).unwrap();
        assert_eq!(art.instructions(), "0 | 2a 1b");
        assert_eq!(art.grid.get(0, 2).unwrap().name(), "b");
    }

    #[test]
    fn mismatched_background_rejected() {
        let typo = Typograph::new(config(), [solid("a", 0)]).unwrap();
        let background =
            Arc::new(Glyph::new("bg", GrayImage::new(4, 4), Samples::square(1)).unwrap());
        let chunks = ChunkGrid::from_vectors(1, 1, vec![vec![0.0]]).unwrap();
        let options = ConvertOptions::default().with_background(background);
        assert!(matches!(
            typo.convert_with(&chunks, &options),
            Err(TypoError::Glyph(GlyphError::SizeMismatch { .. }))
        ));
    }

    #[test]
    fn non_finite_cutoff_rejected() {
        let typo = Typograph::new(config(), [solid("a", 0)]).unwrap();
        let chunks = ChunkGrid::from_vectors(1, 1, vec![vec![0.0]]).unwrap();
        let options = ConvertOptions::default().with_cutoff(f64::NAN);
        assert!(matches!(
            typo.convert_with(&chunks, &options),
            Err(TypoError::Config(ConfigError::InvalidCutoff { .. }))
        ));
    }

    #[test]
    fn info_reports_subsets() {
        let typo = Typograph::new(config(), [solid("a", 0), solid("b", 255)]).unwrap();
        typo.add_glyph(solid("c", 128), false).unwrap();
        let info = typo.info();
        assert_eq!(info.combinable, 2);
        assert_eq!(info.standalone, 1);
        assert_eq!(info.indexed, vec![3, 1]);
        assert!(info.to_string().contains("standalone:   1"));
    }
}
