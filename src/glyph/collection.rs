//! The glyph library: combinable and standalone glyphs.
//!
//! Combinable glyphs are used on their own and as members of overtype stacks.
//! Standalone glyphs are only ever typed alone. A name lives in at most one of
//! the two subsets; adding it to one moves it out of the other.
//!
//! Every successful mutation bumps [`GlyphCollection::version`], which is how
//! index sets built from the collection know they are stale.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::combinations::{self, Combinations};
use super::{Glyph, GlyphResult};
use crate::config::Samples;
use crate::error::GlyphError;

/// Which subset a removal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveScope {
    /// Only the combinable subset.
    Combinations,
    /// Only the standalone subset.
    Standalone,
    /// Both subsets.
    #[default]
    Both,
}

impl RemoveScope {
    fn includes_combinations(self) -> bool {
        matches!(self, RemoveScope::Combinations | RemoveScope::Both)
    }

    fn includes_standalone(self) -> bool {
        matches!(self, RemoveScope::Standalone | RemoveScope::Both)
    }
}

/// Owned, versioned glyph library.
#[derive(Debug, Clone)]
pub struct GlyphCollection {
    samples: Samples,
    cell: Option<(u32, u32)>,
    combinable: BTreeMap<String, Arc<Glyph>>,
    standalone: BTreeMap<String, Arc<Glyph>>,
    version: u64,
}

impl GlyphCollection {
    pub fn new(samples: Samples) -> Self {
        Self {
            samples,
            cell: None,
            combinable: BTreeMap::new(),
            standalone: BTreeMap::new(),
            version: 0,
        }
    }

    /// Build a collection where every glyph is combinable.
    pub fn from_glyphs(
        samples: Samples,
        glyphs: impl IntoIterator<Item = Glyph>,
    ) -> GlyphResult<Self> {
        let mut collection = Self::new(samples);
        for glyph in glyphs {
            collection.add(glyph, true)?;
        }
        Ok(collection)
    }

    /// Add a glyph, replacing any glyph of the same name.
    ///
    /// A glyph added as combinable is removed from the standalone subset and
    /// vice versa. On error the collection is unchanged.
    pub fn add(&mut self, glyph: Glyph, use_in_combinations: bool) -> GlyphResult<()> {
        self.check(&glyph)?;
        self.cell.get_or_insert(glyph.image().dimensions());

        let name = glyph.name().to_string();
        let glyph = Arc::new(glyph);
        if use_in_combinations {
            self.standalone.remove(&name);
            self.combinable.insert(name, glyph);
        } else {
            self.combinable.remove(&name);
            self.standalone.insert(name, glyph);
        }
        self.version += 1;
        Ok(())
    }

    /// Remove a glyph by name from the given subsets.
    ///
    /// Returns the removed glyph (the combinable one if both held it), or
    /// `None` when the name was not present, in which case nothing changes.
    pub fn remove(&mut self, name: &str, scope: RemoveScope) -> Option<Arc<Glyph>> {
        let from_combinations = if scope.includes_combinations() {
            self.combinable.remove(name)
        } else {
            None
        };
        let from_standalone = if scope.includes_standalone() {
            self.standalone.remove(name)
        } else {
            None
        };

        let removed = from_combinations.or(from_standalone);
        if removed.is_some() {
            self.version += 1;
            if self.is_empty() {
                self.cell = None;
            }
        }
        removed
    }

    /// Validate a glyph against the collection without changing it.
    pub fn check(&self, glyph: &Glyph) -> GlyphResult<()> {
        if glyph.samples() != self.samples {
            return Err(GlyphError::SamplesMismatch {
                expected: self.samples.to_string(),
                actual: glyph.samples().to_string(),
            });
        }
        if let Some((width, height)) = self.cell {
            let (actual_width, actual_height) = glyph.image().dimensions();
            if (width, height) != (actual_width, actual_height) {
                return Err(GlyphError::SizeMismatch {
                    expected_width: width,
                    expected_height: height,
                    actual_width,
                    actual_height,
                });
            }
        }
        Ok(())
    }

    /// Look up a glyph in either subset.
    pub fn get(&self, name: &str) -> Option<&Arc<Glyph>> {
        self.combinable.get(name).or_else(|| self.standalone.get(name))
    }

    pub fn is_combinable(&self, name: &str) -> bool {
        self.combinable.contains_key(name)
    }

    pub fn is_standalone(&self, name: &str) -> bool {
        self.standalone.contains_key(name)
    }

    /// Combinable glyphs in name order.
    pub fn combinable(&self) -> impl Iterator<Item = &Arc<Glyph>> {
        self.combinable.values()
    }

    /// Standalone glyphs in name order.
    pub fn standalone(&self) -> impl Iterator<Item = &Arc<Glyph>> {
        self.standalone.values()
    }

    /// Lazy subsets of the combinable glyphs of exactly `depth` members.
    pub fn combinations(&self, depth: usize) -> Combinations {
        Combinations::new(self.combinable_pool(), depth)
    }

    /// Every glyph typeable at exactly `depth` stacked keys.
    ///
    /// Depth 1 is the combinable glyphs plus the standalone ones; deeper
    /// levels are the merged stacks of combinable glyphs.
    pub fn glyphs_at_depth(&self, depth: usize) -> Vec<Arc<Glyph>> {
        match depth {
            0 => Vec::new(),
            1 => self
                .combinable
                .values()
                .chain(self.standalone.values())
                .cloned()
                .collect(),
            d => combinations::stacks(self.combinable_pool(), d)
                .map(Arc::new)
                .collect(),
        }
    }

    fn combinable_pool(&self) -> Arc<[Arc<Glyph>]> {
        self.combinable.values().cloned().collect()
    }

    pub fn samples(&self) -> Samples {
        self.samples
    }

    /// Bitmap size shared by every glyph, once the first glyph is added.
    pub fn cell_size(&self) -> Option<(u32, u32)> {
        self.cell
    }

    /// Number of successful mutations since creation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.combinable.len() + self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinable.is_empty() && self.standalone.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use rand::{Rng, SeedableRng};

    use super::*;

    fn glyph(name: &str, value: u8) -> Glyph {
        Glyph::new(name, GrayImage::from_pixel(2, 2, Luma([value])), Samples::square(2)).unwrap()
    }

    fn collection() -> GlyphCollection {
        GlyphCollection::from_glyphs(
            Samples::square(2),
            [glyph("a", 200), glyph("b", 150), glyph("c", 100)],
        )
        .unwrap()
    }

    #[test]
    fn from_glyphs_is_all_combinable() {
        let c = collection();
        assert_eq!(c.len(), 3);
        assert_eq!(c.combinable().count(), 3);
        assert_eq!(c.standalone().count(), 0);
        assert_eq!(c.cell_size(), Some((2, 2)));
    }

    #[test]
    fn adding_standalone_moves_out_of_combinable() {
        let mut c = collection();
        c.add(glyph("b", 150), false).unwrap();
        assert!(c.is_standalone("b"));
        assert!(!c.is_combinable("b"));
        assert_eq!(c.len(), 3);

        c.add(glyph("b", 150), true).unwrap();
        assert!(c.is_combinable("b"));
        assert!(!c.is_standalone("b"));
    }

    #[test]
    fn remove_missing_is_none_and_unversioned() {
        let mut c = collection();
        let before = c.version();
        assert!(c.remove("zz", RemoveScope::Both).is_none());
        assert_eq!(c.version(), before);
    }

    #[test]
    fn remove_respects_scope() {
        let mut c = collection();
        c.add(glyph("s", 10), false).unwrap();

        assert!(c.remove("s", RemoveScope::Combinations).is_none());
        assert!(c.is_standalone("s"));

        let removed = c.remove("s", RemoveScope::Standalone).unwrap();
        assert_eq!(removed.name(), "s");
        assert!(c.get("s").is_none());

        let removed = c.remove("a", RemoveScope::Both).unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn rejected_add_leaves_collection_unchanged() {
        let mut c = collection();
        let before = c.version();
        let wrong_size =
            Glyph::new("w", GrayImage::from_pixel(3, 2, Luma([0])), Samples::square(2)).unwrap();
        assert!(matches!(
            c.add(wrong_size, true),
            Err(GlyphError::SizeMismatch { .. })
        ));
        let wrong_samples =
            Glyph::new("w", GrayImage::from_pixel(2, 2, Luma([0])), Samples::square(1)).unwrap();
        assert!(matches!(
            c.add(wrong_samples, true),
            Err(GlyphError::SamplesMismatch { .. })
        ));
        assert_eq!(c.version(), before);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn subsets_stay_disjoint_under_random_mutation() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut c = GlyphCollection::new(Samples::square(2));
        let names = ["a", "b", "c", "d", "e"];
        let scopes = [RemoveScope::Combinations, RemoveScope::Standalone, RemoveScope::Both];

        for _ in 0..500 {
            let name = names[rng.gen_range(0..names.len())];
            if rng.gen_bool(0.6) {
                c.add(glyph(name, rng.r#gen()), rng.gen_bool(0.5)).unwrap();
            } else {
                c.remove(name, scopes[rng.gen_range(0..scopes.len())]);
            }
            for g in c.combinable() {
                assert!(!c.is_standalone(g.name()), "{} in both subsets", g.name());
            }
        }
    }

    #[test]
    fn depth_one_includes_standalone() {
        let mut c = collection();
        c.add(glyph("s", 10), false).unwrap();
        let names: Vec<String> = c
            .glyphs_at_depth(1)
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "s"]);
    }

    #[test]
    fn deeper_levels_use_only_combinable() {
        let mut c = collection();
        c.add(glyph("s", 10), false).unwrap();
        let names: Vec<String> = c
            .glyphs_at_depth(2)
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        assert_eq!(names, vec!["a b", "a c", "b c"]);
        assert!(c.glyphs_at_depth(4).is_empty());
        assert_eq!(c.combinations(3).count(), 1);
    }
}
