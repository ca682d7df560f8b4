//! Rich diagnostic error types for the typograph engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know whether they are looking
//! at a configuration problem or an integration defect upstream.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the typograph engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum TypoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Glyph(#[from] GlyphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Glyph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GlyphError {
    #[error("cannot overtype \"{name}\" with \"{component}\": component already present")]
    #[diagnostic(
        code(typo::glyph::self_combination),
        help(
            "A glyph may not be combined with itself or with one of its own components. \
             Each elemental key can appear at most once in an overtype stack."
        )
    )]
    SelfCombination { name: String, component: String },

    #[error("glyph \"{name}\" has an empty bitmap")]
    #[diagnostic(
        code(typo::glyph::empty_image),
        help("Glyph bitmaps must be at least 1x1 pixels.")
    )]
    EmptyImage { name: String },

    #[error("glyph bitmap size mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    #[diagnostic(
        code(typo::glyph::size_mismatch),
        help(
            "All glyphs in a collection are typed into the same monospaced cell. \
             Crop or pad the glyph images to a common size."
        )
    )]
    SizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("fingerprint samples mismatch: {expected} vs {actual}")]
    #[diagnostic(
        code(typo::glyph::samples_mismatch),
        help("Glyphs can only be combined or indexed together when built with the same samples.")
    )]
    SamplesMismatch { expected: String, actual: String },

    #[error("glyph \"{name}\" declares an empty component list")]
    #[diagnostic(
        code(typo::glyph::empty_components),
        help("Omit the component list for an elemental glyph, or name at least one key.")
    )]
    EmptyComponents { name: String },
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("fingerprint dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(typo::index::dim_mismatch),
        help(
            "Query vectors must have samples.width * samples.height components, \
             the same as the fingerprints the index was built from."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("fingerprint index for depth {depth} is empty")]
    #[diagnostic(
        code(typo::index::empty),
        help("Add glyphs to the collection before querying this depth.")
    )]
    EmptyIndex { depth: usize },
}

// ---------------------------------------------------------------------------
// Matching errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    #[error("chunk ({row}, {column}) has {actual} samples, expected {expected}")]
    #[diagnostic(
        code(typo::matcher::dim_mismatch),
        help(
            "The chunker produced vectors at a different resolution than the glyph \
             fingerprints. Chunk with the same samples the Typograph was configured with."
        )
    )]
    DimensionMismatch {
        row: usize,
        column: usize,
        expected: usize,
        actual: usize,
    },

    #[error("chunk grid shape {width}x{height} does not hold {chunks} chunks")]
    #[diagnostic(
        code(typo::matcher::grid_shape),
        help("A chunk grid must contain exactly width * height chunks, listed row by row.")
    )]
    GridShape {
        width: usize,
        height: usize,
        chunks: usize,
    },

    #[error("alpha for chunk ({row}, {column}) has {actual} samples, expected {expected}")]
    #[diagnostic(
        code(typo::matcher::alpha_shape),
        help("Alpha values are supplied per fingerprint sample, one per value.")
    )]
    AlphaShape {
        row: usize,
        column: usize,
        expected: usize,
        actual: usize,
    },

    #[error("image of {width}x{height} pixels cannot be split into {samples} chunks")]
    #[diagnostic(
        code(typo::matcher::image_size),
        help("Resize the image to a whole number of cells: columns * samples.width by rows * samples.height.")
    )]
    ImageSize {
        width: u32,
        height: u32,
        samples: String,
    },

    #[error("no glyphs available at depth {depth}")]
    #[diagnostic(
        code(typo::matcher::empty_library),
        help(
            "Matching needs at least one typeable glyph. Add glyphs to the collection \
             (combinable or standalone) before converting."
        )
    )]
    EmptyLibrary { depth: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Glyph(#[from] GlyphError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid samples {width}x{height}: both dimensions must be positive")]
    #[diagnostic(
        code(typo::config::samples),
        help("Use at least (1, 1). The original default is (3, 3).")
    )]
    InvalidSamples { width: u32, height: u32 },

    #[error("invalid glyph depth {depth}: must be at least 1")]
    #[diagnostic(
        code(typo::config::depth),
        help("A depth of 1 disables overtyping; 2 or 3 are typical.")
    )]
    InvalidDepth { depth: usize },

    #[error("invalid cutoff {cutoff}: must be a finite number")]
    #[diagnostic(
        code(typo::config::cutoff),
        help("0.0 always takes the closest match; 1.0 always prefers single keystrokes.")
    )]
    InvalidCutoff { cutoff: f64 },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(typo::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(typo::config::parse),
        help("Check the TOML syntax in the config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(typo::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning typograph results.
pub type TypoResult<T> = std::result::Result<T, TypoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_error_converts_to_typo_error() {
        let err = GlyphError::SelfCombination {
            name: "O".into(),
            component: "O".into(),
        };
        let typo: TypoError = err.into();
        assert!(matches!(
            typo,
            TypoError::Glyph(GlyphError::SelfCombination { .. })
        ));
    }

    #[test]
    fn match_error_wraps_index_error() {
        let err: MatchError = IndexError::EmptyIndex { depth: 2 }.into();
        assert!(matches!(
            err,
            MatchError::Index(IndexError::EmptyIndex { depth: 2 })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = MatchError::DimensionMismatch {
            row: 4,
            column: 7,
            expected: 9,
            actual: 4,
        };
        let msg = format!("{err}");
        assert!(msg.contains("(4, 7)"));
        assert!(msg.contains('9'));
    }
}
