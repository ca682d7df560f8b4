//! Configuration for the typograph engine.
//!
//! Configuration is plain data: it can be built in code, or persisted as TOML.
//! Validation happens once, before any glyph or index state is created.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::glyph::Glyph;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Fingerprint resolution: number of samples across and down each glyph cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Samples {
    pub width: u32,
    pub height: u32,
}

impl Samples {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Same resolution in both directions.
    pub const fn square(n: u32) -> Self {
        Self::new(n, n)
    }

    /// Length of a fingerprint vector at this resolution.
    pub fn len(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn validate(self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidSamples {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl Default for Samples {
    fn default() -> Self {
        Self::square(3)
    }
}

impl std::fmt::Display for Samples {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypographConfig {
    /// Fingerprint resolution (default: 3x3).
    pub samples: Samples,
    /// Maximum number of keys overtyped into one cell (default: 2).
    pub glyph_depth: usize,
    /// Close-enough threshold for substituting shallower stacks (default: 0.3).
    pub cutoff: f64,
    /// Glyph name written for "advance one cell without typing" (default: `sp`).
    pub instruction_spacer: String,
    /// Keep the final spacer run on each instruction line.
    pub trailing_spacer: bool,
}

impl Default for TypographConfig {
    fn default() -> Self {
        Self {
            samples: Samples::default(),
            glyph_depth: 2,
            cutoff: 0.3,
            instruction_spacer: "sp".into(),
            trailing_spacer: false,
        }
    }
}

impl TypographConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.samples.validate()?;
        if self.glyph_depth < 1 {
            return Err(ConfigError::InvalidDepth {
                depth: self.glyph_depth,
            });
        }
        if !self.cutoff.is_finite() {
            return Err(ConfigError::InvalidCutoff {
                cutoff: self.cutoff,
            });
        }
        Ok(())
    }

    /// Per-conversion options seeded from this configuration.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            cutoff: self.cutoff,
            instruction_spacer: self.instruction_spacer.clone(),
            trailing_spacer: self.trailing_spacer,
            background: None,
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Options for a single conversion call.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Close-enough threshold. `0.0` disables substitution.
    pub cutoff: f64,
    /// Spacer glyph name used by the instruction composer.
    pub instruction_spacer: String,
    /// Keep the final spacer run on each instruction line.
    pub trailing_spacer: bool,
    /// Fixed overlay for transparent regions. Not part of the matching library.
    pub background: Option<Arc<Glyph>>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        TypographConfig::default().convert_options()
    }
}

impl ConvertOptions {
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_background(mut self, background: Arc<Glyph>) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_spacer(mut self, spacer: impl Into<String>) -> Self {
        self.instruction_spacer = spacer.into();
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.cutoff.is_finite() {
            return Err(ConfigError::InvalidCutoff {
                cutoff: self.cutoff,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TypographConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples, Samples::square(3));
        assert_eq!(config.glyph_depth, 2);
        assert_eq!(config.instruction_spacer, "sp");
    }

    #[test]
    fn zero_samples_rejected() {
        let config = TypographConfig {
            samples: Samples::new(0, 3),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSamples { width: 0, height: 3 })
        ));
    }

    #[test]
    fn zero_depth_rejected() {
        let config = TypographConfig {
            glyph_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDepth { depth: 0 })
        ));
    }

    #[test]
    fn nan_cutoff_rejected() {
        let options = ConvertOptions::default().with_cutoff(f64::NAN);
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidCutoff { .. })
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("typograph.toml");
        let config = TypographConfig {
            samples: Samples::new(4, 6),
            glyph_depth: 3,
            cutoff: 0.15,
            instruction_spacer: "space".into(),
            trailing_spacer: true,
        };
        config.save(&path).unwrap();
        let loaded = TypographConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("typograph.toml");
        std::fs::write(&path, "glyph_depth = 3\n").unwrap();
        let loaded = TypographConfig::load(&path).unwrap();
        assert_eq!(loaded.glyph_depth, 3);
        assert_eq!(loaded.samples, Samples::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("typograph.toml");
        std::fs::write(&path, "glyph_depth = \"deep\"\n").unwrap();
        assert!(matches!(
            TypographConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
