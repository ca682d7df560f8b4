//! Export types for serializing conversion results.
//!
//! These types give a flat, name-resolved view of a [`TypedArt`] suitable for
//! JSON export: the instruction lines with their runs, and the chosen glyph
//! name for every grid cell.

use serde::{Deserialize, Serialize};

use crate::art::TypedArt;
use crate::compose::InstructionLine;

/// Exported run of identical cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunExport {
    /// Number of consecutive cells.
    pub count: usize,
    /// Key name, or the spacer name for skipped cells.
    pub name: String,
    /// Whether the run advances without typing.
    pub spacer: bool,
}

/// Exported instruction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineExport {
    /// Image row the line belongs to.
    pub row: usize,
    /// Pass letter, absent for single-pass rows.
    pub pass: Option<String>,
    /// Full formatted line, e.g. `03b| 2B 1sp 4C`.
    pub text: String,
    pub runs: Vec<RunExport>,
}

impl From<&InstructionLine> for LineExport {
    fn from(line: &InstructionLine) -> Self {
        Self {
            row: line.row,
            pass: line.pass.clone(),
            text: line.to_string(),
            runs: line
                .runs
                .iter()
                .map(|run| RunExport {
                    count: run.count,
                    name: run.name.clone(),
                    spacer: run.spacer,
                })
                .collect(),
        }
    }
}

/// Exported conversion result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedArtExport {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    pub lines: Vec<LineExport>,
    /// Chosen glyph name per cell, row by row.
    pub cells: Vec<String>,
}

impl From<&TypedArt> for TypedArtExport {
    fn from(art: &TypedArt) -> Self {
        Self {
            width: art.grid.width(),
            height: art.grid.height(),
            lines: art.lines.iter().map(LineExport::from).collect(),
            cells: art
                .grid
                .cells()
                .iter()
                .map(|g| g.name().to_owned())
                .collect(),
        }
    }
}

impl TypedArt {
    /// Flattened, serializable view of this result.
    pub fn export(&self) -> TypedArtExport {
        TypedArtExport::from(self)
    }

    /// Pretty-printed JSON of [`TypedArt::export`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export())
    }
}
