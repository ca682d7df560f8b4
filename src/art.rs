//! Conversion results: the chosen-glyph grid and its instruction lines.

use std::sync::Arc;

use image::{GrayImage, Luma, imageops};

use crate::compose::InstructionLine;
use crate::glyph::Glyph;

/// Row-major grid of chosen glyphs, one per typing position.
#[derive(Debug, Clone)]
pub struct GlyphGrid {
    width: usize,
    height: usize,
    cells: Vec<Arc<Glyph>>,
}

impl GlyphGrid {
    /// Returns `None` unless `cells.len() == width * height`.
    pub fn new(width: usize, height: usize, cells: Vec<Arc<Glyph>>) -> Option<Self> {
        (width.checked_mul(height) == Some(cells.len())).then_some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[Arc<Glyph>] {
        &self.cells
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Arc<Glyph>> {
        if column >= self.width {
            return None;
        }
        self.cells.get(row * self.width + column)
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Arc<Glyph>]> {
        self.cells.chunks(self.width.max(1))
    }

    /// Cell size in pixels, taken from the first glyph.
    pub fn cell_size(&self) -> Option<(u32, u32)> {
        self.cells.first().map(|g| g.image().dimensions())
    }

    /// Total keys pressed to type the grid, counting every overtyped key.
    pub fn keystrokes(&self) -> usize {
        self.cells.iter().map(|g| g.depth()).sum()
    }

    /// Stamp each glyph's bitmap at its grid position.
    pub fn render_output(&self) -> GrayImage {
        self.stamp(|glyph| glyph.image().clone())
    }

    /// Stamp each glyph's upscaled fingerprint, showing what matching compared.
    pub fn render_calculation(&self) -> GrayImage {
        self.stamp(Glyph::fingerprint_display)
    }

    fn stamp(&self, tile: impl Fn(&Glyph) -> GrayImage) -> GrayImage {
        let Some((cell_width, cell_height)) = self.cell_size() else {
            return GrayImage::new(0, 0);
        };
        let mut canvas = GrayImage::from_pixel(
            cell_width * self.width as u32,
            cell_height * self.height as u32,
            Luma([255]),
        );
        for (i, glyph) in self.cells.iter().enumerate() {
            let x = (i % self.width) as i64 * cell_width as i64;
            let y = (i / self.width) as i64 * cell_height as i64;
            imageops::replace(&mut canvas, &tile(glyph), x, y);
        }
        canvas
    }
}

/// Everything one conversion produces.
#[derive(Debug, Clone)]
pub struct TypedArt {
    pub lines: Vec<InstructionLine>,
    pub grid: GlyphGrid,
}

impl TypedArt {
    /// Instruction lines as text, one per line.
    pub fn instructions(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines belonging to one image row.
    pub fn row_lines(&self, row: usize) -> impl Iterator<Item = &InstructionLine> {
        self.lines.iter().filter(move |line| line.row == row)
    }

    pub fn render_output(&self) -> GrayImage {
        self.grid.render_output()
    }

    pub fn render_calculation(&self) -> GrayImage {
        self.grid.render_calculation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Samples;

    fn solid(name: &str, value: u8) -> Arc<Glyph> {
        let image = GrayImage::from_pixel(2, 3, Luma([value]));
        Arc::new(Glyph::new(name, image, Samples::square(1)).unwrap())
    }

    #[test]
    fn grid_shape_checked() {
        assert!(GlyphGrid::new(2, 2, vec![solid("a", 0); 3]).is_none());
        assert!(GlyphGrid::new(0, 0, Vec::new()).is_some());
    }

    #[test]
    fn output_stamps_cells_in_place() {
        let grid = GlyphGrid::new(2, 1, vec![solid("a", 10), solid("b", 200)]).unwrap();
        let out = grid.render_output();
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out.get_pixel(1, 2).0[0], 10);
        assert_eq!(out.get_pixel(2, 0).0[0], 200);
    }

    #[test]
    fn calculation_shows_fingerprint() {
        let mut image = GrayImage::from_pixel(2, 2, Luma([0]));
        image.put_pixel(0, 0, Luma([200]));
        let glyph = Arc::new(Glyph::new("g", image, Samples::square(1)).unwrap());
        let grid = GlyphGrid::new(1, 1, vec![glyph]).unwrap();
        let calc = grid.render_calculation();
        assert!(calc.pixels().all(|p| p.0[0] == 50));
    }

    #[test]
    fn empty_grid_renders_empty_image() {
        let grid = GlyphGrid::new(0, 0, Vec::new()).unwrap();
        assert_eq!(grid.render_output().dimensions(), (0, 0));
        assert_eq!(grid.rows().count(), 0);
    }

    #[test]
    fn keystrokes_count_stack_depth() {
        let a = solid("a", 0);
        let b = solid("b", 0);
        let ab = Arc::new(a.combine(&b).unwrap());
        let grid = GlyphGrid::new(3, 1, vec![a, b, ab]).unwrap();
        assert_eq!(grid.keystrokes(), 4);
    }
}
