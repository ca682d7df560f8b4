//! Instruction composer: turns rows of chosen glyphs into typed lines.
//!
//! A row whose deepest stack has `R` keys is typed in `R` carriage passes.
//! Each column's keys are spread over the passes so that a key also present
//! in the previous column stays on the same pass, keeping consecutive runs
//! of the same key unbroken. Keys without such a slot fill the remaining
//! passes top to bottom, which leaves any slack on the last pass.
//!
//! This is a greedy heuristic and is kept as is: it does not balance runs
//! across passes or rows.
//!
//! Each pass is then run-length encoded into a line such as
//! `03b| 2B 1sp 4C`: row number zero-padded to the digits of the grid
//! height, a pass letter when the row needs more than one pass, and the
//! `<count><name>` runs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::art::GlyphGrid;
use crate::config::ConvertOptions;
use crate::glyph::Glyph;

/// Consecutive presses of one key, or consecutive skipped cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub count: usize,
    pub name: String,
    /// Cells advanced without typing, written with the spacer name.
    pub spacer: bool,
}

impl Run {
    fn start(slot: Option<&str>, spacer: &str) -> Self {
        match slot {
            Some(name) => Self {
                count: 1,
                name: name.to_owned(),
                spacer: false,
            },
            None => Self {
                count: 1,
                name: spacer.to_owned(),
                spacer: true,
            },
        }
    }

    fn continues(&self, slot: Option<&str>) -> bool {
        match slot {
            Some(name) => !self.spacer && self.name == name,
            None => self.spacer,
        }
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.name)
    }
}

/// One carriage pass over one image row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionLine {
    pub row: usize,
    /// Pass letter; `None` when the row is typed in a single pass.
    pub pass: Option<String>,
    pub runs: Vec<Run>,
    /// Zero-padded width of the row number.
    pub label_width: usize,
}

impl InstructionLine {
    /// The runs alone, e.g. `1C 2A`.
    pub fn runs_text(&self) -> String {
        let mut out = String::new();
        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&run.to_string());
        }
        out
    }

    /// Row and pass label, e.g. `07a` or `07 `.
    pub fn label(&self) -> String {
        format!(
            "{:0width$}{}",
            self.row,
            self.pass.as_deref().unwrap_or(" "),
            width = self.label_width
        )
    }

    /// Expand runs back into one slot per typed cell; `None` marks a skip.
    ///
    /// Cells after a dropped trailing spacer run are not included.
    pub fn expand(&self) -> Vec<Option<&str>> {
        let mut cells = Vec::new();
        for run in &self.runs {
            let slot = (!run.spacer).then_some(run.name.as_str());
            cells.extend(std::iter::repeat_n(slot, run.count));
        }
        cells
    }

    /// Number of cells typed or skipped on this pass.
    pub fn cells(&self) -> usize {
        self.runs.iter().map(|r| r.count).sum()
    }
}

impl fmt::Display for InstructionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}| {}", self.label(), self.runs_text())
    }
}

/// Builds instruction lines from a grid of chosen glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    spacer: String,
    trailing_spacer: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new("sp")
    }
}

impl Composer {
    pub fn new(spacer: impl Into<String>) -> Self {
        Self {
            spacer: spacer.into(),
            trailing_spacer: false,
        }
    }

    pub fn from_options(options: &ConvertOptions) -> Self {
        Self::new(options.instruction_spacer.clone()).with_trailing_spacer(options.trailing_spacer)
    }

    /// Keep the final spacer run on each line instead of dropping it.
    pub fn with_trailing_spacer(mut self, keep: bool) -> Self {
        self.trailing_spacer = keep;
        self
    }

    pub fn spacer(&self) -> &str {
        &self.spacer
    }

    /// Lines for every row of `grid`, in row order then pass order.
    pub fn compose(&self, grid: &GlyphGrid) -> Vec<InstructionLine> {
        let label_width = decimal_digits(grid.height());
        grid.rows()
            .enumerate()
            .flat_map(|(row, cells)| self.compose_row(row, cells, label_width))
            .collect()
    }

    /// Lines for a single row. An empty row yields no lines.
    pub fn compose_row(
        &self,
        row: usize,
        cells: &[Arc<Glyph>],
        label_width: usize,
    ) -> Vec<InstructionLine> {
        let columns: Vec<Vec<&str>> = cells.iter().map(|g| g.components().collect()).collect();
        let passes = pack_columns(&columns);
        let lettered = passes.len() > 1;

        passes
            .iter()
            .enumerate()
            .map(|(pass, slots)| InstructionLine {
                row,
                pass: lettered.then(|| pass_letters(pass)),
                runs: self.encode(slots),
                label_width,
            })
            .collect()
    }

    fn encode(&self, slots: &[Option<&str>]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for &slot in slots {
            match runs.last_mut() {
                Some(run) if run.continues(slot) => run.count += 1,
                _ => runs.push(Run::start(slot, &self.spacer)),
            }
        }
        if !self.trailing_spacer && runs.last().is_some_and(|run| run.spacer) {
            runs.pop();
        }
        runs
    }
}

/// Spread each column's keys over carriage passes.
///
/// Returns one `Vec` per pass with one slot per column. The pass count is the
/// largest column. Within a column, a key that occupied pass `i` in the
/// previous column takes pass `i` again; the others fill the free passes in
/// ascending order, in the order given.
pub fn pack_columns<'a>(columns: &[Vec<&'a str>]) -> Vec<Vec<Option<&'a str>>> {
    let depth = columns.iter().map(Vec::len).max().unwrap_or(0);
    let mut passes: Vec<Vec<Option<&str>>> = vec![Vec::with_capacity(columns.len()); depth];
    let mut previous: Vec<Option<&str>> = vec![None; depth];

    for keys in columns {
        let mut slots: Vec<Option<&str>> = vec![None; depth];
        let mut deferred = Vec::new();
        for &key in keys {
            match previous.iter().position(|&p| p == Some(key)) {
                Some(i) if slots[i].is_none() => slots[i] = Some(key),
                _ => deferred.push(key),
            }
        }

        let free: Vec<usize> = (0..depth).filter(|&i| slots[i].is_none()).collect();
        for (key, i) in deferred.into_iter().zip(free) {
            slots[i] = Some(key);
        }

        for (pass, &slot) in passes.iter_mut().zip(&slots) {
            pass.push(slot);
        }
        previous = slots;
    }
    passes
}

/// Rebuild each column's key set from the lines of one row.
pub fn replay_row(lines: &[InstructionLine], width: usize) -> Vec<BTreeSet<String>> {
    let mut columns = vec![BTreeSet::new(); width];
    for line in lines {
        for (column, slot) in line.expand().into_iter().enumerate() {
            if let (Some(name), Some(keys)) = (slot, columns.get_mut(column)) {
                keys.insert(name.to_owned());
            }
        }
    }
    columns
}

/// Spreadsheet-style pass letters: `a`..`z`, `aa`, `ab`, ...
pub fn pass_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(char::from(b'a' + (index % 26) as u8));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn decimal_digits(n: usize) -> usize {
    n.to_string().len()
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use super::*;
    use crate::config::Samples;

    fn key(name: &str) -> Glyph {
        Glyph::blank(name, 2, 2, Samples::square(1)).unwrap()
    }

    fn stack(names: &[&str]) -> Arc<Glyph> {
        let mut glyph = key(names[0]);
        for name in &names[1..] {
            glyph = glyph.combine(&key(name)).unwrap();
        }
        Arc::new(glyph)
    }

    #[test]
    fn worked_row_packs_into_three_passes() {
        let row = [stack(&["B", "C", "D"]), stack(&["A", "B", "D"]), stack(&["A"])];
        let lines = Composer::new("sp").compose_row(0, &row, 1);

        let texts: Vec<String> = lines.iter().map(InstructionLine::runs_text).collect();
        assert_eq!(texts, ["2B", "1C 2A", "2D"]);
        let labels: Vec<String> = lines.iter().map(InstructionLine::label).collect();
        assert_eq!(labels, ["0a", "0b", "0c"]);
    }

    #[test]
    fn carried_keys_keep_their_pass() {
        let columns = vec![vec!["A", "B"], vec!["B", "C"], vec!["C"]];
        let passes = pack_columns(&columns);
        assert_eq!(
            passes,
            vec![
                vec![Some("A"), Some("C"), Some("C")],
                vec![Some("B"), Some("B"), None],
            ]
        );
    }

    #[test]
    fn short_columns_leave_slack_on_last_pass() {
        let columns = vec![vec!["A"], vec!["B", "C", "D"], vec!["E"]];
        let passes = pack_columns(&columns);
        assert_eq!(passes[0], vec![Some("A"), Some("B"), Some("E")]);
        assert_eq!(passes[2], vec![None, Some("D"), None]);
    }

    #[test]
    fn single_pass_rows_use_blank_letter() {
        let row = [stack(&["x"]), stack(&["x"]), stack(&["y"])];
        let lines = Composer::new("sp").compose_row(4, &row, 2);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].to_string(), "04 | 2x 1y");
    }

    #[test]
    fn inner_spacers_kept_trailing_dropped() {
        let row = [stack(&["a", "b"]), stack(&["a"]), stack(&["a", "b"]), stack(&["a"])];
        let lines = Composer::new("sp").compose_row(0, &row, 1);
        assert_eq!(lines[0].runs_text(), "4a");
        assert_eq!(lines[1].runs_text(), "1b 1sp 1b");

        let lines = Composer::new("sp")
            .with_trailing_spacer(true)
            .compose_row(0, &row, 1);
        assert_eq!(lines[1].runs_text(), "1b 1sp 1b 1sp");
    }

    #[test]
    fn empty_row_has_no_lines() {
        assert!(Composer::default().compose_row(0, &[], 1).is_empty());
    }

    #[test]
    fn replay_reconstructs_columns() {
        let row = [
            stack(&["B", "C", "D"]),
            stack(&["A", "B", "D"]),
            stack(&["A"]),
            stack(&["E", "F"]),
            stack(&["B"]),
        ];
        let lines = Composer::new("sp").compose_row(0, &row, 1);
        let replayed = replay_row(&lines, row.len());
        for (glyph, keys) in row.iter().zip(&replayed) {
            assert_eq!(glyph.component_set(), keys);
        }
    }

    #[test]
    fn explicit_components_split_across_passes() {
        let image = GrayImage::new(2, 2);
        let scanned =
            Glyph::with_components("O/", image, ["O", "/"], Samples::square(1)).unwrap();
        let lines = Composer::new("sp").compose_row(0, &[Arc::new(scanned)], 1);
        let texts: Vec<String> = lines.iter().map(InstructionLine::runs_text).collect();
        assert_eq!(texts, ["1/", "1O"]);
    }

    #[test]
    fn pass_letters_continue_past_z() {
        assert_eq!(pass_letters(0), "a");
        assert_eq!(pass_letters(25), "z");
        assert_eq!(pass_letters(26), "aa");
        assert_eq!(pass_letters(27), "ab");
        assert_eq!(pass_letters(26 + 26 * 26), "aaa");
    }

    #[test]
    fn label_width_follows_grid_height() {
        assert_eq!(decimal_digits(9), 1);
        assert_eq!(decimal_digits(10), 2);
        assert_eq!(decimal_digits(120), 3);
    }
}
