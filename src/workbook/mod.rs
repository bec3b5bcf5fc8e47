// src/workbook/mod.rs

use chrono::NaiveDateTime;
use std::fmt;

pub mod emit;
pub mod xlsx;

pub use emit::write_sheet_csv;
pub use xlsx::{load_workbook, WorkbookSource, XlsxLoader};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Spreadsheet error value such as `#DIV/0!`.
    Error(String),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// True only for a cell with no value. Whitespace text counts as a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Error(e) => f.write_str(e),
        }
    }
}

/// A named grid of cells. Rows and columns are 1-based, as in a spreadsheet;
/// row 1 is the header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Out-of-range addresses read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    /// Grows the grid as needed. Row or column 0 is ignored.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let r = &mut self.rows[row - 1];
        if r.len() < col {
            r.resize(col, Cell::Empty);
        }
        r[col - 1] = value;
    }

    /// Shift every cell at or right of `col` one column to the right.
    pub fn insert_column(&mut self, col: usize) {
        if col == 0 {
            return;
        }
        for r in &mut self.rows {
            if r.len() >= col {
                r.insert(col - 1, Cell::Empty);
            }
        }
    }

    /// Last row holding a non-empty cell; 0 for a blank sheet.
    pub fn max_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    /// Rightmost column holding a non-empty cell in any row.
    pub fn max_column(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|r| r.iter().rposition(|c| !c.is_empty()))
            .max()
            .map_or(0, |i| i + 1)
    }

    /// Header row cells (row 1), possibly empty.
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Column of the first header cell whose trimmed text equals `label`.
    pub fn find_header(&self, label: &str) -> Option<usize> {
        self.header()
            .iter()
            .position(|c| c.as_text().is_some_and(|t| t.trim() == label))
            .map(|i| i + 1)
    }

    /// Rows 1..=max_row, each padded to `max_column` cells.
    pub fn padded_rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        let width = self.max_column();
        (1..=self.max_row()).map(move |r| (1..=width).map(|c| self.cell(r, c)).collect())
    }
}

/// All sheets of a loaded workbook, in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid() -> Sheet {
        Sheet::from_rows(
            "Data",
            vec![
                vec![Cell::text("Code"), Cell::text("Name")],
                vec![Cell::text("FA001"), Cell::text("Alpha")],
                vec![Cell::text("FB002")],
                vec![],
            ],
        )
    }

    #[test]
    fn test_addressing_is_one_based() {
        let sheet = grid();
        assert_eq!(sheet.cell(1, 1), &Cell::text("Code"));
        assert_eq!(sheet.cell(2, 2), &Cell::text("Alpha"));
        assert_eq!(sheet.cell(3, 2), &Cell::Empty);
        assert_eq!(sheet.cell(0, 1), &Cell::Empty);
        assert_eq!(sheet.cell(99, 99), &Cell::Empty);
    }

    #[test]
    fn test_extent_ignores_trailing_blank_rows() {
        let sheet = grid();
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.max_column(), 2);
        assert_eq!(Sheet::new("blank").max_row(), 0);
    }

    #[test]
    fn test_insert_column_shifts_right() {
        let mut sheet = grid();
        sheet.insert_column(1);

        assert_eq!(sheet.cell(1, 1), &Cell::Empty);
        assert_eq!(sheet.cell(1, 2), &Cell::text("Code"));
        assert_eq!(sheet.cell(2, 3), &Cell::text("Alpha"));
        assert_eq!(sheet.max_row(), 3);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut sheet = Sheet::new("s");
        sheet.set_cell(3, 2, Cell::Int(7));
        assert_eq!(sheet.cell(3, 2), &Cell::Int(7));
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.max_column(), 2);
    }

    #[test]
    fn test_whitespace_text_is_a_value() {
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![Cell::text("Code"), Cell::text("Name")],
                vec![Cell::text("FA001"), Cell::text(" ")],
                vec![Cell::text(" ")],
            ],
        );
        assert!(!Cell::text(" ").is_empty());
        assert!(Cell::Empty.is_empty());
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.max_column(), 2);
    }

    #[test]
    fn test_find_header_trims() {
        let sheet = Sheet::from_rows("s", vec![vec![Cell::Int(1), Cell::text(" Week ")]]);
        assert_eq!(sheet.find_header("Week"), Some(2));
        assert_eq!(sheet.find_header("Month"), None);
    }

    #[test]
    fn test_cell_display() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Cell::Float(12.0).to_string(), "12");
        assert_eq!(Cell::Float(0.25).to_string(), "0.25");
        assert_eq!(Cell::Bool(true).to_string(), "True");
        assert_eq!(Cell::Bool(false).to_string(), "False");
        assert_eq!(Cell::DateTime(midnight).to_string(), "2024-01-05 00:00:00");
        assert_eq!(
            Cell::DateTime(midnight + chrono::TimeDelta::minutes(90)).to_string(),
            "2024-01-05 01:30:00"
        );
        assert_eq!(Cell::Empty.to_string(), "");
    }
}
