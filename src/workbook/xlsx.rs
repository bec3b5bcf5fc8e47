// src/workbook/xlsx.rs

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::Path;
use tracing::debug;

use super::{Cell, Sheet, Workbook};

/// Loads a workbook from a local file.
pub trait WorkbookSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<Workbook>;
}

/// `.xlsx` files via calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxLoader;

impl WorkbookSource for XlsxLoader {
    fn load(&self, path: &Path) -> Result<Workbook> {
        load_workbook(path)
    }
}

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let mut xlsx: Xlsx<_> =
        open_workbook(path).with_context(|| format!("opening workbook {}", path.display()))?;

    let names = xlsx.sheet_names().to_vec();
    debug!(path = %path.display(), sheets = ?names, "loaded workbook");

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = xlsx
            .worksheet_range(&name)
            .with_context(|| format!("reading sheet `{}`", name))?;
        sheets.push(sheet_from_range(&name, &range));
    }
    Ok(Workbook::new(sheets))
}

/// calamine ranges start at the first used cell; pad back out to A1.
fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let (row0, col0) = match range.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Sheet::new(name),
    };

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0];
    for r in range.rows() {
        let mut row = vec![Cell::Empty; col0];
        row.extend(r.iter().map(to_cell));
        rows.push(row);
    }
    Sheet::from_rows(name, rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(v) => Cell::Float(*v),
        Data::Int(v) => Cell::Int(*v),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::String("Week".into())), Cell::text("Week"));
        assert_eq!(to_cell(&Data::Float(1.5)), Cell::Float(1.5));
        assert_eq!(to_cell(&Data::Int(3)), Cell::Int(3));
        assert_eq!(to_cell(&Data::Bool(false)), Cell::Bool(false));
    }

    #[test]
    fn test_range_offset_is_padded_to_a1() {
        let mut range: Range<Data> = Range::new((1, 2), (2, 3));
        range.set_value((1, 2), Data::String("Code".into()));
        range.set_value((2, 3), Data::Int(9));

        let sheet = sheet_from_range("s", &range);
        assert_eq!(sheet.cell(2, 3), &Cell::text("Code"));
        assert_eq!(sheet.cell(3, 4), &Cell::Int(9));
        assert_eq!(sheet.cell(1, 1), &Cell::Empty);
    }

    #[test]
    fn test_not_a_workbook_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("eps_nom_report-240105.xlsx");
        std::fs::write(&path, b"<html>maintenance page</html>").unwrap();

        assert!(load_workbook(&path).is_err());
    }
}
