// src/workbook/emit.rs

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;

use super::Sheet;

/// Write every row of `sheet` up to its last non-empty row as CSV.
/// Rows are padded to the sheet width. Returns the number of rows written.
pub fn write_sheet_csv(sheet: &Sheet, path: &Path) -> Result<usize> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut written = 0;
    for row in sheet.padded_rows() {
        writer
            .write_record(row.iter().map(|c| c.to_string()))
            .with_context(|| format!("writing row {} to {}", written + 1, path.display()))?;
        written += 1;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Cell;
    use tempfile::tempdir;

    #[test]
    fn test_csv_is_padded_and_quoted() -> Result<()> {
        let sheet = Sheet::from_rows(
            "s",
            vec![
                vec![Cell::text("Week"), Cell::text("Name"), Cell::text("Items")],
                vec![Cell::text("2024-01-05"), Cell::text("Smith, J"), Cell::Float(12.0)],
                vec![Cell::text("2024-01-05")],
                vec![Cell::Empty, Cell::Empty],
            ],
        );
        let tmp = tempdir()?;
        let path = tmp.path().join("out.csv");

        let rows = write_sheet_csv(&sheet, &path)?;

        assert_eq!(rows, 3);
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "Week,Name,Items\n2024-01-05,\"Smith, J\",12\n2024-01-05,,\n"
        );
        Ok(())
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let sheet = Sheet::from_rows("s", vec![vec![Cell::text("x")]]);
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("missing").join("out.csv");
        assert!(write_sheet_csv(&sheet, &path).is_err());
    }
}
