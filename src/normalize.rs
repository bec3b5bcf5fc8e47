// src/normalize.rs

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::ReportIdentity;
use crate::workbook::{Cell, Sheet, Workbook};

/// Upstream no longer matches the shape we archive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("sheet `{wanted}` not found; workbook has {available:?}")]
    SheetNotFound {
        wanted: String,
        available: Vec<String>,
    },
    #[error("header `{0}` not found in row 1 of the sheet")]
    MissingHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub sheet_name: String,
    /// Header of the inserted date column.
    pub date_column_label: String,
    pub legacy_header: Option<HeaderRename>,
    /// Labels that must be present in the header row.
    pub required_headers: Vec<String>,
    /// 1-based column whose contiguous run from row 2 marks the data rows.
    /// Detected when unset.
    pub row_signal_column: Option<usize>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Dispenser Nominations".to_string(),
            date_column_label: "Week".to_string(),
            legacy_header: Some(HeaderRename {
                from: "Local Pharmaceutical Committee (LPC) – where blank awaiting update or DAC"
                    .to_string(),
                to: "Local Pharmaceutical Committee (LPC)".to_string(),
            }),
            required_headers: Vec::new(),
            row_signal_column: None,
        }
    }
}

/// The normalised output sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    sheet: Sheet,
    dated_rows: usize,
}

impl CanonicalTable {
    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    /// Rows below the header.
    pub fn data_rows(&self) -> usize {
        self.sheet.max_row().saturating_sub(1)
    }

    /// Rows that received the report date.
    pub fn dated_rows(&self) -> usize {
        self.dated_rows
    }
}

/// First column whose row 2 is populated.
fn detect_signal_column(sheet: &Sheet) -> Option<usize> {
    (1..=sheet.max_column()).find(|&c| !sheet.cell(2, c).is_empty())
}

/// Last row of the contiguous non-empty run in `col` starting at row 2; 1 if row 2 is empty.
fn last_populated_row(sheet: &Sheet, col: usize) -> usize {
    let mut last = 1;
    while !sheet.cell(last + 1, col).is_empty() {
        last += 1;
    }
    last
}

/// Build the canonical table for `identity` from `workbook`.
///
/// Inserts the date column at column 1, fills it with the report's
/// filename date down the populated rows, and renames the legacy header.
/// The input is not modified. Feeding the output back in adds a second
/// date column, so call this once per fetched workbook.
pub fn normalize(
    workbook: &Workbook,
    identity: &ReportIdentity,
    options: &NormalizeOptions,
) -> Result<CanonicalTable, SchemaViolation> {
    let source = workbook
        .sheet(&options.sheet_name)
        .ok_or_else(|| SchemaViolation::SheetNotFound {
            wanted: options.sheet_name.clone(),
            available: workbook
                .sheet_names()
                .into_iter()
                .map(String::from)
                .collect(),
        })?;

    for label in &options.required_headers {
        if source.find_header(label).is_none() {
            return Err(SchemaViolation::MissingHeader(label.clone()));
        }
    }

    let last = options
        .row_signal_column
        .or_else(|| detect_signal_column(source))
        .map_or(1, |col| last_populated_row(source, col));
    debug!(sheet = %source.name(), last_populated_row = last, "measured data rows");

    let mut sheet = source.clone();
    sheet.insert_column(1);
    sheet.set_cell(1, 1, Cell::text(&options.date_column_label));

    let date = identity.filename_date.format("%Y-%m-%d").to_string();
    for row in 2..=last {
        sheet.set_cell(row, 1, Cell::text(&date));
    }

    if let Some(rename) = &options.legacy_header {
        if let Some(col) = sheet.find_header(&rename.from) {
            sheet.set_cell(1, col, Cell::text(&rename.to));
            info!(from = %rename.from, to = %rename.to, column = col, "renamed legacy header");
        }
    }

    info!(
        sheet = %sheet.name(),
        date = %date,
        dated_rows = last - 1,
        "normalised sheet"
    );
    Ok(CanonicalTable {
        sheet,
        dated_rows: last - 1,
    })
}
