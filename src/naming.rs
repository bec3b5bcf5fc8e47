// src/naming.rs

use chrono::NaiveDate;
use serde::Deserialize;

/// How report names are spelled on either side of the pipeline.
///
/// The portal publishes `<base><portal_delimiter><YYMMDD>.xlsx`, while the
/// archive stores `<base><archive_delimiter><YYMMDD>.csv`. The two delimiters
/// have drifted apart in the past, so they are kept as separate values and
/// every conversion goes through the methods below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub base_name: String,
    pub portal_delimiter: String,
    pub archive_delimiter: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            base_name: "eps_nom_report".to_string(),
            portal_delimiter: "-".to_string(),
            archive_delimiter: "+".to_string(),
        }
    }
}

pub const SOURCE_EXTENSION: &str = "xlsx";
pub const ARCHIVE_EXTENSION: &str = "csv";

/// `YYMMDD`, the only date spelling used in file and blob names.
pub fn date_token(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

impl NamingConvention {
    /// `<base><portal_delimiter>`
    pub fn portal_pattern(&self) -> String {
        format!("{}{}", self.base_name, self.portal_delimiter)
    }

    /// `<base><archive_delimiter>`, the substring that marks pipeline output in the bucket.
    pub fn archive_pattern(&self) -> String {
        format!("{}{}", self.base_name, self.archive_delimiter)
    }

    /// Token searched for in listing hrefs: the portal filename without its extension.
    pub fn portal_token(&self, filename_date: NaiveDate) -> String {
        format!("{}{}", self.portal_pattern(), date_token(filename_date))
    }

    /// Filename the portal serves the workbook under.
    pub fn source_filename(&self, filename_date: NaiveDate) -> String {
        format!("{}.{}", self.portal_token(filename_date), SOURCE_EXTENSION)
    }

    /// Local CSV filename: the portal name carried over to the archive spelling.
    pub fn local_csv_name(&self, filename_date: NaiveDate) -> String {
        format!(
            "{}.{}",
            self.to_archive(&self.portal_token(filename_date)),
            ARCHIVE_EXTENSION
        )
    }

    /// `<prefix><marker?><base><archive_delimiter><YYMMDD>.csv`
    pub fn archive_blob_name(
        &self,
        prefix: &str,
        marker: Option<&str>,
        filename_date: NaiveDate,
    ) -> String {
        format!(
            "{}{}{}",
            prefix,
            marker.unwrap_or(""),
            self.local_csv_name(filename_date)
        )
    }

    /// Rewrites the first portal-spelled report name inside `name` to the archive spelling.
    pub fn to_archive(&self, name: &str) -> String {
        name.replacen(&self.portal_pattern(), &self.archive_pattern(), 1)
    }
}
