// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};
use url::Url;

use crate::clock::ReportClock;
use crate::fetch::HttpConfig;
use crate::naming::NamingConvention;
use crate::normalize::NormalizeOptions;
use crate::store::ArchiveConfig;

/// Path of an optional YAML config file.
pub const CONFIG_PATH_VAR: &str = "EPS_NOMS_CONFIG";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal page that links to the weekly workbook.
    pub listing_url: String,
    pub naming: NamingConvention,
    pub schedule: ReportClock,
    pub archive: ArchiveConfig,
    pub sheet: NormalizeOptions,
    pub http: HttpConfig,
    /// Scratch directory for the downloaded workbook and emitted CSV.
    pub work_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url:
                "https://digital.nhs.uk/services/electronic-prescription-service/statistics"
                    .to_string(),
            naming: NamingConvention::default(),
            schedule: ReportClock::default(),
            archive: ArchiveConfig::default(),
            sheet: NormalizeOptions::default(),
            http: HttpConfig::default(),
            work_dir: env::temp_dir().join("eps_nominations_processing"),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `EPS_NOMS_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.finish()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Single-value overrides, looked up through `lookup` so tests need not touch the environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("EPS_NOMS_LISTING_URL") {
            self.listing_url = v;
        }
        if let Some(v) = lookup("EPS_NOMS_BUCKET") {
            self.archive.bucket = v;
        }
        if let Some(v) = lookup("EPS_NOMS_PREFIX") {
            self.archive.prefix = v;
        }
        if let Some(v) = lookup("EPS_NOMS_WORK_DIR") {
            self.work_dir = PathBuf::from(v);
        }
        if self.archive.credentials_path.is_none() {
            self.archive.credentials_path =
                lookup("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        }
    }

    /// Normalise and validate.
    pub fn finish(mut self) -> Result<Self> {
        self.archive.normalise_prefix();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.listing_url)
            .with_context(|| format!("listing_url `{}` is not a URL", self.listing_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("listing_url must be http(s), got `{}`", url.scheme());
        }
        if self.naming.base_name.trim().is_empty() {
            bail!("naming.base_name must not be empty");
        }
        if self.archive.bucket.trim().is_empty() {
            bail!("archive.bucket must not be empty");
        }
        if self.sheet.sheet_name.trim().is_empty() {
            bail!("sheet.sheet_name must not be empty");
        }
        if self.sheet.date_column_label.trim().is_empty() {
            bail!("sheet.date_column_label must not be empty");
        }
        if self.sheet.row_signal_column == Some(0) {
            bail!("sheet.row_signal_column is 1-based");
        }
        Ok(())
    }

    pub fn listing_url(&self) -> Result<Url> {
        Url::parse(&self.listing_url).context("parsing listing_url")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default().finish().unwrap();
        assert_eq!(config.naming.archive_pattern(), "eps_nom_report+");
        assert_eq!(config.schedule.publish_weekday, Weekday::Mon);
        assert_eq!(config.schedule.cadence_offset_days, 3);
        assert_eq!(config.archive.prefix, "sources/reference-data/nhs-eps-noms/");
    }

    #[test]
    fn test_yaml_overrides_only_what_it_names() {
        let config = Config::from_yaml_str(
            r#"
naming:
  portal_delimiter: "+"
schedule:
  publish_weekday: Tuesday
  cadence_offset_days: 4
archive:
  prefix: eps
  processed_marker: processed_
sheet:
  date_column_label: Processing Date
  required_headers: ["ODS Code"]
"#,
        )
        .unwrap()
        .finish()
        .unwrap();

        assert_eq!(config.naming.portal_delimiter, "+");
        assert_eq!(config.naming.archive_delimiter, "+");
        assert_eq!(config.naming.base_name, "eps_nom_report");
        assert_eq!(config.schedule.publish_weekday, Weekday::Tue);
        assert_eq!(config.schedule.cadence_offset_days, 4);
        assert_eq!(config.archive.prefix, "eps/");
        assert_eq!(config.archive.processed_marker.as_deref(), Some("processed_"));
        assert_eq!(config.sheet.date_column_label, "Processing Date");
        assert_eq!(config.sheet.sheet_name, "Dispenser Nominations");
        assert!(config.sheet.legacy_header.is_some());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("EPS_NOMS_BUCKET", "other-bucket"),
            ("EPS_NOMS_WORK_DIR", "/var/tmp/eps"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.archive.bucket, "other-bucket");
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/eps"));
        assert_eq!(
            config.archive.credentials_path,
            Some(PathBuf::from("/secrets/sa.json"))
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.listing_url = "ftp://example.org/list".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.naming.base_name = " ".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sheet.row_signal_column = Some(0);
        assert!(config.validate().is_err());
    }
}
