// src/history/mod.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::store::ObjectStore;

/// An archived object and the report date spelled into its name, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub blob_name: String,
    pub embedded_date: Option<NaiveDate>,
}

impl ArchiveEntry {
    pub fn parse(blob_name: &str, pattern: &str) -> Self {
        Self {
            blob_name: blob_name.to_string(),
            embedded_date: parse_embedded_date(blob_name, pattern),
        }
    }
}

/// `YYMMDD` directly after the first occurrence of `pattern` in `name`.
pub fn parse_embedded_date(name: &str, pattern: &str) -> Option<NaiveDate> {
    let start = name.find(pattern)? + pattern.len();
    let token = name.get(start..start + 6)?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(token, "%y%m%d").ok()
}

/// What the bucket says has already been archived.
pub struct ArchiveIndex<'a, S: ?Sized> {
    store: &'a S,
    prefix: String,
    pattern: String,
}

impl<'a, S: ObjectStore + ?Sized> ArchiveIndex<'a, S> {
    /// `pattern` is the substring marking pipeline output, e.g. `eps_nom_report+`.
    pub fn new(store: &'a S, prefix: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            pattern: pattern.into(),
        }
    }

    /// Entries under the prefix that carry the pattern. Unparsable dates are kept as `None`.
    pub async fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        let names = self
            .store
            .list(&self.prefix)
            .await
            .with_context(|| format!("listing archive under `{}`", self.prefix))?;

        Ok(names
            .iter()
            .filter(|n| n.contains(&self.pattern))
            .map(|n| ArchiveEntry::parse(n, &self.pattern))
            .collect())
    }

    /// Newest report date present in the archive, `None` when nothing parses.
    /// A listing failure is an error, never `None`.
    pub async fn latest_processed_date(&self) -> Result<Option<NaiveDate>> {
        let entries = self.entries().await?;

        let latest = entries
            .iter()
            .filter_map(|e| {
                if e.embedded_date.is_none() {
                    debug!(blob = %e.blob_name, "skipping archive entry without a date");
                }
                e.embedded_date
            })
            .max();

        match latest {
            Some(d) => info!(latest = %d, entries = entries.len(), "latest processed report"),
            None => info!(prefix = %self.prefix, "no processed reports in archive"),
        }
        Ok(latest)
    }

    pub async fn exists(&self, blob_name: &str) -> Result<bool> {
        self.store
            .exists(blob_name)
            .await
            .with_context(|| format!("checking archive for `{}`", blob_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PutOutcome;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::path::Path;

    struct Listing(Vec<&'static str>);

    #[async_trait]
    impl ObjectStore for Listing {
        async fn list(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .0
                .iter()
                .filter(|n| n.starts_with(prefix))
                .map(|n| n.to_string())
                .collect())
        }
        async fn exists(&self, name: &str) -> Result<bool> {
            Ok(self.0.iter().any(|n| *n == name))
        }
        async fn put(&self, _local: &Path, _name: &str) -> Result<PutOutcome> {
            Ok(PutOutcome::Created)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl ObjectStore for Unreachable {
        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(anyhow!("503 Service Unavailable"))
        }
        async fn exists(&self, _name: &str) -> Result<bool> {
            Err(anyhow!("503 Service Unavailable"))
        }
        async fn put(&self, _local: &Path, _name: &str) -> Result<PutOutcome> {
            Err(anyhow!("503 Service Unavailable"))
        }
    }

    #[test]
    fn test_parse_embedded_date() {
        assert_eq!(
            parse_embedded_date("prefix/processed_rep+240115.csv", "rep+"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_embedded_date("prefix/rep+24011.csv", "rep+"), None);
        assert_eq!(parse_embedded_date("prefix/rep+241399.csv", "rep+"), None);
        assert_eq!(parse_embedded_date("prefix/rep+2401é5.csv", "rep+"), None);
        assert_eq!(parse_embedded_date("prefix/garbage.csv", "rep+"), None);
    }

    #[tokio::test]
    async fn test_latest_ignores_garbage() -> Result<()> {
        let store = Listing(vec![
            "prefix/processed_rep+240101.csv",
            "prefix/processed_rep+240115.csv",
            "prefix/garbage.csv",
            "prefix/processed_rep+notadate.csv",
            "elsewhere/processed_rep+991231.csv",
        ]);
        let index = ArchiveIndex::new(&store, "prefix/", "rep+");

        assert_eq!(
            index.latest_processed_date().await?,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        // garbage.csv has no pattern; the bad date keeps its entry but no date
        let entries = index.entries().await?;
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e.embedded_date.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_listing_is_none() -> Result<()> {
        let store = Listing(vec![]);
        let index = ArchiveIndex::new(&store, "prefix/", "rep+");
        assert_eq!(index.latest_processed_date().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let index = ArchiveIndex::new(&Unreachable, "prefix/", "rep+");
        let err = index.latest_processed_date().await.unwrap_err();
        assert!(format!("{:#}", err).contains("503"));
    }

    #[tokio::test]
    async fn test_exists_checks_exact_name() -> Result<()> {
        let store = Listing(vec!["prefix/rep+240115.csv"]);
        let index = ArchiveIndex::new(&store, "prefix/", "rep+");
        assert!(index.exists("prefix/rep+240115.csv").await?);
        assert!(!index.exists("prefix/rep+240122.csv").await?);
        Ok(())
    }
}
