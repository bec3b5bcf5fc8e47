// src/pipeline.rs

use chrono::{NaiveDate, NaiveDateTime};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, error, info, warn};

use crate::clock::ReportIdentity;
use crate::config::Config;
use crate::error::{FailureKind, RunError, Stage, StageContext};
use crate::fetch::{download_report, resolve_download_url, PageFetcher};
use crate::history::ArchiveIndex;
use crate::normalize::normalize;
use crate::store::{ObjectStore, PutOutcome};
use crate::workbook::{write_sheet_csv, WorkbookSource};

/// How a run ended when nothing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report was transformed and uploaded; `rows` counts CSV rows including the header.
    Archived { blob_name: String, rows: usize },
    /// The archive already holds this report or a newer one.
    UpToDate { latest: NaiveDate, target: NaiveDate },
    /// The listing page has no link for the report yet.
    NotYetPublished { token: String },
    /// The exact blob already exists, or appeared while we were working.
    AlreadyArchived { blob_name: String },
}

impl RunOutcome {
    pub fn is_no_op(&self) -> bool {
        !matches!(self, RunOutcome::Archived { .. })
    }
}

/// Local files created by a run. Removed at the end no matter how the run went.
#[derive(Debug, Default)]
pub struct Scratch {
    paths: Vec<PathBuf>,
}

impl Scratch {
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        self.paths.push(path.clone());
        path
    }

    /// Best effort: a missing file is fine, other failures are logged and dropped.
    pub async fn cleanup(self) {
        for path in self.paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(file = %path.display(), "removed scratch file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(file = %path.display(), "scratch file not present")
                }
                Err(e) => warn!(
                    stage = %Stage::Cleanup,
                    file = %path.display(),
                    error = %e,
                    "failed to remove scratch file"
                ),
            }
        }
    }
}

/// One ingestion run: decide, locate, dedupe, fetch, transform, emit, upload, clean up.
pub struct Pipeline<'a, F: ?Sized, S: ?Sized, L: ?Sized> {
    config: &'a Config,
    fetcher: &'a F,
    store: &'a S,
    loader: &'a L,
}

impl<'a, F, S, L> Pipeline<'a, F, S, L>
where
    F: PageFetcher + ?Sized,
    S: ObjectStore + ?Sized,
    L: WorkbookSource + ?Sized,
{
    pub fn new(config: &'a Config, fetcher: &'a F, store: &'a S, loader: &'a L) -> Self {
        Self {
            config,
            fetcher,
            store,
            loader,
        }
    }

    /// Run once for the report due at `now`.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run(&self, now: NaiveDateTime) -> Result<RunOutcome, RunError> {
        let start = Instant::now();
        let identity = self
            .config
            .schedule
            .target_identity(now, &self.config.naming.base_name);
        info!(
            publish_date = %identity.publish_date,
            filename_date = %identity.filename_date,
            "target report"
        );

        let mut scratch = Scratch::default();
        let result = self.run_stages(&identity, &mut scratch).await;
        scratch.cleanup().await;

        match &result {
            Ok(RunOutcome::Archived { blob_name, rows }) => {
                info!(blob = %blob_name, rows, elapsed = ?start.elapsed(), "run complete")
            }
            Ok(outcome) => info!(?outcome, elapsed = ?start.elapsed(), "nothing to do"),
            Err(e) => error!(
                stage = %e.stage,
                kind = %e.kind,
                elapsed = ?start.elapsed(),
                "run failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        identity: &ReportIdentity,
        scratch: &mut Scratch,
    ) -> Result<RunOutcome, RunError> {
        let cfg = self.config;
        let naming = &cfg.naming;
        let index = ArchiveIndex::new(
            self.store,
            cfg.archive.prefix.clone(),
            naming.archive_pattern(),
        );

        // ─── decide ──────────────────────────────────────────────────────
        let latest = index
            .latest_processed_date()
            .await
            .at_stage(Stage::Decide, FailureKind::TransientIo)?;
        if let Some(latest) = latest {
            if identity.filename_date <= latest {
                return Ok(RunOutcome::UpToDate {
                    latest,
                    target: identity.filename_date,
                });
            }
        }

        // ─── locate ──────────────────────────────────────────────────────
        let listing_url = cfg
            .listing_url()
            .at_stage(Stage::LocateCandidate, FailureKind::TransientIo)?;
        let download_url = match resolve_download_url(self.fetcher, &listing_url, identity, naming)
            .await
            .at_stage(Stage::LocateCandidate, FailureKind::TransientIo)?
        {
            Some(url) => url,
            None => {
                return Ok(RunOutcome::NotYetPublished {
                    token: naming.portal_token(identity.filename_date),
                })
            }
        };

        // ─── dedupe ──────────────────────────────────────────────────────
        let blob_name = naming.archive_blob_name(
            &cfg.archive.prefix,
            cfg.archive.processed_marker.as_deref(),
            identity.filename_date,
        );
        if index
            .exists(&blob_name)
            .await
            .at_stage(Stage::DedupeCheck, FailureKind::TransientIo)?
        {
            return Ok(RunOutcome::AlreadyArchived { blob_name });
        }

        // ─── fetch ───────────────────────────────────────────────────────
        tokio::fs::create_dir_all(&cfg.work_dir)
            .await
            .at_stage(Stage::Fetch, FailureKind::LocalIo)?;
        let xlsx_path =
            scratch.track(cfg.work_dir.join(naming.source_filename(identity.filename_date)));
        let bytes = download_report(self.fetcher, &download_url, &xlsx_path)
            .await
            .at_stage(Stage::Fetch, FailureKind::TransientIo)?;
        info!(url = %download_url, bytes, "downloaded report");

        // ─── transform ───────────────────────────────────────────────────
        let workbook = self
            .loader
            .load(&xlsx_path)
            .at_stage(Stage::Transform, FailureKind::SchemaViolation)?;
        let table = normalize(&workbook, identity, &cfg.sheet)
            .at_stage(Stage::Transform, FailureKind::SchemaViolation)?;

        // ─── emit ────────────────────────────────────────────────────────
        let csv_path =
            scratch.track(cfg.work_dir.join(naming.local_csv_name(identity.filename_date)));
        let rows = write_sheet_csv(table.sheet(), &csv_path)
            .at_stage(Stage::Emit, FailureKind::LocalIo)?;
        info!(
            file = %csv_path.display(),
            rows,
            dated_rows = table.dated_rows(),
            "wrote CSV"
        );

        // ─── upload ──────────────────────────────────────────────────────
        self.upload(&csv_path, blob_name, rows).await
    }

    async fn upload(
        &self,
        csv_path: &Path,
        blob_name: String,
        rows: usize,
    ) -> Result<RunOutcome, RunError> {
        match self
            .store
            .put(csv_path, &blob_name)
            .await
            .at_stage(Stage::Upload, FailureKind::TransientIo)?
        {
            PutOutcome::Created => Ok(RunOutcome::Archived { blob_name, rows }),
            PutOutcome::AlreadyExists => {
                warn!(blob = %blob_name, "blob appeared during the run; left as is");
                Ok(RunOutcome::AlreadyArchived { blob_name })
            }
        }
    }
}
