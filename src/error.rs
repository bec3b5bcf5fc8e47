// src/error.rs

use std::fmt;
use thiserror::Error;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Decide,
    LocateCandidate,
    DedupeCheck,
    Fetch,
    Transform,
    Emit,
    Upload,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decide => "decide",
            Stage::LocateCandidate => "locate_candidate",
            Stage::DedupeCheck => "dedupe_check",
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::Emit => "emit",
            Stage::Upload => "upload",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classes of run-fatal failure. Expected no-ops are outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network fetch or object-store call failed.
    TransientIo,
    /// The upstream workbook no longer has the shape we archive.
    SchemaViolation,
    /// Writing local scratch output failed.
    LocalIo,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::TransientIo => "transient I/O failure",
            FailureKind::SchemaViolation => "schema violation",
            FailureKind::LocalIo => "local I/O failure",
        })
    }
}

/// The first failure of a run, with the stage it happened in.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed ({kind})")]
pub struct RunError {
    pub stage: Stage,
    pub kind: FailureKind,
    #[source]
    pub source: anyhow::Error,
}

impl RunError {
    pub fn new(stage: Stage, kind: FailureKind, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            kind,
            source: source.into(),
        }
    }
}

/// Tags a stage result with its stage and failure kind.
pub trait StageContext<T> {
    fn at_stage(self, stage: Stage, kind: FailureKind) -> Result<T, RunError>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn at_stage(self, stage: Stage, kind: FailureKind) -> Result<T, RunError> {
        self.map_err(|e| RunError::new(stage, kind, e))
    }
}
