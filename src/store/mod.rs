// src/store/mod.rs

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod gcs;

pub use gcs::{ArchiveConfig, GcsStore};

/// Result of a create-if-absent upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// Another writer got there first; nothing was written.
    AlreadyExists,
}

/// The slice of an object store the pipeline needs. Names are full object names.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object name under `prefix`. Failure to list is an error, never an empty list.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Upload `local_path` as `name` unless `name` already exists.
    async fn put(&self, local_path: &Path, name: &str) -> Result<PutOutcome>;
}
