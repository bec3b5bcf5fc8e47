// src/store/gcs.rs

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use google_cloud_storage::{
    client::{google_cloud_auth::credentials::CredentialsFile, Client, ClientConfig},
    http::{
        objects::{
            get::GetObjectRequest,
            list::ListObjectsRequest,
            upload::{Media, UploadObjectRequest, UploadType},
        },
        Error as GcsError,
    },
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{ObjectStore, PutOutcome};

/// Where archived CSVs live and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub bucket: String,
    /// Object-name prefix; always ends with `/` once normalised.
    pub prefix: String,
    /// Optional marker between prefix and report name, e.g. `processed_`.
    pub processed_marker: Option<String>,
    /// Service-account key. Falls back to application default credentials when unset.
    pub credentials_path: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket: "phlo-sandpit-raw-data-lake".to_string(),
            prefix: "sources/reference-data/nhs-eps-noms/".to_string(),
            processed_marker: None,
            credentials_path: None,
        }
    }
}

impl ArchiveConfig {
    pub fn normalise_prefix(&mut self) {
        if !self.prefix.is_empty() && !self.prefix.ends_with('/') {
            self.prefix.push('/');
        }
    }
}

/// Google Cloud Storage bucket.
pub struct GcsStore {
    client: Client,
    bucket: String,
}

impl GcsStore {
    /// Authenticate with the configured key file, or ADC when none is given.
    /// The process environment is left untouched.
    pub async fn connect(config: &ArchiveConfig) -> Result<Self> {
        let client_config = match &config.credentials_path {
            Some(path) => {
                if !path.exists() {
                    bail!("service account file not found at {}", path.display());
                }
                let creds = CredentialsFile::new_from_file(path.display().to_string())
                    .await
                    .with_context(|| format!("reading credentials {}", path.display()))?;
                ClientConfig::default()
                    .with_credentials(creds)
                    .await
                    .context("authenticating to GCS with service account")?
            }
            None => ClientConfig::default()
                .with_auth()
                .await
                .context("authenticating to GCS")?,
        };
        info!(bucket = %config.bucket, "GCS client ready");

        Ok(Self {
            client: Client::new(client_config),
            bucket: config.bucket.clone(),
        })
    }
}

fn status_of(err: &GcsError) -> Option<u16> {
    match err {
        GcsError::Response(resp) => Some(resp.code),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token = None;

        loop {
            let req = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                page_token: page_token.take(),
                ..Default::default()
            };
            let resp = self
                .client
                .list_objects(&req)
                .await
                .with_context(|| format!("listing gs://{}/{}", self.bucket, prefix))?;

            names.extend(resp.items.unwrap_or_default().into_iter().map(|o| o.name));
            match resp.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(bucket = %self.bucket, prefix, count = names.len(), "listed objects");
        Ok(names)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let req = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: name.to_string(),
            ..Default::default()
        };
        match self.client.get_object(&req).await {
            Ok(_) => Ok(true),
            Err(e) if status_of(&e) == Some(404) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("probing gs://{}/{}", self.bucket, name)),
        }
    }

    async fn put(&self, local_path: &Path, name: &str) -> Result<PutOutcome> {
        let data = fs::read(local_path)
            .await
            .with_context(|| format!("reading {}", local_path.display()))?;

        let mut media = Media::new(name.to_string());
        media.content_type = "text/csv".into();
        media.content_length = Some(data.len() as u64);

        // generation 0 = only create, never overwrite
        let req = UploadObjectRequest {
            bucket: self.bucket.clone(),
            if_generation_match: Some(0),
            ..Default::default()
        };

        match self
            .client
            .upload_object(&req, data, &UploadType::Simple(media))
            .await
        {
            Ok(_) => {
                info!(object = %name, bucket = %self.bucket, "uploaded to GCS");
                Ok(PutOutcome::Created)
            }
            Err(e) if status_of(&e) == Some(412) => Ok(PutOutcome::AlreadyExists),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "uploading {} to gs://{}/{}",
                    local_path.display(),
                    self.bucket,
                    name
                )
            }),
        }
    }
}
