// src/fetch/report.rs

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use url::Url;

use super::PageFetcher;

/// Download `url` to `dest`, creating parent directories. Returns the byte count.
pub async fn download_report<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &Url,
    dest: impl AsRef<Path>,
) -> Result<u64> {
    let dest = dest.as_ref();
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let bytes = fetcher.get(url).await?;
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    Ok(bytes.len() as u64)
}
