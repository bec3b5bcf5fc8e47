// src/fetch/urls.rs

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::PageFetcher;
use crate::clock::ReportIdentity;
use crate::naming::NamingConvention;

/// One `<a href>` from a listing page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

/// Every anchor that carries an href.
pub fn extract_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("selector should parse");

    document
        .select(&selector)
        .filter_map(|elem| {
            let href = elem.value().attr("href")?;
            Some(Anchor {
                text: elem.text().collect::<String>().trim().to_string(),
                href: href.trim().to_string(),
            })
        })
        .collect()
}

/// First anchor whose href contains `token`, resolved against the listing URL.
/// Hrefs that cannot be resolved are skipped.
pub fn find_download_url(listing_url: &Url, anchors: &[Anchor], token: &str) -> Option<Url> {
    anchors
        .iter()
        .filter(|a| a.href.contains(token))
        .find_map(|a| listing_url.join(&a.href).ok())
}

/// Scrape `listing_url` for the workbook of `identity`.
///
/// `Ok(None)` means the page has no link for it yet, which is the usual state
/// between the nominal date and the release.
#[tracing::instrument(level = "info", skip_all, fields(listing = %listing_url))]
pub async fn resolve_download_url<F: PageFetcher + ?Sized>(
    fetcher: &F,
    listing_url: &Url,
    identity: &ReportIdentity,
    naming: &NamingConvention,
) -> Result<Option<Url>> {
    let body = fetcher
        .get(listing_url)
        .await
        .with_context(|| format!("fetching listing page {}", listing_url))?;
    let html = String::from_utf8_lossy(&body);
    let anchors = extract_anchors(&html);

    let token = naming.portal_token(identity.filename_date);
    debug!(anchors = anchors.len(), token = %token, "scanning listing");

    let found = find_download_url(listing_url, &anchors, &token);
    match &found {
        Some(url) => info!(url = %url, "found download URL"),
        None => info!(token = %token, "no link for report on listing page"),
    }
    Ok(found)
}
