use url::Url;

use crate::error::UnfurlResult;
use crate::extract::{extract_from_html, looks_like_http_url};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::models::{ExtractionResult, RequestOptions};

/// Fetches a page through `F` and extracts its preview metadata.
///
/// Holds no per-call state, so a single instance can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Extractor<F = HttpFetcher> {
    fetcher: F,
}

impl Extractor<HttpFetcher> {
    pub fn http() -> Self {
        Self::new(HttpFetcher::new())
    }
}

impl<F: Fetcher> Extractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Validate, fetch, parse and extract.
    ///
    /// Input that does not look like an http(s) URL yields
    /// [`ExtractionResult::Empty`] without touching the network. Fetch
    /// failures are returned unchanged.
    pub async fn extract(
        &self,
        url: &str,
        options: Option<&RequestOptions>,
    ) -> UnfurlResult<ExtractionResult> {
        if !looks_like_http_url(url) {
            tracing::debug!(url, "Not an http(s) URL, skipping");
            return Ok(ExtractionResult::Empty {});
        }

        let base = Url::parse(url)?;
        let default_options = RequestOptions::default();
        let options = options.unwrap_or(&default_options);

        let html = self.fetcher.fetch(&base, options).await?;
        Ok(extract_from_html(&html, &base).into())
    }
}
