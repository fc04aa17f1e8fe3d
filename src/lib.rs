//! Link-preview metadata for arbitrary web pages.
//!
//! Fetches a URL and returns its title, canonical link, Open Graph / Twitter
//! Card tags, best favicon and inline images:
//!
//! ```no_run
//! # async fn demo() -> Result<(), unfurl::UnfurlError> {
//! let result = unfurl::parse("https://www.rust-lang.org", None).await?;
//! if let Some(page) = result.page() {
//!     println!("{:?}", page.og.title);
//! }
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod fetch;
pub mod models;

pub use error::{UnfurlError, UnfurlResult};
pub use extract::extract_from_html;
pub use extractor::Extractor;
pub use fetch::{Fetcher, HttpFetcher};
pub use models::{ExtractionResult, ImageRef, Meta, OpenGraph, PageMetadata, RequestOptions};

/// Fetch `url` over HTTP and extract its metadata.
///
/// Returns [`ExtractionResult::Empty`] when `url` is not an http(s) URL.
pub async fn parse(url: &str, options: Option<&RequestOptions>) -> UnfurlResult<ExtractionResult> {
    Extractor::http().extract(url, options).await
}

pub use self::parse as parser;
