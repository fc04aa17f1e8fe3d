mod guard;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use url::Url;

use crate::error::{UnfurlError, UnfurlResult};
use crate::models::RequestOptions;

pub use guard::{find_blocked, is_private_ip, AddressFilter, BlockedTarget};

pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; unfurl/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Retrieves the body of a page. Implementations must not retry or
/// reinterpret failures; they surface as-is to the caller of `extract`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, options: &RequestOptions) -> UnfurlResult<String>;
}

/// [`Fetcher`] backed by `reqwest`. A client is built per request since
/// proxy, redirect policy and DNS resolution are client-level settings.
///
/// No timeout is applied unless the options ask for one.
#[derive(Debug, Clone, Copy)]
pub struct HttpFetcher {
    is_blocked: AddressFilter,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_address_filter(is_private_ip)
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `is_blocked` instead of [`is_private_ip`] to decide which
    /// addresses `deny_private_addresses` refuses.
    pub fn with_address_filter(is_blocked: AddressFilter) -> Self {
        Self { is_blocked }
    }

    fn build_client(&self, options: &RequestOptions) -> UnfurlResult<ReqwestClient> {
        let mut builder = ReqwestClient::builder()
            .user_agent(options.user_agent.as_deref().unwrap_or(USER_AGENT))
            .default_headers(header_map(&options.headers)?);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        if options.deny_private_addresses {
            builder = builder
                .dns_resolver(guard::GuardedResolver::new(self.is_blocked))
                .redirect(guard::guarded_policy(options.max_redirects, self.is_blocked));
        } else if let Some(max) = options.max_redirects {
            builder = builder.redirect(if max == 0 {
                Policy::none()
            } else {
                Policy::limited(max)
            });
        }

        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| UnfurlError::Client(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| UnfurlError::Client(e.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, options: &RequestOptions) -> UnfurlResult<String> {
        if options.deny_private_addresses {
            guard::ensure_public_host(url, self.is_blocked).await?;
        }

        let client = self.build_client(options)?;
        let mut request = client.get(url.clone());
        if let Some(auth) = &options.basic_auth {
            request = request.basic_auth(&auth.username, auth.password.as_deref());
        }
        if let Some(token) = &options.bearer_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %url, "Fetching page");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = ?e, url = %url, "Failed to fetch page");
            UnfurlError::from(e)
        })?;

        let response = response.error_for_status().map_err(|e| {
            tracing::warn!(status = ?e.status(), url = %url, "Page returned error status");
            UnfurlError::from(e)
        })?;

        Ok(response.text().await?)
    }
}

fn header_map(headers: &[(String, String)]) -> UnfurlResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| UnfurlError::Client(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| UnfurlError::Client(format!("invalid value for header {name}")))?;
        map.append(name, value);
    }
    Ok(map)
}
