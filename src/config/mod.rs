use std::env;
use std::time::Duration;

use crate::models::RequestOptions;

/// Timeout the CLI applies when `UNFURL_TIMEOUT_SECS` is unset. Library
/// callers get no timeout unless they set one in `RequestOptions`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Defaults for outgoing requests, read from the environment by the binary.
/// The library entry points never consult the environment themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub user_agent: Option<String>,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub max_redirects: Option<usize>,
    pub deny_private_addresses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            max_redirects: None,
            deny_private_addresses: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            user_agent: non_empty_var("UNFURL_USER_AGENT"),
            timeout: env::var("UNFURL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            proxy: non_empty_var("UNFURL_PROXY"),
            max_redirects: env::var("UNFURL_MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse().ok()),
            deny_private_addresses: matches!(
                env::var("UNFURL_DENY_PRIVATE").as_deref(),
                Ok("1") | Ok("true") | Ok("yes")
            ),
        }
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout: Some(self.timeout),
            user_agent: self.user_agent.clone(),
            proxy: self.proxy.clone(),
            max_redirects: self.max_redirects,
            deny_private_addresses: self.deny_private_addresses,
            ..RequestOptions::default()
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
