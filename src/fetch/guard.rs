//! Refusal of private targets when `deny_private_addresses` is set.
//!
//! Three checks cover every way a request can reach an address: the initial
//! host is resolved up front, the client's DNS resolver rejects blocked
//! answers (redirects to hostnames and rebinding), and the redirect policy
//! rejects IP-literal targets, which never reach the resolver.

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::{Action, Attempt, Policy};
use thiserror::Error;
use url::{Host, Url};

use crate::error::{UnfurlError, UnfurlResult};

/// Follow limit used when the caller leaves `max_redirects` unset.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Predicate deciding whether an address may be contacted.
pub type AddressFilter = fn(IpAddr) -> bool;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Carried through reqwest's error chain so it can be recovered as
/// [`UnfurlError::BlockedAddress`].
#[derive(Debug, Error)]
#[error("{host} resolves to blocked address {ip}")]
pub struct BlockedTarget {
    pub host: String,
    pub ip: IpAddr,
}

#[derive(Debug, Error)]
#[error("too many redirects (limit {0})")]
struct TooManyRedirects(usize);

/// Returns `true` if `ip` is a private, loopback, or link-local address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            matches!(
                o,
                [127, ..]
                    | [10, ..]
                    | [169, 254, ..]
                    | [192, 168, ..]
                    | [0, ..]
                    | [255, 255, 255, 255]
            ) || (o[0] == 172 && (16..=31).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00 == 0xfc00)
                || (v6.segments()[0] & 0xffc0 == 0xfe80)
        }
    }
}

/// Walk an error's source chain looking for a [`BlockedTarget`].
pub fn find_blocked<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a BlockedTarget> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(blocked) = e.downcast_ref::<BlockedTarget>() {
            return Some(blocked);
        }
        current = e.source();
    }
    None
}

/// Resolve `host` and fail if any answer is blocked.
async fn resolve_checked(
    host: &str,
    port: u16,
    is_blocked: AddressFilter,
) -> Result<Vec<SocketAddr>, BoxError> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
    if let Some(addr) = addrs.iter().find(|addr| is_blocked(addr.ip())) {
        tracing::warn!(host, ip = %addr.ip(), "Refusing blocked address");
        return Err(Box::new(BlockedTarget {
            host: host.to_string(),
            ip: addr.ip(),
        }));
    }
    Ok(addrs)
}

/// Resolve the host of `url` before anything is sent.
pub async fn ensure_public_host(url: &Url, is_blocked: AddressFilter) -> UnfurlResult<()> {
    let host = url
        .host_str()
        .ok_or_else(|| UnfurlError::BlockedAddress(format!("{url} has no host")))?;
    let port = url.port_or_known_default().unwrap_or(80);

    match resolve_checked(host, port, is_blocked).await {
        Ok(_) => Ok(()),
        Err(e) => match e.downcast_ref::<BlockedTarget>() {
            Some(blocked) => Err(UnfurlError::BlockedAddress(blocked.ip.to_string())),
            None => {
                tracing::warn!(error = %e, host, "Could not resolve host");
                Err(UnfurlError::BlockedAddress(format!("could not resolve {host}")))
            }
        },
    }
}

/// DNS resolver for the reqwest client that drops connections to blocked
/// addresses, whatever hop of the request they occur on.
#[derive(Debug, Clone, Copy)]
pub struct GuardedResolver {
    is_blocked: AddressFilter,
}

impl GuardedResolver {
    pub fn new(is_blocked: AddressFilter) -> Arc<Self> {
        Arc::new(Self { is_blocked })
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let is_blocked = self.is_blocked;
        Box::pin(async move {
            // Port is filled in by the connector.
            let addrs = resolve_checked(name.as_str(), 0, is_blocked).await?;
            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}

fn literal_ip(url: &Url) -> Option<IpAddr> {
    match url.host()? {
        Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
        Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
        Host::Domain(_) => None,
    }
}

fn check_redirect(attempt: Attempt<'_>, max: usize, is_blocked: AddressFilter) -> Action {
    if let Some(ip) = literal_ip(attempt.url()) {
        if is_blocked(ip) {
            tracing::warn!(target_url = %attempt.url(), "Refusing redirect to blocked address");
            let host = attempt.url().host_str().unwrap_or_default().to_string();
            return attempt.error(BlockedTarget { host, ip });
        }
    }
    if max == 0 {
        attempt.stop()
    } else if attempt.previous().len() >= max {
        attempt.error(TooManyRedirects(max))
    } else {
        attempt.follow()
    }
}

/// Redirect policy honouring `max_redirects` that also refuses IP-literal
/// targets the filter blocks.
pub fn guarded_policy(max_redirects: Option<usize>, is_blocked: AddressFilter) -> Policy {
    let max = max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);
    Policy::custom(move |attempt| check_redirect(attempt, max, is_blocked))
}
