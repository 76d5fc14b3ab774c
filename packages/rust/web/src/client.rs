//! Shared HTTP client construction and target checks.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use url::{Host, Url};

use reviewgen_shared::{ReviewError, Result, ScrapeConfig};

/// Maximum redirects followed for a single request.
pub(crate) const MAX_REDIRECTS: usize = 5;

/// Longest error body kept in an [`ReviewError::Http`].
const ERROR_BODY_CHARS: usize = 200;

/// Build a reqwest client from the `[scrape]` settings. With `guard_targets`
/// every redirect hop is checked against [`is_blocked_target`] before it is
/// requested.
pub(crate) fn build_client(config: &ScrapeConfig, guard_targets: bool) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect_policy(guard_targets))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ReviewError::Network(format!("failed to build HTTP client: {e}")))
}

fn redirect_policy(guard_targets: bool) -> Policy {
    if !guard_targets {
        return Policy::limited(MAX_REDIRECTS);
    }
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("too many redirects (max {MAX_REDIRECTS})"));
        }
        if is_blocked_target(attempt.url()) {
            let target = attempt.url().to_string();
            return attempt.error(format!("redirect to non-public address refused: {target}"));
        }
        attempt.follow()
    })
}

/// Turn a non-success response into [`ReviewError::Http`], keeping the head
/// of the body for diagnostics.
pub(crate) async fn error_for_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.trim().chars().take(ERROR_BODY_CHARS).collect();
    Err(ReviewError::http(service, status.as_u16(), body))
}

/// Whether `url` points somewhere a scraper should never go: a non-web
/// scheme, loopback, or a private network.
pub(crate) fn is_blocked_target(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return true;
    }

    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10
                || (a == 100 && (b & 0xC0) == 64)
                || (a == 192 && b == 0 && c == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
