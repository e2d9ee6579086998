// Helper functions shared by the locator, gate and token backends

use std::time::Duration;

use tracing::warn;
use url::Url;

use super::errors::ResolveError;
use super::models::NetworkConfig;

/// Path segments that mark an asset as requiring a video file token.
/// `/private/` covers files and manifests, `/lazy-static/` covers previews.
pub const PRIVATE_PATH_SEGMENTS: [&str; 2] = ["/private/", "/lazy-static/"];

pub const TOKEN_PARAM: &str = "videoFileToken";
pub const REINJECT_PARAM: &str = "reinjectVideoFileToken";

/// Path component of an absolute URL, or of a bare path like `/lazy-static/x.jpg`
pub fn url_path(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.path().to_string();
    }

    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    url[..end].to_string()
}

/// Whether the URL's path follows the private-asset convention
pub fn is_private_path(url: &str) -> bool {
    let path = url_path(url);
    PRIVATE_PATH_SEGMENTS.iter().any(|segment| path.contains(segment))
}

/// Append `key=value` to the query, ahead of any `#fragment`
pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = url.split_at(url.find('#').unwrap_or(url.len()));
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}{}", base, separator, key, value, fragment)
}

/// Absolute URL for an instance-relative path (`/lazy-static/...`)
pub fn absolute_url(scheme: &str, host: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}://{}{}", scheme, host, path)
}

/// Build an HTTP client honoring timeout and proxy settings
pub fn build_http_client(config: &NetworkConfig) -> Result<reqwest::Client, ResolveError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(Duration::from_secs(u64::from(timeout)));
    }

    if let Some(proxy_url) = config.proxy.as_deref() {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                // Direct connection rather than no client at all
                warn!(proxy = proxy_url, error = %e, "invalid proxy URL, connecting directly");
            }
        }
    }

    builder
        .build()
        .map_err(|e| ResolveError::Network(format!("failed to build HTTP client: {}", e)))
}
