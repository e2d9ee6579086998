// Error types for media resolution

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Descriptor is present but no variant can be played at any quality
    NoVariant,

    /// Premium item is unavailable to the viewer and no fallback is configured
    NoFallback,

    /// Token service could not provide a token (recovered as "no token")
    TokenFetchFailed(String),

    /// Result arrived for an asset instance that has since been replaced
    StaleResolution,

    /// Video or caption metadata could not be decoded
    InvalidMetadata(String),

    /// Token endpoint answered with a non-success status
    Http { status: u16, url: String },

    /// Transport level failure talking to the token endpoint
    Network(String),
}

impl ResolveError {
    /// Whether the consumer should show a "failed to load" state
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::NoVariant | Self::NoFallback)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVariant => write!(f, "Video failed to load: no playable variant"),
            Self::NoFallback => write!(
                f,
                "Premium content is not available and no fallback content is configured"
            ),
            Self::TokenFetchFailed(msg) => write!(f, "Token fetch failed: {}", msg),
            Self::StaleResolution => write!(f, "Resolution superseded by a newer asset"),
            Self::InvalidMetadata(msg) => write!(f, "Invalid metadata: {}", msg),
            Self::Http { status, url } => write!(f, "HTTP {} for URL: {}", status, url),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::Http {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }

        if e.is_decode() {
            return Self::TokenFetchFailed(format!("malformed token payload: {}", e));
        }

        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidMetadata(e.to_string())
    }
}
