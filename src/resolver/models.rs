// Common data models for media resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ResolveError;

/// Default upper bound (in lines) for automatically selected progressive files
pub const DEFAULT_QUALITY_CEILING: u32 = 1080;

/// Which variant set of a descriptor is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantKind {
    /// Adaptive streaming manifest (HLS)
    Streaming,
    /// Direct file at one fixed quality
    Progressive,
}

/// Adaptive-streaming manifest; the player picks the rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingVariant {
    pub playlist_url: String,
}

/// Direct file tagged with its vertical resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveVariant {
    pub file_url: String,
    pub resolution: u32,
}

/// Subtitle track handed to the player alongside the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_id: String,
    pub label: String,
    pub url: String,
}

/// Everything needed to resolve one playable item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub streaming: Vec<StreamingVariant>,
    pub progressive: Vec<ProgressiveVariant>,
    /// Marked as premium content by the instance
    pub is_premium: bool,
    /// Live stream that has not started (or already ended)
    pub waiting_for_live: bool,
    pub captions: Vec<CaptionTrack>,
}

impl MediaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-file descriptor for a preview image
    pub fn image(url: impl Into<String>) -> Self {
        Self::new().with_progressive(url, 0)
    }

    pub fn with_streaming(mut self, playlist_url: impl Into<String>) -> Self {
        self.streaming.push(StreamingVariant {
            playlist_url: playlist_url.into(),
        });
        self
    }

    pub fn with_progressive(mut self, file_url: impl Into<String>, resolution: u32) -> Self {
        self.progressive.push(ProgressiveVariant {
            file_url: file_url.into(),
            resolution,
        });
        self
    }

    pub fn with_premium(mut self, is_premium: bool) -> Self {
        self.is_premium = is_premium;
        self
    }

    pub fn with_captions(mut self, captions: Vec<CaptionTrack>) -> Self {
        self.captions = captions;
        self
    }

    pub fn with_waiting_for_live(mut self, waiting: bool) -> Self {
        self.waiting_for_live = waiting;
        self
    }

    /// Variant set consulted by the locator, streaming preferred
    pub fn kind(&self) -> Option<VariantKind> {
        if self.streaming.iter().any(|s| !s.playlist_url.is_empty()) {
            Some(VariantKind::Streaming)
        } else if self.progressive.iter().any(|p| !p.file_url.is_empty()) {
            Some(VariantKind::Progressive)
        } else {
            None
        }
    }

    pub fn has_variants(&self) -> bool {
        self.kind().is_some()
    }
}

/// Requested playback quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualitySelector {
    /// Best default, bounded by the configured ceiling
    #[default]
    Auto,
    /// Exact resolution in lines (e.g. 720)
    Explicit(u32),
}

impl fmt::Display for QualitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Explicit(height) => write!(f, "{}", height),
        }
    }
}

impl FromStr for QualitySelector {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") || trimmed.is_empty() {
            return Ok(Self::Auto);
        }

        let digits = trimmed.strip_suffix(|c: char| c == 'p' || c == 'P').unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(Self::Explicit)
            .map_err(|_| ResolveError::InvalidMetadata(format!("unknown quality: {}", s)))
    }
}

/// Short-lived token and the asset path it was minted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub asset_path: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, asset_path: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            asset_path: asset_path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenField {
    pub token: String,
}

/// Token service payload, one token per variant kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    #[serde(default)]
    pub streaming_playlists: Option<TokenField>,
    #[serde(default)]
    pub files: Option<TokenField>,
}

impl TokenGrant {
    /// Token matching the variant kind in use
    pub fn token_for(&self, kind: VariantKind) -> Option<&str> {
        let field = match kind {
            VariantKind::Streaming => self.streaming_playlists.as_ref(),
            VariantKind::Progressive => self.files.as_ref(),
        };
        field.map(|f| f.token.as_str()).filter(|t| !t.is_empty())
    }
}

/// Identity of one asset instance: instance host plus video id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub host: String,
    pub id: String,
}

impl AssetKey {
    pub fn new(host: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.host)
    }
}

/// Viewer entitlement for a premium item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationContext {
    Available,
    Unavailable,
    /// Entitlement lookup still in flight
    #[default]
    Pending,
}

impl AuthorizationContext {
    /// Map a subscription lookup (`None` while loading)
    pub fn from_subscription(subscribed: Option<bool>) -> Self {
        match subscribed {
            Some(true) => Self::Available,
            Some(false) => Self::Unavailable,
            None => Self::Pending,
        }
    }
}

/// Final locator consumed by the player or image renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub url: String,
    pub needs_token: bool,
    pub applied_token: Option<String>,
}

/// Resolved target plus the captions of the item that actually resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub target: ResolvedTarget,
    pub captions: Vec<CaptionTrack>,
    /// Premium fallback content; resume positions and history do not apply
    pub is_fallback: bool,
}

impl ResolvedMedia {
    pub fn allows_resume(&self) -> bool {
        !self.is_fallback
    }
}

/// Network configuration for the token service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Highest resolution picked without an explicit quality
    pub quality_ceiling: u32,
    /// Image shown when a thumbnail cannot be resolved
    pub placeholder_thumbnail: String,
    /// Scheme used to reach instance APIs ("https" outside tests)
    pub api_scheme: String,
    /// Viewer's OAuth access token, sent to the token endpoint
    pub bearer_token: Option<String>,
    pub network: NetworkConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            quality_ceiling: DEFAULT_QUALITY_CEILING,
            placeholder_thumbnail: "assets/thumbnailFallback.png".to_string(),
            api_scheme: "https".to_string(),
            bearer_token: None,
            network: NetworkConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_quality_ceiling(mut self, ceiling: u32) -> Self {
        self.quality_ceiling = ceiling;
        self
    }

    pub fn with_placeholder_thumbnail(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder_thumbnail = placeholder.into();
        self
    }

    pub fn with_api_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.api_scheme = scheme.into();
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.network.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.network.timeout = Some(seconds);
        self
    }
}
