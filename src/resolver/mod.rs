// Resolver module - playable URLs and access tokens for video and thumbnail assets
//
// Layers, leaf to root:
// - locator: pure variant + token URL selection
// - gate: private-path detection and deduplicated token fetches
// - controller: per-asset state machine, no I/O
// - fallback: premium substitution
// - orchestrator / thumbnail: async drivers used by the UI layer

pub mod backends;
pub mod controller;
pub mod errors;
pub mod fallback;
pub mod gate;
pub mod locator;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod thumbnail;
pub mod traits;
pub mod utils;

pub use backends::HttpTokenService;
pub use controller::{ResolutionController, ResolutionState, TokenRequest};
pub use errors::ResolveError;
pub use fallback::{FallbackDecision, FallbackItem, PremiumFallbackSelector};
pub use gate::{needs_token, TokenGate};
pub use locator::AssetLocator;
pub use metadata::{parse_captions, VideoMetadata};
pub use models::{
    AccessToken, AssetKey, AuthorizationContext, CaptionTrack, MediaDescriptor, NetworkConfig,
    QualitySelector, ResolvedMedia, ResolvedTarget, ResolverConfig, TokenGrant, VariantKind,
};
pub use orchestrator::PlaybackResolver;
pub use thumbnail::{ThumbnailRequest, ThumbnailResolver, ThumbnailSource};
pub use traits::TokenService;
