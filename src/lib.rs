pub mod resolver;

pub use resolver::{
    needs_token, AccessToken, AssetKey, AssetLocator, AuthorizationContext, FallbackItem,
    MediaDescriptor, PlaybackResolver, PremiumFallbackSelector, QualitySelector, ResolveError,
    ResolvedMedia, ResolvedTarget, ResolverConfig, ThumbnailRequest, ThumbnailResolver,
    ThumbnailSource, TokenGate, TokenService, VideoMetadata,
};
