// Thumbnail resolution
//
// Preview images go through the same controller and token gate as videos.
// Anything short of an authorized (or public) URL degrades to the
// placeholder image.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::controller::ResolutionController;
use super::gate::TokenGate;
use super::locator::AssetLocator;
use super::models::{AssetKey, MediaDescriptor, ResolvedTarget, ResolverConfig};
use super::utils::absolute_url;

/// What the image renderer should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailSource {
    Remote(ResolvedTarget),
    Placeholder(String),
}

impl ThumbnailSource {
    pub fn uri(&self) -> &str {
        match self {
            Self::Remote(target) => &target.url,
            Self::Placeholder(path) => path,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Preview of one video on one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub asset: AssetKey,
    /// Instance-relative (`/lazy-static/previews/x.jpg`) or absolute
    pub preview_path: Option<String>,
}

struct ThumbnailState {
    controller: ResolutionController,
    load_failed: bool,
}

/// Resolver for a single thumbnail slot
pub struct ThumbnailResolver {
    gate: Arc<TokenGate>,
    scheme: String,
    placeholder: String,
    state: Mutex<ThumbnailState>,
}

impl ThumbnailResolver {
    pub fn new(gate: Arc<TokenGate>, config: &ResolverConfig) -> Self {
        Self {
            gate,
            scheme: config.api_scheme.clone(),
            placeholder: config.placeholder_thumbnail.clone(),
            state: Mutex::new(ThumbnailState {
                controller: ResolutionController::new(AssetLocator::new(config.quality_ceiling)),
                load_failed: false,
            }),
        }
    }

    pub async fn resolve(&self, request: &ThumbnailRequest) -> ThumbnailSource {
        let preview = request
            .preview_path
            .as_deref()
            .filter(|p| !p.is_empty() && !request.asset.host.is_empty());

        let Some(preview) = preview else {
            let mut state = self.state.lock();
            self.release(&mut state);
            return self.placeholder();
        };

        let url = absolute_url(&self.scheme, &request.asset.host, preview);
        let token_request = {
            let mut state = self.state.lock();
            if state.controller.asset() != Some(&request.asset) {
                self.release(&mut state);
            }
            state
                .controller
                .load(request.asset.clone(), MediaDescriptor::image(url))
        };

        if let Some(token_request) = token_request {
            let token = self
                .gate
                .fetch_token(&token_request.asset, token_request.kind, &token_request.asset_path)
                .await;

            let mut state = self.state.lock();
            if state.controller.settle_token(&token_request, token).is_err() {
                debug!(asset = %token_request.asset, "thumbnail token result dropped");
            }
        }

        self.current()
    }

    /// The renderer failed to load the image
    pub fn mark_load_failed(&self) {
        self.state.lock().load_failed = true;
    }

    pub fn current(&self) -> ThumbnailSource {
        let state = self.state.lock();
        if state.load_failed {
            return self.placeholder();
        }

        match state.controller.target() {
            // Gated preview without a token would only produce a broken image
            Some(target) if target.needs_token && target.applied_token.is_none() => {
                self.placeholder()
            }
            Some(target) => ThumbnailSource::Remote(target.clone()),
            None => self.placeholder(),
        }
    }

    fn release(&self, state: &mut ThumbnailState) {
        if let Some(asset) = state.controller.asset() {
            self.gate.forget(asset);
        }
        state.controller.reset();
        state.load_failed = false;
    }

    fn placeholder(&self) -> ThumbnailSource {
        ThumbnailSource::Placeholder(self.placeholder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::gate::testing::MockTokenService;

    fn thumbnail(service: Arc<MockTokenService>) -> ThumbnailResolver {
        ThumbnailResolver::new(Arc::new(TokenGate::new(service)), &ResolverConfig::default())
    }

    fn request(id: &str, path: Option<&str>) -> ThumbnailRequest {
        ThumbnailRequest {
            asset: AssetKey::new("tube.example", id),
            preview_path: path.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_public_thumbnail_needs_no_token() {
        let service = Arc::new(MockTokenService::granting("tok"));
        let resolver = thumbnail(service.clone());

        let source = resolver
            .resolve(&request("abc", Some("/static/previews/abc.jpg")))
            .await;

        assert_eq!(source.uri(), "https://tube.example/static/previews/abc.jpg");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_private_thumbnail_gets_files_token() {
        let service = Arc::new(MockTokenService::granting("tok"));
        let resolver = thumbnail(service.clone());

        let source = resolver
            .resolve(&request("abc", Some("/lazy-static/previews/abc.jpg")))
            .await;

        assert_eq!(
            source.uri(),
            "https://tube.example/lazy-static/previews/abc.jpg?videoFileToken=tok"
        );
    }

    #[tokio::test]
    async fn test_failed_token_falls_back_to_placeholder() {
        let service = Arc::new(MockTokenService::failing());
        let resolver = thumbnail(service.clone());

        let source = resolver
            .resolve(&request("abc", Some("/lazy-static/previews/abc.jpg")))
            .await;

        assert!(source.is_placeholder());
        assert!(!source.uri().contains("videoFileToken"));
        assert_eq!(source.uri(), ResolverConfig::default().placeholder_thumbnail);
    }

    #[tokio::test]
    async fn test_missing_preview_and_render_error() {
        let resolver = thumbnail(Arc::new(MockTokenService::granting("tok")));
        assert!(resolver.resolve(&request("abc", None)).await.is_placeholder());

        let source = resolver
            .resolve(&request("abc", Some("/static/previews/abc.jpg")))
            .await;
        assert!(!source.is_placeholder());

        resolver.mark_load_failed();
        assert!(resolver.current().is_placeholder());

        // A new asset gets a fresh attempt
        let next = resolver
            .resolve(&request("def", Some("/static/previews/def.jpg")))
            .await;
        assert!(!next.is_placeholder());
    }

    #[tokio::test]
    async fn test_token_fetched_once_per_asset() {
        let service = Arc::new(MockTokenService::granting("tok"));
        let resolver = thumbnail(service.clone());
        let req = request("abc", Some("/lazy-static/previews/abc.jpg"));

        resolver.resolve(&req).await;
        resolver.resolve(&req).await;
        assert_eq!(service.calls(), 1);

        resolver
            .resolve(&request("other", Some("/lazy-static/previews/other.jpg")))
            .await;
        assert_eq!(service.calls(), 2);
    }
}
