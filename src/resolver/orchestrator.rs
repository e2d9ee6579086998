// Orchestrator tying metadata, authorization, quality, fallback and tokens together
//
// Every input change recomputes synchronously under the session lock. Token
// fetches run outside the lock; their result is settled against whatever
// the session looks like when they finish.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::backends::HttpTokenService;
use super::controller::{ResolutionController, ResolutionState, TokenRequest};
use super::errors::ResolveError;
use super::fallback::{FallbackDecision, FallbackItem, PremiumFallbackSelector};
use super::gate::TokenGate;
use super::locator::AssetLocator;
use super::models::{
    AssetKey, AuthorizationContext, MediaDescriptor, QualitySelector, ResolvedMedia,
    ResolverConfig,
};

struct Session {
    item: Option<AssetKey>,
    primary: Option<MediaDescriptor>,
    authorization: AuthorizationContext,
    controller: ResolutionController,
    fallback: PremiumFallbackSelector,
    is_fallback: bool,
    error: Option<ResolveError>,
}

/// Resolves the playable target for the item currently on screen
pub struct PlaybackResolver {
    gate: Arc<TokenGate>,
    session: Mutex<Session>,
    published: watch::Sender<Option<ResolvedMedia>>,
}

impl PlaybackResolver {
    pub fn new(gate: Arc<TokenGate>, config: &ResolverConfig) -> Self {
        let (published, _) = watch::channel(None);

        Self {
            gate,
            session: Mutex::new(Session {
                item: None,
                primary: None,
                authorization: AuthorizationContext::Pending,
                controller: ResolutionController::new(AssetLocator::new(config.quality_ceiling)),
                fallback: PremiumFallbackSelector::pending(),
                is_fallback: false,
                error: None,
            }),
            published,
        }
    }

    /// Resolver talking to the instance token endpoint
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let service = Arc::new(HttpTokenService::new(config)?);
        Ok(Self::new(Arc::new(TokenGate::new(service)), config))
    }

    /// Replace the fallback selector (e.g. one with a seeded random source)
    pub fn with_fallback_selector(self, selector: PremiumFallbackSelector) -> Self {
        self.session.lock().fallback = selector;
        self
    }

    pub fn gate(&self) -> &Arc<TokenGate> {
        &self.gate
    }

    /// Latest published target; `None` while loading or failed
    pub fn current(&self) -> Option<ResolvedMedia> {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ResolvedMedia>> {
        self.published.subscribe()
    }

    /// Error the consumer should display, if any
    pub fn error(&self) -> Option<ResolveError> {
        let session = self.session.lock();
        session
            .error
            .clone()
            .or_else(|| session.controller.error())
    }

    pub fn state(&self) -> ResolutionState {
        self.session.lock().controller.state()
    }

    /// Selectable qualities for the item currently resolving
    pub fn available_qualities(&self) -> Vec<u32> {
        let session = self.session.lock();
        session
            .controller
            .descriptor()
            .map(AssetLocator::available_qualities)
            .unwrap_or_default()
    }

    /// Start a new item instance; its metadata follows via `load_metadata`
    pub fn open(&self, item: AssetKey) {
        let mut session = self.session.lock();
        self.release_item(&mut session);

        info!(asset = %item, "opening item");
        session.item = Some(item);
        session.authorization = AuthorizationContext::Pending;
        self.publish_locked(&session);
    }

    /// Drop the current item instance
    pub fn close(&self) {
        let mut session = self.session.lock();
        self.release_item(&mut session);
        self.publish_locked(&session);
    }

    /// Metadata for `item` arrived; dropped unless `item` is still the open one
    pub async fn load_metadata(&self, item: &AssetKey, descriptor: MediaDescriptor) {
        let request = {
            let mut session = self.session.lock();
            if session.item.as_ref() != Some(item) {
                debug!(asset = %item, open = ?session.item, "metadata for a superseded item, ignoring");
                return;
            }
            session.primary = Some(descriptor);
            self.sync(&mut session)
        };
        self.drive(request).await;
    }

    /// Viewer entitlement for the open item changed
    pub async fn set_authorization(&self, authorization: AuthorizationContext) {
        let request = {
            let mut session = self.session.lock();
            session.authorization = authorization;
            self.sync(&mut session)
        };
        self.drive(request).await;
    }

    /// Fallback pool finished loading (or was refreshed)
    pub async fn set_fallback_pool(&self, pool: Vec<FallbackItem>) {
        let request = {
            let mut session = self.session.lock();
            session.fallback.set_pool(pool);
            self.sync(&mut session)
        };
        self.drive(request).await;
    }

    pub async fn set_quality(&self, quality: QualitySelector) {
        let request = {
            let mut session = self.session.lock();
            session.controller.set_quality(quality)
        };
        self.drive(request).await;
    }

    /// Recompute which descriptor should be resolving and feed it to the controller
    fn sync(&self, session: &mut Session) -> Option<TokenRequest> {
        let (Some(item), Some(primary)) = (session.item.clone(), session.primary.clone()) else {
            return None;
        };

        let (asset, descriptor, is_fallback) =
            match session.fallback.evaluate(primary.is_premium, session.authorization) {
                FallbackDecision::Primary => (item, primary, false),
                FallbackDecision::Fallback(choice) => {
                    (choice.asset.clone(), choice.descriptor.clone(), true)
                }
                FallbackDecision::Deferred => {
                    debug!(asset = %item, "premium entitlement pending, holding resolution");
                    self.reset_controller(session);
                    session.error = None;
                    return None;
                }
                FallbackDecision::NoFallback => {
                    debug!(asset = %item, "premium item unavailable and no fallback configured");
                    self.reset_controller(session);
                    session.error = Some(ResolveError::NoFallback);
                    return None;
                }
            };

        if let Some(previous) = session.controller.asset() {
            if previous != &asset {
                self.gate.forget(previous);
            }
        }

        session.is_fallback = is_fallback;
        session.error = None;
        session.controller.load(asset, descriptor)
    }

    async fn drive(&self, request: Option<TokenRequest>) {
        self.publish();

        let Some(request) = request else {
            return;
        };

        let token = self
            .gate
            .fetch_token(&request.asset, request.kind, &request.asset_path)
            .await;

        let mut session = self.session.lock();
        if let Err(e) = session.controller.settle_token(&request, token) {
            debug!(asset = %request.asset, error = %e, "token result dropped");
            return;
        }
        self.publish_locked(&session);
    }

    fn publish(&self) {
        let session = self.session.lock();
        self.publish_locked(&session);
    }

    /// Send while the session guard is held so publishers cannot reorder
    fn publish_locked(&self, session: &Session) {
        let next = session.controller.target().map(|target| ResolvedMedia {
            target: target.clone(),
            captions: session
                .controller
                .descriptor()
                .map(|d| d.captions.clone())
                .unwrap_or_default(),
            is_fallback: session.is_fallback,
        });

        self.published.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Reset the controller, dropping the token of whatever asset it held
    fn reset_controller(&self, session: &mut Session) {
        if let Some(asset) = session.controller.asset() {
            self.gate.forget(asset);
        }
        session.controller.reset();
    }

    /// End the current item instance: tokens, fallback choice and quality all start over
    fn release_item(&self, session: &mut Session) {
        self.reset_controller(session);
        if let Some(item) = session.item.take() {
            self.gate.forget(&item);
        }
        session.primary = None;
        session.fallback.reset();
        session.controller.set_quality(QualitySelector::Auto);
        session.is_fallback = false;
        session.error = None;
    }
}
