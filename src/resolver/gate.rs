// Token gate - decides whether a URL needs a token and fetches it once per asset
//
// Concurrent callers for the same asset share one request through a
// per-asset `OnceCell`. Failures settle to `None`: a missing token is a
// normal state and the asset then loads unauthenticated.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::models::{AccessToken, AssetKey, TokenGrant, VariantKind};
use super::traits::TokenService;
use super::utils::is_private_path;

/// Whether the URL follows the private-asset path convention
pub fn needs_token(url: &str) -> bool {
    is_private_path(url)
}

type GrantCell = Arc<OnceCell<Option<TokenGrant>>>;

pub struct TokenGate {
    service: Arc<dyn TokenService>,
    grants: Mutex<HashMap<AssetKey, GrantCell>>,
}

impl TokenGate {
    pub fn new(service: Arc<dyn TokenService>) -> Self {
        Self {
            service,
            grants: Mutex::new(HashMap::new()),
        }
    }

    /// Token for one asset and variant kind, `None` when unavailable
    pub async fn fetch_token(
        &self,
        asset: &AssetKey,
        kind: VariantKind,
        asset_path: &str,
    ) -> Option<AccessToken> {
        let grant = self.fetch_grant(asset).await?;

        match grant.token_for(kind) {
            Some(token) => Some(AccessToken::new(token, asset_path)),
            None => {
                warn!(%asset, ?kind, "token grant has no token for this variant kind");
                None
            }
        }
    }

    /// Raw grant for an asset, requested at most once while cached
    pub async fn fetch_grant(&self, asset: &AssetKey) -> Option<TokenGrant> {
        let cell = {
            let mut grants = self.grants.lock();
            grants
                .entry(asset.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| self.request(asset)).await.clone()
    }

    /// Drop the cached grant; the next fetch issues a new request
    pub fn forget(&self, asset: &AssetKey) {
        if self.grants.lock().remove(asset).is_some() {
            debug!(%asset, "forgot cached token");
        }
    }

    pub fn is_cached(&self, asset: &AssetKey) -> bool {
        self.grants
            .lock()
            .get(asset)
            .map_or(false, |cell| cell.initialized())
    }

    async fn request(&self, asset: &AssetKey) -> Option<TokenGrant> {
        debug!(%asset, service = self.service.name(), "fetching token");

        match self.service.request_token(&asset.host, &asset.id).await {
            Ok(grant) => Some(grant),
            Err(e) => {
                warn!(%asset, service = self.service.name(), error = %e, "token fetch failed, continuing without token");
                None
            }
        }
    }
}
