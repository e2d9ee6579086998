// ResolutionController - per-asset-instance state machine
//
//   Idle -> DescriptorReady -> Gated -> Resolved
//                           \--------> Resolved | Failed
//
// The controller performs no I/O. When a token is needed it hands out a
// `TokenRequest`; whoever fetched the token settles it back. Every request
// carries the generation it was issued for, so results for a replaced asset
// are rejected instead of applied.

use tracing::debug;

use super::errors::ResolveError;
use super::locator::AssetLocator;
use super::models::{
    AccessToken, AssetKey, MediaDescriptor, QualitySelector, ResolvedTarget, VariantKind,
};
use super::utils::{is_private_path, url_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// No descriptor yet
    Idle,
    /// Metadata present, gating not decided
    DescriptorReady,
    /// Path needs a token and the token is outstanding
    Gated,
    /// Target available
    Resolved,
    /// Descriptor present but nothing resolvable
    Failed,
}

/// Ticket for a token fetch issued by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub generation: u64,
    pub asset: AssetKey,
    pub kind: VariantKind,
    /// Path the token is being minted for
    pub asset_path: String,
}

#[derive(Debug)]
pub struct ResolutionController {
    locator: AssetLocator,
    generation: u64,
    asset: Option<AssetKey>,
    descriptor: Option<MediaDescriptor>,
    quality: QualitySelector,
    token: Option<AccessToken>,
    /// A token fetch settled (successfully or not) for the current asset
    token_settled: bool,
    token_pending: bool,
    state: ResolutionState,
    target: Option<ResolvedTarget>,
}

impl ResolutionController {
    pub fn new(locator: AssetLocator) -> Self {
        Self {
            locator,
            generation: 0,
            asset: None,
            descriptor: None,
            quality: QualitySelector::Auto,
            token: None,
            token_settled: false,
            token_pending: false,
            state: ResolutionState::Idle,
            target: None,
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn target(&self) -> Option<&ResolvedTarget> {
        self.target.as_ref()
    }

    pub fn quality(&self) -> QualitySelector {
        self.quality
    }

    pub fn asset(&self) -> Option<&AssetKey> {
        self.asset.as_ref()
    }

    pub fn descriptor(&self) -> Option<&MediaDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Visible error, if any. A live stream that has not started is not a failure.
    pub fn error(&self) -> Option<ResolveError> {
        match (&self.state, &self.descriptor) {
            (ResolutionState::Failed, Some(d)) if !d.waiting_for_live => {
                Some(ResolveError::NoVariant)
            }
            _ => None,
        }
    }

    /// Metadata arrived for `asset`. Returns a token request when the path is gated.
    pub fn load(&mut self, asset: AssetKey, descriptor: MediaDescriptor) -> Option<TokenRequest> {
        if self.asset.as_ref() != Some(&asset) {
            self.reset();
            self.asset = Some(asset);
        }

        self.descriptor = Some(descriptor);
        self.state = ResolutionState::DescriptorReady;
        self.evaluate()
    }

    /// Change the requested quality; recomputes unless a token is outstanding
    pub fn set_quality(&mut self, quality: QualitySelector) -> Option<TokenRequest> {
        self.quality = quality;

        if self.descriptor.is_none() || self.token_pending {
            // Picked up when the token settles
            return None;
        }

        self.evaluate()
    }

    /// Apply the outcome of a token fetch against the current quality
    pub fn settle_token(
        &mut self,
        request: &TokenRequest,
        token: Option<AccessToken>,
    ) -> Result<Option<&ResolvedTarget>, ResolveError> {
        if request.generation != self.generation || self.asset.as_ref() != Some(&request.asset) {
            debug!(
                asset = %request.asset,
                generation = request.generation,
                current = self.generation,
                "discarding stale token result"
            );
            return Err(ResolveError::StaleResolution);
        }

        debug!(asset = %request.asset, has_token = token.is_some(), "token settled");
        self.token = token;
        self.token_settled = true;
        self.token_pending = false;

        // A different gated variant may now be selected; it reuses this result
        let _ = self.evaluate();
        Ok(self.target.as_ref())
    }

    /// Forget the current asset entirely
    pub fn reset(&mut self) {
        self.generation += 1;
        self.asset = None;
        self.descriptor = None;
        self.token = None;
        self.token_settled = false;
        self.token_pending = false;
        self.state = ResolutionState::Idle;
        self.target = None;
    }

    fn evaluate(&mut self) -> Option<TokenRequest> {
        let Some(descriptor) = self.descriptor.as_ref() else {
            self.state = ResolutionState::Idle;
            self.target = None;
            return None;
        };

        let Some(selection) = self.locator.select(descriptor, self.quality) else {
            debug!(generation = self.generation, "no resolvable variant");
            self.state = ResolutionState::Failed;
            self.target = None;
            return None;
        };

        if is_private_path(selection.url) && !self.token_settled {
            let request = match (&self.asset, self.token_pending) {
                (Some(asset), false) => Some(TokenRequest {
                    generation: self.generation,
                    asset: asset.clone(),
                    kind: selection.kind,
                    asset_path: url_path(selection.url),
                }),
                _ => None,
            };

            self.token_pending = true;
            self.state = ResolutionState::Gated;
            self.target = None;
            return request;
        }

        self.target = self
            .locator
            .locate(descriptor, self.quality, self.token.as_ref());
        self.state = match self.target {
            Some(_) => ResolutionState::Resolved,
            None => ResolutionState::Failed,
        };
        debug!(
            generation = self.generation,
            state = ?self.state,
            quality = %self.quality,
            "resolution recomputed"
        );
        None
    }
}

impl Default for ResolutionController {
    fn default() -> Self {
        Self::new(AssetLocator::default())
    }
}
