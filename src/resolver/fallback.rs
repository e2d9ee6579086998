// Premium fallback selection
//
// A premium item the viewer is not entitled to is replaced by one entry of
// a configured pool (typically a promotional clip). The entry is drawn once
// per item instance and kept until `reset`.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{AssetKey, AuthorizationContext, MediaDescriptor};

/// Substitute content with its own descriptor and captions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackItem {
    pub asset: AssetKey,
    pub descriptor: MediaDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision<'a> {
    /// Resolve the original item
    Primary,
    /// Authorization or pool still loading; show nothing yet
    Deferred,
    /// Resolve this substitute instead
    Fallback(&'a FallbackItem),
    /// Unavailable premium item and nothing to substitute
    NoFallback,
}

pub struct PremiumFallbackSelector {
    /// `None` until the pool has been loaded
    pool: Option<Vec<FallbackItem>>,
    choice: Option<usize>,
    rng: Box<dyn RngCore + Send>,
}

impl PremiumFallbackSelector {
    /// Selector whose pool is still being fetched
    pub fn pending() -> Self {
        Self {
            pool: None,
            choice: None,
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    pub fn new(pool: Vec<FallbackItem>) -> Self {
        let mut selector = Self::pending();
        selector.pool = Some(pool);
        selector
    }

    /// Replace the random source (seeded generators in tests)
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Install or refresh the pool. An existing choice survives while it is still valid.
    pub fn set_pool(&mut self, pool: Vec<FallbackItem>) {
        if self.choice.map_or(false, |i| i >= pool.len()) {
            self.choice = None;
        }
        self.pool = Some(pool);
    }

    /// Start a new item instance
    pub fn reset(&mut self) {
        self.choice = None;
    }

    pub fn chosen(&self) -> Option<&FallbackItem> {
        let index = self.choice?;
        self.pool.as_ref()?.get(index)
    }

    pub fn evaluate(
        &mut self,
        is_premium: bool,
        authorization: AuthorizationContext,
    ) -> FallbackDecision<'_> {
        if !is_premium {
            return FallbackDecision::Primary;
        }

        match authorization {
            AuthorizationContext::Available => FallbackDecision::Primary,
            AuthorizationContext::Pending => FallbackDecision::Deferred,
            AuthorizationContext::Unavailable => self.pick(),
        }
    }

    fn pick(&mut self) -> FallbackDecision<'_> {
        let Some(pool) = self.pool.as_ref() else {
            return FallbackDecision::Deferred;
        };

        if pool.is_empty() {
            return FallbackDecision::NoFallback;
        }

        let index = match self.choice {
            Some(index) => index,
            None => {
                let index = self.rng.gen_range(0..pool.len());
                debug!(index, pool_size = pool.len(), "premium fallback chosen");
                self.choice = Some(index);
                index
            }
        };

        FallbackDecision::Fallback(&pool[index])
    }
}
