// Token service trait definition

use async_trait::async_trait;

use super::errors::ResolveError;
use super::models::TokenGrant;

/// Source of short-lived video file tokens
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Name of the service (for logging)
    fn name(&self) -> &'static str;

    /// Request a token for one asset on the given instance
    async fn request_token(&self, host: &str, asset_id: &str) -> Result<TokenGrant, ResolveError>;
}
