use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::resolver::errors::ResolveError;
use crate::resolver::models::{ResolverConfig, TokenGrant};
use crate::resolver::traits::TokenService;
use crate::resolver::utils;

/// Token service backed by the instance REST API
/// (`POST /api/v1/videos/{id}/token`)
pub struct HttpTokenService {
    client: reqwest::Client,
    scheme: String,
    bearer_token: Option<String>,
}

impl HttpTokenService {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            client: utils::build_http_client(&config.network)?,
            scheme: config.api_scheme.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Token endpoint for an asset; the id is percent-encoded as one path segment
    pub fn token_url(&self, host: &str, asset_id: &str) -> Result<Url, ResolveError> {
        let base = format!("{}://{}", self.scheme, host);
        let mut url = Url::parse(&base)
            .map_err(|e| ResolveError::Network(format!("invalid instance host {}: {}", host, e)))?;

        url.path_segments_mut()
            .map_err(|_| ResolveError::Network(format!("instance host cannot be a base: {}", host)))?
            .pop_if_empty()
            .extend(["api", "v1", "videos", asset_id, "token"]);

        Ok(url)
    }
}

#[async_trait]
impl TokenService for HttpTokenService {
    fn name(&self) -> &'static str {
        "instance-api"
    }

    async fn request_token(&self, host: &str, asset_id: &str) -> Result<TokenGrant, ResolveError> {
        let url = self.token_url(host, asset_id)?;
        debug!(%url, "requesting video file token");

        let mut request = self.client.post(url.clone());
        if let Some(bearer) = self.bearer_token.as_deref() {
            request = request.bearer_auth(bearer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<TokenGrant>(&body)
            .map_err(|e| ResolveError::TokenFetchFailed(format!("malformed token payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_layout() {
        let service = HttpTokenService::new(&ResolverConfig::default()).unwrap();
        let url = service.token_url("tube.example", "9c9de5e8-0a1e").unwrap();
        assert_eq!(
            url.as_str(),
            "https://tube.example/api/v1/videos/9c9de5e8-0a1e/token"
        );
    }

    #[test]
    fn test_token_url_encodes_id() {
        let service =
            HttpTokenService::new(&ResolverConfig::default().with_api_scheme("http")).unwrap();
        let url = service.token_url("127.0.0.1:9000", "a/b").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v1/videos/a%2Fb/token");
    }
}
