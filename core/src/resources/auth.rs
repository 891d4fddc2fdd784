use serde::de::IgnoredAny;
use serde_json::json;

use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use crate::resource::{Resource, ResourceRequest};
use crate::response::ItemResponse;
use crate::types::{CodeExchangeRequest, RefreshTokenRequest, TokenExchangeResponse, TokenInfo};

const TOKEN_PATH: &str = "/v3/connect/token";
const REVOKE_PATH: &str = "/v3/connect/revoke";
const TOKEN_INFO_PATH: &str = "/v3/connect/tokeninfo";

/// Token endpoints under `/v3/connect`.
///
/// Errors from the token and revoke endpoints surface as `ApiError::Auth`,
/// errors from token introspection as `ApiError::TokenValidation`.
#[derive(Debug, Clone)]
pub struct Auth {
    resource: Resource,
    overrides: Overrides,
}

impl Auth {
    pub fn new(client: ApiClient) -> Self {
        Self {
            resource: Resource::new(client),
            overrides: Overrides::default(),
        }
    }

    pub fn with_overrides(&self, overrides: Overrides) -> Self {
        Self {
            resource: self.resource.clone(),
            overrides,
        }
    }

    /// Exchange an authorization code for tokens.
    pub fn exchange_code_for_token(&self, payload: &CodeExchangeRequest) -> Result<TokenExchangeResponse, ApiError> {
        let (client_id, client_secret) = self.credentials()?;
        let mut body = json!({
            "code": payload.code,
            "redirectUri": payload.redirect_uri,
            "clientId": client_id,
            "clientSecret": client_secret,
            "grantType": "authorization_code",
        });
        if let Some(verifier) = &payload.code_verifier {
            body["codeVerifier"] = json!(verifier);
        }
        self.resource.create(self.request(TOKEN_PATH), &body)
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh_access_token(&self, payload: &RefreshTokenRequest) -> Result<TokenExchangeResponse, ApiError> {
        let (client_id, client_secret) = self.credentials()?;
        let body = json!({
            "refreshToken": payload.refresh_token,
            "redirectUri": payload.redirect_uri,
            "clientId": client_id,
            "clientSecret": client_secret,
            "grantType": "refresh_token",
        });
        self.resource.create(self.request(TOKEN_PATH), &body)
    }

    pub fn revoke(&self, token: &str) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::post(REVOKE_PATH)
            .query_param("token", token)
            .overrides(self.overrides.clone());
        self.resource
            .client()
            .request::<IgnoredAny>(&descriptor)
            .map(|_| ())
    }

    /// Introspect an access token.
    pub fn access_token_info(&self, access_token: &str) -> Result<ItemResponse<TokenInfo>, ApiError> {
        self.resource
            .find(self.request(TOKEN_INFO_PATH).query_param("accessToken", access_token))
    }

    /// Introspect an id token.
    pub fn id_token_info(&self, id_token: &str) -> Result<ItemResponse<TokenInfo>, ApiError> {
        self.resource
            .find(self.request(TOKEN_INFO_PATH).query_param("idToken", id_token))
    }

    /// Client id and secret from the config. Without a configured secret the
    /// API key (per-call override first) is sent in its place.
    fn credentials(&self) -> Result<(String, String), ApiError> {
        let config = self.resource.client().config();
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| ApiError::InvalidRequest("a client id is required for token exchange".to_string()))?;
        let secret = config
            .client_secret
            .clone()
            .or_else(|| self.overrides.api_key.clone())
            .unwrap_or_else(|| config.api_key.clone());
        Ok((client_id, secret))
    }

    fn request(&self, path: &str) -> ResourceRequest {
        ResourceRequest::new(path).overrides(self.overrides.clone())
    }
}
