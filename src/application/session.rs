use crate::domain::models::OAuthToken;
use crate::infrastructure::config::GoogleOAuthConfig;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::oauth_client::{
    ClientCredentials, OAuthHttpClient, OAuthTokenResponse, TokenGrant,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

const TOKEN_LEEWAY_SECONDS: i64 = 60;

/// "Give me the current access credential or tell me none exists."
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn current_access_token(&self) -> Result<Option<String>, InfraError>;
}

/// Hands out a fixed token, or nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    token: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn current_access_token(&self) -> Result<Option<String>, InfraError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureTokenResult {
    Existing(OAuthToken),
    Refreshed(OAuthToken),
    ReauthenticationRequired,
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Google sign-in: authorization-code exchange, stored token, refresh.
pub struct SessionManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    config: GoogleOAuthConfig,
    credential_store: Arc<S>,
    oauth_client: Arc<C>,
    now_provider: NowProvider,
}

impl<S, C> SessionManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    pub fn new(config: GoogleOAuthConfig, credential_store: Arc<S>, oauth_client: Arc<C>) -> Self {
        Self {
            config,
            credential_store,
            oauth_client,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
        }
    }

    pub fn build_authorization_url(&self, state: &str) -> Result<String, InfraError> {
        if state.trim().is_empty() {
            return Err(InfraError::OAuth("state must not be empty".to_string()));
        }
        if self.config.scopes.is_empty() {
            return Err(InfraError::OAuth("at least one scope is required".to_string()));
        }

        let mut url = Url::parse(&self.config.authorization_endpoint)
            .map_err(|error| InfraError::OAuth(format!("invalid authorization endpoint: {error}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    pub async fn authenticate_with_code(&self, authorization_code: &str) -> Result<OAuthToken, InfraError> {
        let code = authorization_code.trim();
        if code.is_empty() {
            return Err(InfraError::OAuth("authorization code must not be empty".to_string()));
        }

        let response = self
            .oauth_client
            .request_token(
                &self.config.token_endpoint,
                &self.credentials(),
                TokenGrant::AuthorizationCode {
                    code: code.to_string(),
                    redirect_uri: self.config.redirect_uri.clone(),
                },
            )
            .await?;

        let token = self.token_from_response(response, None);
        self.credential_store.save_token(&token)?;
        Ok(token)
    }

    pub async fn ensure_access_token(&self) -> Result<EnsureTokenResult, InfraError> {
        let Some(stored) = self.credential_store.load_token()? else {
            return Ok(EnsureTokenResult::ReauthenticationRequired);
        };

        if stored.is_valid_at((self.now_provider)(), TOKEN_LEEWAY_SECONDS) {
            return Ok(EnsureTokenResult::Existing(stored));
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            return Ok(EnsureTokenResult::ReauthenticationRequired);
        };

        let refreshed = self
            .oauth_client
            .request_token(
                &self.config.token_endpoint,
                &self.credentials(),
                TokenGrant::RefreshToken { refresh_token },
            )
            .await;

        match refreshed {
            Ok(response) => {
                let token = self.token_from_response(response, stored.refresh_token);
                self.credential_store.save_token(&token)?;
                Ok(EnsureTokenResult::Refreshed(token))
            }
            Err(InfraError::OAuth(message)) => {
                tracing::warn!(%message, "refresh rejected; sign-in required");
                Ok(EnsureTokenResult::ReauthenticationRequired)
            }
            Err(error) => Err(error),
        }
    }

    pub fn sign_out(&self) -> Result<(), InfraError> {
        self.credential_store.delete_token()
    }

    fn token_from_response(
        &self,
        response: OAuthTokenResponse,
        fallback_refresh_token: Option<String>,
    ) -> OAuthToken {
        let expires_at = (self.now_provider)() + Duration::seconds(response.expires_in.max(0));
        OAuthToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(fallback_refresh_token),
            expires_at,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: response.scope,
        }
    }
}

#[async_trait]
impl<S, C> CredentialProvider for SessionManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    async fn current_access_token(&self) -> Result<Option<String>, InfraError> {
        match self.ensure_access_token().await? {
            EnsureTokenResult::Existing(token) | EnsureTokenResult::Refreshed(token) => {
                Ok(Some(token.access_token))
            }
            EnsureTokenResult::ReauthenticationRequired => Ok(None),
        }
    }
}

/// Object-safe face of `SessionManager` for the HTTP layer.
#[async_trait]
pub trait LoginFlow: CredentialProvider {
    fn authorization_url(&self, state: &str) -> Result<String, InfraError>;
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, InfraError>;
    fn forget_session(&self) -> Result<(), InfraError>;
}

#[async_trait]
impl<S, C> LoginFlow for SessionManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    fn authorization_url(&self, state: &str) -> Result<String, InfraError> {
        self.build_authorization_url(state)
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, InfraError> {
        self.authenticate_with_code(code).await
    }

    fn forget_session(&self) -> Result<(), InfraError> {
        self.sign_out()
    }
}
