use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::auth::{Credential, CredentialStore, Platform};
use crate::error::ApiError;

/// Result of exchanging a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// `ApiError::Transport` means the token endpoint was unreachable or
    /// unavailable; any
    /// other error means the refresh token was rejected.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError>;
}

/// Authenticated request executor for one platform.
///
/// A 401 triggers at most one token refresh followed by one retry of the
/// original request.
#[derive(Clone)]
pub struct ApiClient {
    platform: Platform,
    store: CredentialStore,
    transport: Arc<dyn Transport>,
    refresher: Arc<dyn TokenRefresher>,
}

impl ApiClient {
    pub fn new(
        platform: Platform,
        store: CredentialStore,
        transport: Arc<dyn Transport>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            platform,
            store,
            transport,
            refresher,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub async fn call(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut refreshed = false;

        loop {
            let access_token = self.access_token()?;
            let response = self.transport.execute(&request, &access_token).await?;

            if response.is_unauthorized() {
                if refreshed {
                    warn!(
                        "{} rejected a freshly refreshed token for {}",
                        self.platform, request.url
                    );
                    return Err(ApiError::AuthExpired);
                }

                debug!("{} token rejected, attempting refresh", self.platform);
                self.refresh_credential().await?;
                refreshed = true;
                continue;
            }

            if !response.is_success() {
                return Err(remote_error(&response));
            }

            return Ok(response.body);
        }
    }

    fn access_token(&self) -> Result<String, ApiError> {
        self.store
            .get(self.platform)
            .map(|credential| credential.access_token)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::AuthExpired)
    }

    async fn refresh_credential(&self) -> Result<(), ApiError> {
        let current = self.store.get(self.platform);
        let Some(refresh_token) = current.and_then(|credential| credential.refresh_token) else {
            warn!("No {} refresh token available", self.platform);
            self.store.clear(self.platform);
            return Err(ApiError::AuthExpired);
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(grant) => {
                let refresh_token = grant.refresh_token.or(Some(refresh_token));
                self.store.set(
                    self.platform,
                    Credential::from_grant(grant.access_token, refresh_token, grant.expires_in),
                );
                info!("Refreshed {} access token", self.platform);
                Ok(())
            }
            Err(ApiError::Transport(message)) => Err(ApiError::Transport(message)),
            Err(e) => {
                warn!("{} token refresh rejected: {}", self.platform, e);
                self.store.clear(self.platform);
                Err(ApiError::AuthExpired)
            }
        }
    }
}

fn remote_error(response: &ApiResponse) -> ApiError {
    let message = response.error_message().unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string()
    });

    ApiError::Remote {
        code: response.status,
        message,
    }
}
