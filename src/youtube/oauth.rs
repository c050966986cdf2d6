use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::api::{TokenGrant, TokenRefresher};
use crate::error::ApiError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges a Google refresh token for a new access token.
pub struct GoogleTokenRefresher {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenRefresher {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!("Token refresh responded with {}", status);
        parse_token_response(status, &text)
    }
}

/// A 5xx or a body that is not a token response means the endpoint is
/// unavailable, not that the refresh token was rejected.
fn parse_token_response(status: u16, text: &str) -> Result<TokenGrant, ApiError> {
    if status >= 500 {
        return Err(ApiError::Transport(format!(
            "Token endpoint unavailable ({})",
            status
        )));
    }

    let body: TokenResponse = serde_json::from_str(text).map_err(|e| {
        ApiError::Transport(format!("Unreadable token response ({}): {}", status, e))
    })?;

    grant_from_response(status, body)
}

fn grant_from_response(status: u16, body: TokenResponse) -> Result<TokenGrant, ApiError> {
    match body.access_token {
        Some(access_token) if !access_token.is_empty() => Ok(TokenGrant {
            access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
        }),
        _ => {
            let message = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| "Token response did not contain an access token".to_string());
            Err(ApiError::Remote {
                code: status,
                message,
            })
        }
    }
}
