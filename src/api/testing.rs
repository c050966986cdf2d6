//! In-memory stand-ins for the HTTP transport and token endpoint.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::client::{TokenGrant, TokenRefresher};
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::ApiError;

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    requests: Mutex<Vec<(ApiRequest, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.push(Ok(ApiResponse::new(status, body)));
    }

    pub fn fail(&self, error: ApiError) {
        self.push(Err(error));
    }

    fn push(&self, response: Result<ApiResponse, ApiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        access_token: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), access_token.to_string()));

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url))
    }
}

/// Token endpoint double. Without a queued outcome it rejects the refresh.
#[derive(Default)]
pub struct ScriptedRefresher {
    outcomes: Mutex<VecDeque<Result<TokenGrant, ApiError>>>,
    refresh_tokens: Mutex<Vec<String>>,
}

impl ScriptedRefresher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn grant(&self, access_token: &str, refresh_token: Option<&str>) {
        self.outcomes.lock().unwrap().push_back(Ok(TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_in: Some(3600),
        }));
    }

    pub fn fail(&self, error: ApiError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.refresh_tokens.lock().unwrap().len()
    }

    pub fn refresh_tokens(&self) -> Vec<String> {
        self.refresh_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        self.refresh_tokens
            .lock()
            .unwrap()
            .push(refresh_token.to_string());

        self.outcomes.lock().unwrap().pop_front().unwrap_or(Err(ApiError::Remote {
            code: 400,
            message: "invalid_grant".into(),
        }))
    }
}
