use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw status and JSON body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Google APIs sometimes report an expired token only in the error
    /// payload, so both the status and `error.code` are checked.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.error_code() == Some(401)
    }

    pub fn error_code(&self) -> Option<u16> {
        self.body
            .get("error")
            .and_then(|error| error.get("code"))
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }

    pub fn error_message(&self) -> Option<String> {
        let error = self.body.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    }

    pub fn has_error_payload(&self) -> bool {
        self.body.get("error").is_some_and(|error| !error.is_null())
    }
}

/// One HTTP exchange carrying a bearer token. Only a missing response is an
/// error here; every status code comes back as an `ApiResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest, access_token: &str)
    -> Result<ApiResponse, ApiError>;
}

pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        access_token: &str,
    ) -> Result<ApiResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .http_client
            .request(method, &request.url)
            .bearer_auth(access_token)
            .query(&request.query);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!("{:?} {} -> {}", request.method, request.url, status);

        Ok(ApiResponse::new(status, parse_body(status, &text)?))
    }
}

/// Error responses may carry non-JSON bodies (proxies, HTML error pages);
/// those are kept as a plain string. A success must be JSON.
fn parse_body(status: u16, text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(e) if (200..300).contains(&status) => Err(ApiError::Decode(e.to_string())),
        Err(_) => Ok(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unauthorized_from_status_or_payload() {
        assert!(ApiResponse::new(401, Value::Null).is_unauthorized());
        assert!(
            ApiResponse::new(200, json!({"error": {"code": 401, "message": "Invalid Credentials"}}))
                .is_unauthorized()
        );
        assert!(!ApiResponse::new(403, json!({"error": {"code": 403}})).is_unauthorized());
    }

    #[test]
    fn test_error_message() {
        let response = ApiResponse::new(
            403,
            json!({"error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota."}}),
        );
        assert_eq!(
            response.error_message().as_deref(),
            Some("The request cannot be completed because you have exceeded your quota.")
        );
        assert!(response.has_error_payload());

        let token_error = ApiResponse::new(400, json!({"error": "invalid_grant"}));
        assert_eq!(token_error.error_message().as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(204, "").unwrap(), Value::Null);
        assert_eq!(parse_body(200, "{\"id\":\"x\"}").unwrap(), json!({"id": "x"}));
        assert_eq!(
            parse_body(502, "<html>Bad Gateway</html>").unwrap(),
            Value::String("<html>Bad Gateway</html>".into())
        );
        assert!(matches!(parse_body(200, "<html>"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("https://example.com/search")
            .query("q", "Song A Artist X")
            .query("maxResults", "1");

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query_value("q"), Some("Song A Artist X"));
        assert_eq!(request.query_value("missing"), None);
    }
}
