use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiRequest, ApiResponse, HttpTransport};
use crate::auth::{CredentialStore, Platform};
use crate::config::Config;
use crate::error::ApiError;
use crate::youtube::models::{
    ChannelInfo, ChannelListResponse, CreatedPlaylist, MatchCandidate, SearchResponse,
};
use crate::youtube::oauth::GoogleTokenRefresher;

/// YouTube Data API v3 operations used by a conversion.
#[derive(Clone)]
pub struct YouTubeClient {
    api: ApiClient,
    api_base: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(api: ApiClient, api_base: &str, api_key: Option<String>) -> Self {
        Self {
            api,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config, store: CredentialStore) -> Self {
        let api = ApiClient::new(
            Platform::YouTube,
            store,
            Arc::new(HttpTransport::new()),
            Arc::new(GoogleTokenRefresher::new(
                &config.youtube_client_id,
                &config.youtube_client_secret,
            )),
        );
        Self::new(api, &config.youtube_api_base, config.youtube_api_key.clone())
    }

    pub fn store(&self) -> &CredentialStore {
        self.api.store()
    }

    /// Top video for `query`, or `None` when the search came back empty.
    pub async fn search_video(&self, query: &str) -> Result<Option<MatchCandidate>, ApiError> {
        let mut request = ApiRequest::get(format!("{}/search", self.api_base))
            .query("part", "snippet")
            .query("q", query)
            .query("type", "video")
            .query("maxResults", "1");

        if let Some(key) = &self.api_key {
            request = request.query("key", key.as_str());
        }

        let response: SearchResponse = decode(self.api.call(request).await?)?;

        let candidate = response.items.into_iter().find_map(|item| {
            let video_id = item.id.video_id.filter(|id| !id.is_empty())?;
            let title = item.snippet.map(|s| s.title).unwrap_or_default();
            Some(MatchCandidate { video_id, title })
        });

        debug!("Search '{}' -> {:?}", query, candidate);
        Ok(candidate)
    }

    /// Creates a private playlist and returns its id.
    pub async fn create_playlist(&self, title: &str, description: &str) -> Result<String, ApiError> {
        let body = json!({
            "snippet": {
                "title": title,
                "description": description,
                "defaultLanguage": "en",
            },
            "status": {
                "privacyStatus": "private",
            },
        });

        let request = ApiRequest::post(format!("{}/playlists", self.api_base), body)
            .query("part", "snippet,status");

        let created: CreatedPlaylist = decode(self.api.call(request).await?)?;

        info!("Created YouTube playlist: {} ({})", title, created.id);
        Ok(created.id)
    }

    pub async fn add_video_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                },
            },
        });

        let request = ApiRequest::post(format!("{}/playlistItems", self.api_base), body)
            .query("part", "snippet");

        let response = ApiResponse::new(200, self.api.call(request).await?);
        if response.has_error_payload() {
            return Err(ApiError::Remote {
                code: response.error_code().unwrap_or(response.status),
                message: response
                    .error_message()
                    .unwrap_or_else(|| "Failed to add video to playlist".to_string()),
            });
        }

        debug!("Added video {} to playlist {}", video_id, playlist_id);
        Ok(())
    }

    /// Verifies the stored token by fetching the user's own channel.
    pub async fn check_token(&self) -> Result<ChannelInfo, ApiError> {
        let request = ApiRequest::get(format!("{}/channels", self.api_base))
            .query("part", "snippet")
            .query("mine", "true");

        let response: ChannelListResponse = decode(self.api.call(request).await?)?;

        response
            .items
            .into_iter()
            .next()
            .map(|item| ChannelInfo {
                title: item.snippet.map(|s| s.title).unwrap_or_else(|| item.id.clone()),
                id: item.id,
            })
            .ok_or_else(|| ApiError::Remote {
                code: 404,
                message: "No YouTube channel found for this account".into(),
            })
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}
