use crate::error::ApiError;
use crate::youtube::YouTubeClient;

/// Creates the destination playlist and fills it one item at a time.
#[derive(Clone)]
pub struct PlaylistMaterializer {
    youtube: YouTubeClient,
}

impl PlaylistMaterializer {
    pub fn new(youtube: YouTubeClient) -> Self {
        Self { youtube }
    }

    pub async fn create_playlist(&self, title: &str, description: &str) -> Result<String, ApiError> {
        self.youtube.create_playlist(title, description).await
    }

    pub async fn append_item(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError> {
        self.youtube.add_video_to_playlist(playlist_id, video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedRefresher, ScriptedTransport};
    use crate::auth::{Credential, CredentialStore, Platform};
    use crate::youtube::client::tests::youtube_client;
    use crate::youtube::models::fixtures;
    use serde_json::json;

    fn materializer_with(transport: &std::sync::Arc<ScriptedTransport>) -> PlaylistMaterializer {
        let store = CredentialStore::in_memory();
        store.set(Platform::YouTube, Credential::new("yt-token"));
        PlaylistMaterializer::new(youtube_client(transport, &ScriptedRefresher::new(), store))
    }

    #[tokio::test]
    async fn test_create_then_append() {
        let transport = ScriptedTransport::new();
        transport.respond(200, fixtures::playlist_created("PL9"));
        transport.respond(200, fixtures::item_added("v7"));
        let materializer = materializer_with(&transport);

        let playlist_id = materializer.create_playlist("Mix (converted)", "").await.unwrap();
        materializer.append_item(&playlist_id, "v7").await.unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(
            transport.requests()[1].body.as_ref().unwrap()["snippet"]["playlistId"],
            "PL9"
        );
    }

    #[tokio::test]
    async fn test_append_failure_is_structured() {
        let transport = ScriptedTransport::new();
        transport.respond(
            404,
            json!({"error": {"code": 404, "message": "Video not found."}}),
        );
        let materializer = materializer_with(&transport);

        let err = materializer.append_item("PL9", "gone").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Remote {
                code: 404,
                message: "Video not found.".into()
            }
        );
    }
}
