use strsim::jaro_winkler;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::spotify::SourceTrack;
use crate::youtube::{MatchCandidate, YouTubeClient};

/// Below this a match is still used but flagged in the report.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Resolves a source track to the destination's top search hit.
///
/// No ranking happens here: the search endpoint's own relevance order is
/// authoritative and only its first result is requested.
#[derive(Clone)]
pub struct TrackMatcher {
    youtube: YouTubeClient,
}

impl TrackMatcher {
    pub fn new(youtube: YouTubeClient) -> Self {
        Self { youtube }
    }

    /// `Ok(None)` when nothing was found, including when the search endpoint
    /// answered with an error payload. Auth and network failures propagate.
    pub async fn find_match(&self, track: &SourceTrack) -> Result<Option<MatchCandidate>, ApiError> {
        let query = track.search_query();

        match self.youtube.search_video(&query).await {
            Ok(Some(candidate)) => {
                debug!("Matched '{}' to '{}'", query, candidate.title);
                Ok(Some(candidate))
            }
            Ok(None) => {
                debug!("No match for '{}'", query);
                Ok(None)
            }
            Err(ApiError::Remote { code, message }) => {
                warn!("Search for '{}' failed ({}): {}", query, code, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Advisory similarity between the search query and the matched title,
/// 0.0 to 1.0. Never used to pick or reject a candidate.
pub fn title_similarity(query: &str, title: &str) -> f64 {
    jaro_winkler(&query.to_lowercase(), &title.to_lowercase())
}

pub fn is_low_confidence(query: &str, title: &str) -> bool {
    title_similarity(query, title) < LOW_CONFIDENCE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedRefresher, ScriptedTransport};
    use crate::auth::{Credential, CredentialStore, Platform};
    use crate::youtube::client::tests::youtube_client;
    use crate::youtube::models::fixtures;
    use serde_json::json;

    fn matcher_with(transport: &std::sync::Arc<ScriptedTransport>) -> TrackMatcher {
        let store = CredentialStore::in_memory();
        store.set(Platform::YouTube, Credential::new("yt-token"));
        TrackMatcher::new(youtube_client(transport, &ScriptedRefresher::new(), store))
    }

    #[tokio::test]
    async fn test_query_is_title_then_artist() {
        let transport = ScriptedTransport::new();
        transport.respond(200, fixtures::search_hit("v1", "Song A"));
        let matcher = matcher_with(&transport);

        let candidate = matcher
            .find_match(&SourceTrack::new("Song A", "Artist X"))
            .await
            .unwrap();

        assert_eq!(candidate.map(|c| c.video_id).as_deref(), Some("v1"));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].query_value("q"), Some("Song A Artist X"));
    }

    #[tokio::test]
    async fn test_empty_results_are_not_found() {
        let transport = ScriptedTransport::new();
        transport.respond(200, fixtures::search_empty());
        let matcher = matcher_with(&transport);

        let result = matcher.find_match(&SourceTrack::new("Song B", "Artist Y")).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_error_payload_is_not_found() {
        let transport = ScriptedTransport::new();
        transport.respond(403, json!({"error": {"code": 403, "message": "quotaExceeded"}}));
        let matcher = matcher_with(&transport);

        let result = matcher.find_match(&SourceTrack::new("Song B", "Artist Y")).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = ScriptedTransport::new();
        transport.fail(ApiError::Transport("connection reset".into()));
        let matcher = matcher_with(&transport);

        let result = matcher.find_match(&SourceTrack::new("Song B", "Artist Y")).await;
        assert_eq!(result, Err(ApiError::Transport("connection reset".into())));
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let transport = ScriptedTransport::new();
        transport.respond(401, fixtures::unauthorized());
        let matcher = matcher_with(&transport);

        let result = matcher.find_match(&SourceTrack::new("Song B", "Artist Y")).await;
        assert_eq!(result, Err(ApiError::AuthExpired));
    }

    #[test]
    fn test_title_similarity() {
        let close = title_similarity(
            "Bohemian Rhapsody Queen",
            "Bohemian Rhapsody (Remastered 2011)",
        );
        let far = title_similarity("Bohemian Rhapsody Queen", "10 hours of rain sounds");

        assert!(close > far, "{} should be > {}", close, far);
        assert!(is_low_confidence("Bohemian Rhapsody Queen", "zzzz"));
        assert!(!is_low_confidence("Song A Artist X", "Song A Artist X"));
    }
}
