use std::time::Duration;

use tracing::{info, warn};

use crate::matcher::TrackMatcher;
use crate::spotify::SourceTrack;

pub const PREVIEW_TRACKS: usize = 3;
pub const PREVIEW_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewMatch {
    pub original: String,
    pub found: Option<String>,
}

/// Search the first `limit` tracks without touching any playlist, to check
/// what a conversion would pick. A failed search shows as not found.
pub async fn preview_matches(
    matcher: &TrackMatcher,
    tracks: &[SourceTrack],
    limit: usize,
    delay: Duration,
) -> Vec<PreviewMatch> {
    let mut results = Vec::new();

    for (i, track) in tracks.iter().take(limit).enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("Searching {}: {}", i + 1, track.search_query());
        let found = match matcher.find_match(track).await {
            Ok(candidate) => candidate.map(|c| c.title),
            Err(e) => {
                warn!("Search for '{}' failed: {}", track.search_query(), e);
                None
            }
        };

        results.push(PreviewMatch {
            original: track.display_name(),
            found,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedRefresher, ScriptedTransport};
    use crate::auth::{Credential, CredentialStore, Platform};
    use crate::error::ApiError;
    use crate::youtube::client::tests::youtube_client;
    use crate::youtube::models::fixtures;

    #[tokio::test]
    async fn test_preview_only_searches_first_tracks() {
        let transport = ScriptedTransport::new();
        transport.respond(200, fixtures::search_hit("v1", "One (Official)"));
        transport.respond(200, fixtures::search_empty());
        let store = CredentialStore::in_memory();
        store.set(Platform::YouTube, Credential::new("yt-token"));
        let matcher = TrackMatcher::new(youtube_client(&transport, &ScriptedRefresher::new(), store));

        let tracks = vec![
            SourceTrack::new("One", "A"),
            SourceTrack::new("Two", "B"),
            SourceTrack::new("Three", "C"),
        ];

        let results = preview_matches(&matcher, &tracks, 2, Duration::ZERO).await;

        assert_eq!(
            results,
            vec![
                PreviewMatch {
                    original: "One - A".into(),
                    found: Some("One (Official)".into())
                },
                PreviewMatch {
                    original: "Two - B".into(),
                    found: None
                },
            ]
        );
        assert_eq!(transport.request_count(), 2);
        // Only searches, never playlist writes.
        assert!(transport.requests().iter().all(|r| r.url.ends_with("/search")));
    }

    #[tokio::test]
    async fn test_failed_search_does_not_stop_preview() {
        let transport = ScriptedTransport::new();
        transport.fail(ApiError::Transport("connection reset".into()));
        transport.respond(200, fixtures::search_hit("v2", "Two (Audio)"));
        let store = CredentialStore::in_memory();
        store.set(Platform::YouTube, Credential::new("yt-token"));
        let matcher = TrackMatcher::new(youtube_client(&transport, &ScriptedRefresher::new(), store));

        let tracks = vec![SourceTrack::new("One", "A"), SourceTrack::new("Two", "B")];

        let results = preview_matches(&matcher, &tracks, PREVIEW_TRACKS, Duration::ZERO).await;

        assert_eq!(
            results,
            vec![
                PreviewMatch {
                    original: "One - A".into(),
                    found: None
                },
                PreviewMatch {
                    original: "Two - B".into(),
                    found: Some("Two (Audio)".into())
                },
            ]
        );
    }
}
