use rspotify::{
    AuthCodeSpotify, ClientError, Token,
    model::{PlayableItem, PlaylistId},
    prelude::*,
};
use tracing::{debug, info};
use url::Url;

use crate::auth::{CredentialStore, Platform};
use crate::error::{AppError, Result};
use crate::spotify::models::{PlaylistSummary, SourcePlaylist, SourceTrack};

const PLAYLIST_PAGE_SIZE: u32 = 50;
const TRACK_PAGE_SIZE: u32 = 100;

/// Read-only Spotify access using the stored source credential. Spotify
/// tokens are never refreshed here; a rejected token surfaces as
/// `AppError::NotAuthenticated`.
pub struct SpotifyClient {
    client: AuthCodeSpotify,
}

impl SpotifyClient {
    pub fn new(store: &CredentialStore) -> Result<Self> {
        let credential = store
            .get(Platform::Spotify)
            .filter(|credential| !credential.access_token.is_empty())
            .ok_or(AppError::NotAuthenticated(Platform::Spotify))?;

        let token = Token {
            access_token: credential.access_token,
            refresh_token: credential.refresh_token,
            expires_at: credential.expires_at,
            ..Default::default()
        };

        Ok(Self {
            client: AuthCodeSpotify::from_token(token),
        })
    }

    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let mut playlists = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .client
                .current_user_playlists_manual(Some(PLAYLIST_PAGE_SIZE), Some(offset))
                .await
                .map_err(classify)?;

            for playlist in page.items {
                playlists.push(PlaylistSummary {
                    id: playlist.id.id().to_string(),
                    name: playlist.name,
                    total_tracks: playlist.tracks.total as usize,
                    owner: playlist
                        .owner
                        .display_name
                        .unwrap_or_else(|| playlist.owner.id.id().to_string()),
                });
            }

            if page.next.is_none() {
                break;
            }
            offset += PLAYLIST_PAGE_SIZE;
        }

        info!("Found {} Spotify playlists", playlists.len());
        Ok(playlists)
    }

    /// Fetch a playlist with its tracks in playlist order.
    pub async fn playlist(&self, playlist_id: &str) -> Result<SourcePlaylist> {
        let id = PlaylistId::from_id(playlist_id)
            .map_err(|e| AppError::Config(format!("Invalid playlist ID: {}", e)))?;

        let playlist = self
            .client
            .playlist(id.clone_static(), None, None)
            .await
            .map_err(classify)?;

        info!(
            "Fetching Spotify playlist: {} ({} tracks)",
            playlist.name, playlist.tracks.total
        );

        let tracks = self.playlist_tracks(&id).await?;

        Ok(SourcePlaylist {
            id: playlist_id.to_string(),
            name: playlist.name,
            description: playlist.description.unwrap_or_default(),
            tracks,
        })
    }

    async fn playlist_tracks(&self, playlist_id: &PlaylistId<'_>) -> Result<Vec<SourceTrack>> {
        let mut tracks = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .client
                .playlist_items_manual(
                    playlist_id.clone_static(),
                    None,
                    None,
                    Some(TRACK_PAGE_SIZE),
                    Some(offset),
                )
                .await
                .map_err(classify)?;

            for item in page.items {
                match item.track {
                    Some(PlayableItem::Track(track)) => {
                        let primary_artist = track
                            .artists
                            .first()
                            .map(|artist| artist.name.clone())
                            .unwrap_or_default();
                        tracks.push(SourceTrack::new(track.name, primary_artist));
                    }
                    Some(_) => debug!("Skipping non-track playlist item"),
                    None => debug!("Skipping unavailable playlist item"),
                }
            }

            if page.next.is_none() {
                break;
            }
            offset += TRACK_PAGE_SIZE;
        }

        info!("Fetched {} tracks from playlist", tracks.len());
        Ok(tracks)
    }
}

/// A 401 from Spotify means the stored token is no longer usable.
fn classify(err: ClientError) -> AppError {
    if let ClientError::Http(http) = &err {
        if let rspotify::http::HttpError::StatusCode(response) = http.as_ref() {
            if response.status().as_u16() == 401 {
                return AppError::NotAuthenticated(Platform::Spotify);
            }
        }
    }
    AppError::SpotifyApi(err)
}

/// Extract a playlist id from a share URL, a `spotify:playlist:` URI or a
/// bare id.
pub fn parse_playlist_id(input: &str) -> Result<String> {
    let input = input.trim();

    if let Some(id) = input.strip_prefix("spotify:playlist:") {
        return non_empty_id(id);
    }

    if !input.contains("://") {
        return non_empty_id(input);
    }

    let url = Url::parse(input).map_err(|e| AppError::Config(format!("Invalid URL: {}", e)))?;

    let path_segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(|| AppError::Config("Invalid Spotify URL".into()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    // Localized links look like /intl-de/playlist/{id}
    match path_segments.iter().position(|segment| *segment == "playlist") {
        Some(index) if index + 1 < path_segments.len() => non_empty_id(path_segments[index + 1]),
        _ => Err(AppError::Config(
            "URL does not appear to be a Spotify playlist URL".into(),
        )),
    }
}

fn non_empty_id(id: &str) -> Result<String> {
    if id.is_empty() || id.contains(char::is_whitespace) {
        return Err(AppError::Config(format!("Invalid playlist ID: '{}'", id)));
    }
    Ok(id.to_string())
}
