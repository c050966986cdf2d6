pub mod client;
pub mod models;

pub use client::{SpotifyClient, parse_playlist_id};
pub use models::{PlaylistSummary, SourcePlaylist, SourceTrack};
