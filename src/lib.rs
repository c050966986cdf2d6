pub mod api;
pub mod auth;
pub mod config;
pub mod converter;
pub mod error;
pub mod matcher;
pub mod materializer;
pub mod spotify;
pub mod youtube;

pub use auth::{Credential, CredentialStore, Platform};
pub use config::Config;
pub use converter::{ConversionOrchestrator, ConversionPolicy, ConversionRun};
pub use error::{ApiError, AppError, ConversionError, Result};
pub use matcher::TrackMatcher;
pub use materializer::PlaylistMaterializer;
pub use spotify::{SourcePlaylist, SourceTrack, SpotifyClient};
pub use youtube::{MatchCandidate, YouTubeClient};
