pub mod client;
pub mod models;
pub mod oauth;

pub use client::YouTubeClient;
pub use models::{ChannelInfo, MatchCandidate};
pub use oauth::GoogleTokenRefresher;
