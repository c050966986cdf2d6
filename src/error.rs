use thiserror::Error;

use crate::auth::Platform;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spotify API error: {0}")]
    SpotifyApi(#[from] rspotify::ClientError),

    #[error("YouTube API error: {0}")]
    YouTubeApi(#[from] ApiError),

    #[error("Not authenticated with {0}")]
    NotAuthenticated(Platform),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single authenticated call against a remote platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication expired, please log in again")]
    AuthExpired,

    #[error("Remote error {code}: {message}")]
    Remote { code: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Auth and transport failures hit every request alike; a conversion
    /// records them against the current track and keeps going.
    pub fn is_systemic(&self) -> bool {
        matches!(self, ApiError::AuthExpired | ApiError::Transport(_))
    }
}

/// Reasons a conversion could not be started at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("A conversion is already running")]
    AlreadyRunning,

    #[error("Not authenticated with {0}")]
    NotAuthenticated(Platform),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systemic_errors() {
        assert!(ApiError::AuthExpired.is_systemic());
        assert!(ApiError::Transport("reset".into()).is_systemic());
        assert!(!ApiError::Decode("bad".into()).is_systemic());
        assert!(
            !ApiError::Remote {
                code: 403,
                message: "quotaExceeded".into()
            }
            .is_systemic()
        );
    }
}
