use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Spotify is always the side playlists are read from, YouTube the side they
/// are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    #[value(name = "youtube")]
    YouTube,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Spotify => write!(f, "Spotify"),
            Platform::YouTube => write!(f, "YouTube"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Build a credential from a token grant, turning `expires_in` seconds
    /// into an absolute expiry.
    pub fn from_grant(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<u64>,
    ) -> Self {
        let expires_at = expires_in_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Informational only; the remote platform is the authority on validity.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Emitted whenever a platform's credential is stored or cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub platform: Platform,
    pub authenticated: bool,
}
