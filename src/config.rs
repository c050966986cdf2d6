use std::path::PathBuf;
use std::time::Duration;

use crate::converter::ConversionPolicy;
use crate::error::{AppError, Result};

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_CREDENTIALS_PATH: &str = ".spotify2youtube/credentials.json";
const DEFAULT_TRACK_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_client_id: String,
    pub youtube_client_secret: String,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub credentials_path: PathBuf,
    pub track_delay: Duration,
    pub max_consecutive_failures: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let youtube_client_id = lookup("YOUTUBE_CLIENT_ID").unwrap_or_default();
        let youtube_client_secret = lookup("YOUTUBE_CLIENT_SECRET").unwrap_or_default();

        let youtube_api_key = lookup("YOUTUBE_API_KEY").filter(|key| !key.is_empty());

        let youtube_api_base = lookup("YOUTUBE_API_BASE")
            .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string());

        let credentials_path = lookup("CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH));

        let track_delay_ms = match lookup("CONVERSION_TRACK_DELAY_MS") {
            Some(raw) => parse_number("CONVERSION_TRACK_DELAY_MS", &raw)?,
            None => DEFAULT_TRACK_DELAY_MS,
        };

        let max_consecutive_failures = lookup("CONVERSION_MAX_CONSECUTIVE_FAILURES")
            .map(|raw| parse_number("CONVERSION_MAX_CONSECUTIVE_FAILURES", &raw))
            .transpose()?
            .map(|n| n as usize)
            .filter(|n| *n > 0);

        Ok(Self {
            youtube_client_id,
            youtube_client_secret,
            youtube_api_key,
            youtube_api_base,
            credentials_path,
            track_delay: Duration::from_millis(track_delay_ms),
            max_consecutive_failures,
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.youtube_client_id.is_empty() {
            missing.push("YOUTUBE_CLIENT_ID".to_string());
        }
        if self.youtube_client_secret.is_empty() {
            missing.push("YOUTUBE_CLIENT_SECRET".to_string());
        }

        missing
    }

    pub fn conversion_policy(&self) -> ConversionPolicy {
        ConversionPolicy {
            track_delay: self.track_delay,
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw)))
}
