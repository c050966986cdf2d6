use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub title: String,
    pub primary_artist: String,
}

impl SourceTrack {
    pub fn new(title: impl Into<String>, primary_artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            primary_artist: primary_artist.into(),
        }
    }

    /// Title and primary artist joined by a single space, untouched
    /// otherwise.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.primary_artist)
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.primary_artist)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePlaylist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tracks: Vec<SourceTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub total_tracks: usize,
    pub owner: String,
}
