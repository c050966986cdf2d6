use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    NotFound,
    Error,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "Added"),
            OutcomeStatus::NotFound => write!(f, "Not found"),
            OutcomeStatus::Error => write!(f, "Error"),
        }
    }
}

/// Result for one source track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub source_query: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConversionOutcome {
    pub fn success(source_query: String, title: String, item_id: String) -> Self {
        Self {
            source_query,
            status: OutcomeStatus::Success,
            destination_title: Some(title),
            destination_item_id: Some(item_id),
            error_message: None,
        }
    }

    pub fn not_found(source_query: String) -> Self {
        Self {
            source_query,
            status: OutcomeStatus::NotFound,
            destination_title: None,
            destination_item_id: None,
            error_message: Some("No matching video found".to_string()),
        }
    }

    /// `destination_title` is kept when the match was found but could not be
    /// inserted.
    pub fn error(source_query: String, message: String, destination_title: Option<String>) -> Self {
        Self {
            source_query,
            status: OutcomeStatus::Error,
            destination_title,
            destination_item_id: None,
            error_message: Some(message),
        }
    }
}

/// State of one conversion. Only the orchestrator mutates it, and it is
/// frozen once the state leaves `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRun {
    pub source_name: String,
    pub state: RunState,
    pub total_tracks: usize,
    pub progress_percent: u8,
    pub outcomes: Vec<ConversionOutcome>,
    pub destination_playlist_id: Option<String>,
    pub terminal_error: Option<String>,
}

impl ConversionRun {
    pub fn idle() -> Self {
        Self {
            source_name: String::new(),
            state: RunState::Idle,
            total_tracks: 0,
            progress_percent: 0,
            outcomes: Vec::new(),
            destination_playlist_id: None,
            terminal_error: None,
        }
    }

    pub fn started(source_name: &str, total_tracks: usize) -> Self {
        Self {
            source_name: source_name.to_string(),
            state: RunState::Running,
            total_tracks,
            ..Self::idle()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl Default for ConversionRun {
    fn default() -> Self {
        Self::idle()
    }
}

/// `round(100 * done / total)`, halves rounded up. An empty playlist counts
/// as fully done.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total);
    ((200 * done + total) / (2 * total)) as u8
}

/// Progress notifications published while a run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    Started {
        source_name: String,
        total_tracks: usize,
    },
    PlaylistCreated {
        playlist_id: String,
    },
    TrackFinished {
        index: usize,
        outcome: ConversionOutcome,
        progress_percent: u8,
    },
    Completed,
    Aborted {
        error: String,
    },
}
