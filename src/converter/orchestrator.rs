use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::{CredentialStore, Platform};
use crate::converter::run::{
    ConversionEvent, ConversionOutcome, ConversionRun, RunState, progress_percent,
};
use crate::error::{ApiError, ConversionError};
use crate::matcher::TrackMatcher;
use crate::materializer::PlaylistMaterializer;
use crate::spotify::{SourcePlaylist, SourceTrack};
use crate::youtube::YouTubeClient;

const EVENT_CAPACITY: usize = 256;

/// Pacing and failure limits for a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPolicy {
    /// Pause between tracks, to stay under destination rate limits.
    pub track_delay: Duration,
    /// Abort after this many back-to-back auth/network failures.
    pub max_consecutive_failures: Option<usize>,
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self {
            track_delay: Duration::from_millis(500),
            max_consecutive_failures: None,
        }
    }
}

enum TrackStep {
    Recorded(ConversionOutcome),
    SystemicFailure(ConversionOutcome),
    Fatal(ApiError),
}

/// Drives a conversion: create the destination playlist, then match and
/// append every source track strictly in order, one at a time.
pub struct ConversionOrchestrator {
    matcher: TrackMatcher,
    materializer: PlaylistMaterializer,
    store: CredentialStore,
    policy: ConversionPolicy,
    run: Mutex<ConversionRun>,
    events: broadcast::Sender<ConversionEvent>,
}

impl ConversionOrchestrator {
    pub fn new(youtube: YouTubeClient, policy: ConversionPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: youtube.store().clone(),
            matcher: TrackMatcher::new(youtube.clone()),
            materializer: PlaylistMaterializer::new(youtube),
            policy,
            run: Mutex::new(ConversionRun::idle()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ConversionRun {
        self.with_run(|run| run.clone())
    }

    /// Run a conversion to completion. `Err` only when the run could not
    /// start; a run that started and failed comes back as `Ok` with
    /// `RunState::Aborted`.
    pub async fn convert(
        &self,
        playlist: &SourcePlaylist,
        cancel: &CancellationToken,
    ) -> Result<ConversionRun, ConversionError> {
        if !self.store.is_authenticated(Platform::YouTube) {
            return Err(ConversionError::NotAuthenticated(Platform::YouTube));
        }

        self.begin(&playlist.name, playlist.tracks.len())?;
        let _guard = RunGuard { orchestrator: self };

        Ok(self.execute(playlist, cancel).await)
    }

    fn begin(&self, source_name: &str, total_tracks: usize) -> Result<(), ConversionError> {
        self.with_run(|run| {
            if run.is_running() {
                return Err(ConversionError::AlreadyRunning);
            }
            *run = ConversionRun::started(source_name, total_tracks);
            Ok(())
        })?;

        info!(
            "Starting conversion of '{}' ({} tracks)",
            source_name, total_tracks
        );
        self.emit(ConversionEvent::Started {
            source_name: source_name.to_string(),
            total_tracks,
        });
        Ok(())
    }

    async fn execute(&self, playlist: &SourcePlaylist, cancel: &CancellationToken) -> ConversionRun {
        let title = format!("{} (converted)", playlist.name);
        let description = format!("Converted from Spotify playlist: {}", playlist.name);

        let playlist_id = match self.materializer.create_playlist(&title, &description).await {
            Ok(id) => id,
            Err(e) => return self.abort(format!("Failed to create playlist: {}", e)),
        };

        self.with_run(|run| run.destination_playlist_id = Some(playlist_id.clone()));
        self.emit(ConversionEvent::PlaylistCreated {
            playlist_id: playlist_id.clone(),
        });

        let total = playlist.tracks.len();
        let mut consecutive_failures = 0;

        for (index, track) in playlist.tracks.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.abort("Conversion cancelled".to_string());
            }

            info!("Converting {}/{}: {}", index + 1, total, track.search_query());

            let outcome = match self.convert_track(&playlist_id, track).await {
                TrackStep::Recorded(outcome) => {
                    consecutive_failures = 0;
                    outcome
                }
                TrackStep::SystemicFailure(outcome) => {
                    consecutive_failures += 1;
                    outcome
                }
                TrackStep::Fatal(e) => {
                    return self.abort(format!(
                        "Unexpected failure on track {}: {}",
                        index + 1,
                        e
                    ));
                }
            };

            self.record(index, outcome);

            if index + 1 == total {
                break;
            }

            if let Some(limit) = self.policy.max_consecutive_failures {
                if consecutive_failures >= limit {
                    return self.abort(format!(
                        "Stopped after {} consecutive failed tracks",
                        consecutive_failures
                    ));
                }
            }

            if !self.policy.track_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.track_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        self.complete()
    }

    async fn convert_track(&self, playlist_id: &str, track: &SourceTrack) -> TrackStep {
        let query = track.search_query();

        let candidate = match self.matcher.find_match(track).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return TrackStep::Recorded(ConversionOutcome::not_found(query)),
            Err(e) if e.is_systemic() => {
                warn!("Track '{}' failed: {}", query, e);
                return TrackStep::SystemicFailure(ConversionOutcome::error(
                    query,
                    e.to_string(),
                    None,
                ));
            }
            Err(e) => return TrackStep::Fatal(e),
        };

        match self
            .materializer
            .append_item(playlist_id, &candidate.video_id)
            .await
        {
            Ok(()) => TrackStep::Recorded(ConversionOutcome::success(
                query,
                candidate.title,
                candidate.video_id,
            )),
            Err(e) => {
                warn!("Failed to add '{}' to playlist: {}", candidate.title, e);
                let systemic = e.is_systemic();
                let outcome = ConversionOutcome::error(query, e.to_string(), Some(candidate.title));
                if systemic {
                    TrackStep::SystemicFailure(outcome)
                } else {
                    TrackStep::Recorded(outcome)
                }
            }
        }
    }

    fn record(&self, index: usize, outcome: ConversionOutcome) {
        let progress = self.with_run(|run| {
            run.outcomes.push(outcome.clone());
            run.progress_percent = progress_percent(run.outcomes.len(), run.total_tracks);
            run.progress_percent
        });

        self.emit(ConversionEvent::TrackFinished {
            index,
            outcome,
            progress_percent: progress,
        });
    }

    fn complete(&self) -> ConversionRun {
        let run = self.with_run(|run| {
            run.state = RunState::Completed;
            run.progress_percent = progress_percent(run.outcomes.len(), run.total_tracks);
            run.clone()
        });

        info!(
            "Conversion of '{}' completed: {} outcomes recorded",
            run.source_name,
            run.outcomes.len()
        );
        self.emit(ConversionEvent::Completed);
        run
    }

    fn abort(&self, error: String) -> ConversionRun {
        warn!("Conversion aborted: {}", error);
        let run = self.with_run(|run| {
            run.state = RunState::Aborted;
            run.terminal_error = Some(error.clone());
            run.clone()
        });
        self.emit(ConversionEvent::Aborted { error });
        run
    }

    fn with_run<R>(&self, f: impl FnOnce(&mut ConversionRun) -> R) -> R {
        let mut run = self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut run)
    }

    fn emit(&self, event: ConversionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Aborts the run if the `convert` future is dropped mid-flight, so a later
/// start is not rejected forever. A finished run is left alone.
struct RunGuard<'a> {
    orchestrator: &'a ConversionOrchestrator,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.orchestrator.snapshot().is_running() {
            self.orchestrator
                .abort("Conversion interrupted".to_string());
        }
    }
}
