use chrono::Local;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::converter::run::{ConversionRun, OutcomeStatus, RunState};
use crate::error::Result;
use crate::matcher::is_low_confidence;

pub const RESULTS_DIR: &str = "conversion_results";

/// Aggregate counts over a run's outcome ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_tracks: usize,
    pub processed: usize,
    pub successful: usize,
    pub not_found: usize,
    pub errors: usize,
    pub success_rate: f64,
    /// (source query, matched title) pairs worth double-checking by hand.
    pub low_confidence: Vec<(String, String)>,
}

impl RunSummary {
    pub fn from_run(run: &ConversionRun) -> Self {
        let successful = run.count(OutcomeStatus::Success);
        let success_rate = if run.total_tracks > 0 {
            (successful as f64 / run.total_tracks as f64) * 100.0
        } else {
            0.0
        };

        let low_confidence = run
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .filter_map(|o| {
                let title = o.destination_title.as_ref()?;
                is_low_confidence(&o.source_query, title)
                    .then(|| (o.source_query.clone(), title.clone()))
            })
            .collect();

        Self {
            total_tracks: run.total_tracks,
            processed: run.outcomes.len(),
            successful,
            not_found: run.count(OutcomeStatus::NotFound),
            errors: run.count(OutcomeStatus::Error),
            success_rate,
            low_confidence,
        }
    }
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!(
        "https://www.youtube.com/playlist?list={}",
        urlencoding::encode(playlist_id)
    )
}

/// Write the run as pretty JSON into `dir`, returning the file path.
pub fn save_run(run: &ConversionRun, dir: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    fs::create_dir_all(dir)?;

    let filename = dir.join(format!("conversion_{}.json", timestamp));
    let json = serde_json::to_string_pretty(run)?;

    fs::write(&filename, json)?;

    info!("Conversion results saved to: {}", filename.display());

    Ok(filename)
}

pub fn print_summary(run: &ConversionRun) {
    let summary = RunSummary::from_run(run);

    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "CONVERSION SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!("Playlist: {}", run.source_name);
    println!(
        "Tracks processed: {}/{}",
        summary.processed, summary.total_tracks
    );
    println!("Added: {}", summary.successful.to_string().green());
    println!("Not found: {}", summary.not_found.to_string().yellow());
    println!("Errors: {}", summary.errors.to_string().red());
    println!("Success rate: {:.1}%", summary.success_rate);
    println!("{}", "=".repeat(60));

    for (i, outcome) in run.outcomes.iter().enumerate() {
        let status = match outcome.status {
            OutcomeStatus::Success => outcome.status.to_string().green(),
            OutcomeStatus::NotFound => outcome.status.to_string().yellow(),
            OutcomeStatus::Error => outcome.status.to_string().red(),
        };
        println!("{:3}. {} [{}]", i + 1, outcome.source_query, status);
        if let Some(title) = &outcome.destination_title {
            println!("       YouTube match: {}", title.cyan());
        }
        if outcome.status == OutcomeStatus::Error {
            if let Some(message) = &outcome.error_message {
                println!("       {}", message.red());
            }
        }
    }

    if !summary.low_confidence.is_empty() {
        println!("\n{}", "Matches worth double-checking:".yellow());
        for (query, title) in &summary.low_confidence {
            println!("   - {} -> {}", query, title);
        }
    }

    match run.state {
        RunState::Completed => {
            if let Some(id) = &run.destination_playlist_id {
                println!("\n{} {}", "Playlist:".green(), playlist_url(id));
            }
        }
        RunState::Aborted => {
            let error = run.terminal_error.as_deref().unwrap_or("unknown error");
            println!("\n{} {}", "Conversion aborted:".red().bold(), error);
            if let Some(id) = &run.destination_playlist_id {
                println!("Partial playlist: {}", playlist_url(id));
            }
        }
        RunState::Idle | RunState::Running => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::run::ConversionOutcome;

    fn finished_run() -> ConversionRun {
        let mut run = ConversionRun::started("Road Trip", 4);
        run.outcomes = vec![
            ConversionOutcome::success(
                "Song A Artist X".into(),
                "Song A - Artist X (Official Video)".into(),
                "v1".into(),
            ),
            ConversionOutcome::success(
                "Song C Artist Z".into(),
                "xkcd 927".into(),
                "v3".into(),
            ),
            ConversionOutcome::not_found("Song B Artist Y".into()),
            ConversionOutcome::error(
                "Song D Artist W".into(),
                "Remote error 403: quotaExceeded".into(),
                None,
            ),
        ];
        run.state = RunState::Completed;
        run.progress_percent = 100;
        run.destination_playlist_id = Some("PL1".into());
        run
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_run(&finished_run());

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.errors, 1);
        assert!((summary.success_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(
            summary.low_confidence,
            vec![(
                "Song C Artist Z".to_string(),
                "xkcd 927".to_string()
            )]
        );
    }

    #[test]
    fn test_playlist_url() {
        assert_eq!(
            playlist_url("PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf"),
            "https://www.youtube.com/playlist?list=PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf"
        );
    }

    #[test]
    fn test_save_run_writes_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let run = finished_run();

        let path = save_run(&run, &dir.path().join(RESULTS_DIR)).unwrap();

        let saved: ConversionRun =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved, run);
    }
}
