pub mod orchestrator;
pub mod preview;
pub mod report;
pub mod run;

pub use orchestrator::{ConversionOrchestrator, ConversionPolicy};
pub use preview::{PreviewMatch, preview_matches};
pub use run::{ConversionEvent, ConversionOutcome, ConversionRun, OutcomeStatus, RunState};
