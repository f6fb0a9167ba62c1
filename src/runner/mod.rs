pub mod capture;
pub mod classifier;
pub mod events;
pub mod executor;
pub mod scenario;
pub mod session;
pub mod state;

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub use classifier::{classify, Classification, Verdict};
pub use events::*;
pub use executor::{ScenarioRunner, SessionSet};
pub use state::*;

use crate::utils::config::Config;

/// Run the whole check scenario against the configured API.
///
/// The transcript is printed as the run goes; with `report` set, JSON and
/// JUnit files are written to `output` afterwards.
pub async fn run_checks(config: Config, output: &Path, report: bool) -> Result<RunSummary> {
    let sessions = SessionSet::connect(config.timeout())?;
    let phases = scenario::build_scenario(&config);

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let runner = ScenarioRunner::new(config, sessions, emitter);
    let run = runner.run(&phases).await;

    // runner (and its emitter) is gone, so the listener drains and stops
    listener.await.context("Console reporter task failed")?;

    let summary = run.summary();

    if report {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output dir: {}", output.display()))?;
        let results = crate::report::types::CheckResults::from_report(run.to_report());
        crate::report::write_reports(&results, output)?;
        println!(
            "\n{} Reports saved to: {}",
            "📄".to_string().blue(),
            output.display().to_string().cyan()
        );
    }

    Ok(summary)
}
