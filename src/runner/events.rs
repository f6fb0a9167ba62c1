use super::classifier::Verdict;
use super::state::{PhaseStatus, RunSummary};
use crate::http::Role;
use tokio::sync::broadcast;

/// Check run events, emitted in execution order
#[derive(Debug, Clone)]
pub enum CheckEvent {
    // Run events
    RunStarted {
        run_id: String,
        base_url: String,
    },
    RunFinished {
        summary: RunSummary,
    },

    // Phase events
    PhaseStarted {
        phase: String,
        role: Role,
        step_count: usize,
    },
    PhaseFinished {
        phase: String,
        status: PhaseStatus,
        duration_ms: Option<u64>,
    },
    AuthFailed {
        phase: String,
        role: Role,
        reason: String,
    },

    // Step events
    StepStarted {
        phase: String,
        index: usize,
        name: String,
    },
    StepFinished {
        phase: String,
        index: usize,
        name: String,
        verdict: Verdict,
        diagnostic: String,
        duration_ms: u64,
    },
    StepSkipped {
        phase: String,
        index: usize,
        name: String,
        reason: String,
    },

    // Side notes that are not a verdict (e.g. an unreadable list body)
    Log {
        message: String,
    },
}

/// Large enough to hold a whole run, so a slow listener never lags
const CHANNEL_CAPACITY: usize = 256;

/// Event emitter for broadcasting check events
pub struct EventEmitter {
    sender: broadcast::Sender<CheckEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<CheckEvent>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: CheckEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener printing the run transcript
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<CheckEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let tty = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Console reporter missed {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                CheckEvent::RunStarted { run_id, base_url } => {
                    println!(
                        "\n{} Check run {} against {}",
                        "▶".green().bold(),
                        run_id.dimmed(),
                        base_url.cyan()
                    );
                }

                CheckEvent::RunFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{}", "=== DONE ===".blue().bold());
                    println!("  Total steps: {}", summary.total_steps);
                    println!(
                        "  {} ok, {} failed, {} errors, {} skipped",
                        summary.ok.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.errored.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                CheckEvent::PhaseStarted {
                    phase,
                    role,
                    step_count,
                } => {
                    println!(
                        "\n{} {}",
                        format!("=== {} ===", phase).white().bold(),
                        format!("({}, {} steps)", role, step_count).dimmed()
                    );
                }

                CheckEvent::PhaseFinished {
                    status,
                    duration_ms,
                    ..
                } => {
                    let status_str = match status {
                        PhaseStatus::Passed => "PASSED".green().bold(),
                        PhaseStatus::Failed => "FAILED".red().bold(),
                        PhaseStatus::PartiallyPassed { passed, failed } => {
                            format!("PARTIAL ({}/{} ok)", passed, passed + failed)
                                .yellow()
                                .bold()
                        }
                        PhaseStatus::Skipped => "SKIPPED".yellow().bold(),
                        _ => "UNKNOWN".white().bold(),
                    };
                    match duration_ms {
                        Some(ms) => println!("  {} [{}] {}ms", "←".blue(), status_str, ms),
                        None => println!("  {} [{}]", "←".blue(), status_str),
                    }
                }

                CheckEvent::AuthFailed { role, reason, .. } => {
                    println!(
                        "{} Cannot log in as {}, skipping its checks: {}",
                        "[ABORT]".red().bold(),
                        role,
                        reason
                    );
                }

                CheckEvent::StepStarted { index, name, .. } => {
                    if !tty {
                        continue;
                    }
                    let pb = ProgressBar::new_spinner();
                    pb.set_draw_target(ProgressDrawTarget::stdout());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("  {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!("[{}] {}...", index, name.dimmed()));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                CheckEvent::StepFinished {
                    name,
                    verdict,
                    diagnostic,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let tag = match verdict {
                        Verdict::Ok => "[OK]  ".green().bold(),
                        Verdict::Fail => "[FAIL]".red().bold(),
                        Verdict::Error => "[ERR] ".red().bold(),
                    };
                    println!(
                        "{} {} {} {}",
                        tag,
                        name,
                        diagnostic,
                        format!("({}ms)", duration_ms).dimmed()
                    );
                }

                CheckEvent::StepSkipped { name, reason, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("{} {} ({})", "[SKIP]".yellow(), name, reason.dimmed());
                }

                CheckEvent::Log { message } => {
                    println!("{} {}", "[WARN]".yellow(), message);
                }
            }
        }
    }
}
