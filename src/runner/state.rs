use super::classifier::{Classification, Verdict};
use crate::http::Role;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Ok { status: u16 },
    Fail {
        status: u16,
        body: String,
        message: String,
    },
    Error { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            StepStatus::Ok { .. } => Some(Verdict::Ok),
            StepStatus::Fail { .. } => Some(Verdict::Fail),
            StepStatus::Error { .. } => Some(Verdict::Error),
            _ => None,
        }
    }

    pub fn from_classification(c: &Classification) -> Self {
        match (c.verdict, c.status) {
            (Verdict::Ok, Some(status)) => StepStatus::Ok { status },
            (Verdict::Fail, Some(status)) => StepStatus::Fail {
                status,
                body: c.body_preview.clone().unwrap_or_default(),
                message: c.diagnostic.clone(),
            },
            _ => StepStatus::Error {
                error: c.diagnostic.clone(),
            },
        }
    }
}

/// State for a single step
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub name: String,
    pub method: String,
    pub url: Option<String>,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn new(index: usize, name: &str, method: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            method: method.to_string(),
            url: None,
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    /// Record the classified outcome; only the first terminal status sticks
    pub fn record(&mut self, status: StepStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn skip(&mut self, reason: &str) {
        self.record(StepStatus::Skipped {
            reason: reason.to_string(),
        });
    }

    pub fn to_report(&self) -> StepStateReport {
        StepStateReport {
            index: self.index,
            name: self.name.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStateReport {
    pub index: usize,
    pub name: String,
    pub method: String,
    pub url: Option<String>,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
}

/// Authentication progress of a phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthState {
    /// Anonymous phase
    NotRequired,
    NotStarted,
    Authenticating,
    Authenticated,
    AuthFailed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PhaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
    PartiallyPassed { passed: u32, failed: u32 },
    /// Nothing ran
    Skipped,
}

/// Counts per terminal status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounts {
    pub ok: u32,
    pub failed: u32,
    pub errored: u32,
    pub skipped: u32,
}

impl StepCounts {
    fn tally<'a>(statuses: impl Iterator<Item = &'a StepStatus>) -> Self {
        statuses.fold(Self::default(), |mut c, s| {
            match s {
                StepStatus::Ok { .. } => c.ok += 1,
                StepStatus::Fail { .. } => c.failed += 1,
                StepStatus::Error { .. } => c.errored += 1,
                StepStatus::Skipped { .. } => c.skipped += 1,
                _ => {}
            }
            c
        })
    }
}

/// State for one phase of the scenario
#[derive(Debug, Clone)]
pub struct PhaseState {
    pub name: String,
    pub role: Role,
    pub auth: AuthState,
    pub status: PhaseStatus,
    pub steps: Vec<StepState>,
    pub started_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
}

impl PhaseState {
    pub fn new(name: &str, role: Role, steps: Vec<StepState>) -> Self {
        Self {
            name: name.to_string(),
            role,
            auth: if role.requires_auth() {
                AuthState::NotStarted
            } else {
                AuthState::NotRequired
            },
            status: PhaseStatus::Pending,
            steps,
            started_at: None,
            total_duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = PhaseStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn begin_auth(&mut self) {
        self.auth = AuthState::Authenticating;
    }

    pub fn auth_succeeded(&mut self) {
        self.auth = AuthState::Authenticated;
    }

    pub fn auth_failed(&mut self, reason: &str) {
        self.auth = AuthState::AuthFailed {
            reason: reason.to_string(),
        };
    }

    pub fn step(&mut self, index: usize) -> Option<&mut StepState> {
        self.steps.get_mut(index)
    }

    pub fn counts(&self) -> StepCounts {
        StepCounts::tally(self.steps.iter().map(|s| &s.status))
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }

        let counts = self.counts();
        let passed = counts.ok;
        let failed = counts.failed + counts.errored;

        self.status = if passed == 0 && failed == 0 {
            PhaseStatus::Skipped
        } else if failed == 0 {
            PhaseStatus::Passed
        } else if passed == 0 {
            PhaseStatus::Failed
        } else {
            PhaseStatus::PartiallyPassed { passed, failed }
        };
    }

    pub fn to_report(&self) -> PhaseStateReport {
        PhaseStateReport {
            name: self.name.clone(),
            role: self.role,
            auth: self.auth.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(|s| s.to_report()).collect(),
            total_duration_ms: self.total_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStateReport {
    pub name: String,
    pub role: Role,
    pub auth: AuthState,
    pub status: PhaseStatus,
    pub steps: Vec<StepStateReport>,
    pub total_duration_ms: Option<u64>,
}

/// Whole-run state
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: String,
    pub base_url: String,
    pub phases: Vec<PhaseState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunState {
    pub fn new(run_id: &str, base_url: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            base_url: base_url.to_string(),
            phases: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_phase(&mut self, phase: PhaseState) {
        self.phases.push(phase);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    /// Verdicts in execution order; skipped steps are left out
    pub fn verdicts(&self) -> Vec<(String, Verdict)> {
        self.phases
            .iter()
            .flat_map(|p| p.steps.iter())
            .filter_map(|s| s.status.verdict().map(|v| (s.name.clone(), v)))
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let counts = StepCounts::tally(
            self.phases
                .iter()
                .flat_map(|p| p.steps.iter())
                .map(|s| &s.status),
        );

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            run_id: self.run_id.clone(),
            total_phases: self.phases.len() as u32,
            total_steps: self.phases.iter().map(|p| p.steps.len() as u32).sum(),
            ok: counts.ok,
            failed: counts.failed,
            errored: counts.errored,
            skipped: counts.skipped,
            total_duration_ms,
        }
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            base_url: self.base_url.clone(),
            phases: self.phases.iter().map(|p| p.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub total_phases: u32,
    pub total_steps: u32,
    pub ok: u32,
    pub failed: u32,
    pub errored: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}

impl RunSummary {
    /// Any FAIL or ERROR verdict; skips do not count
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errored > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub base_url: String,
    pub phases: Vec<PhaseStateReport>,
    pub summary: RunSummary,
}
