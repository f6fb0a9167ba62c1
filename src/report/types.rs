use crate::runner::state::{PhaseStateReport, RunReport, RunSummary};
use serde::{Deserialize, Serialize};

/// Check results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResults {
    pub run_id: String,
    pub base_url: String,
    pub phases: Vec<PhaseStateReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}

impl CheckResults {
    pub fn from_report(report: RunReport) -> Self {
        Self {
            run_id: report.run_id,
            base_url: report.base_url,
            phases: report.phases,
            summary: report.summary,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
