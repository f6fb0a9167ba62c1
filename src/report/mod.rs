pub mod json;
pub mod junit;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

/// Generate report from saved check results
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let results = std::fs::read_to_string(results_path)
        .with_context(|| format!("Failed to read results: {}", results_path.display()))?;
    let check_results: types::CheckResults = serde_json::from_str(&results)
        .with_context(|| format!("Not a results file: {}", results_path.display()))?;

    match format {
        "json" => json::generate(&check_results, output).await,
        "junit" => junit::generate(&check_results, output).await,
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Write every file report into `output_dir`
pub fn write_reports(results: &types::CheckResults, output_dir: &Path) -> Result<()> {
    json::write_report(results, output_dir)?;
    junit::write_report(results, output_dir)?;
    Ok(())
}
