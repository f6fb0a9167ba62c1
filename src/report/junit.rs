use super::types::CheckResults;
use crate::runner::state::{PhaseStateReport, StepStateReport, StepStatus};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

pub const JUNIT_FILE: &str = "junit.xml";

#[derive(Default)]
struct Totals {
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
    duration_ms: u64,
}

impl Totals {
    fn of<'a>(steps: impl Iterator<Item = &'a StepStateReport>) -> Self {
        steps.fold(Self::default(), |mut t, step| {
            t.tests += 1;
            t.duration_ms += step.duration_ms.unwrap_or(0);
            match step.status {
                StepStatus::Fail { .. } => t.failures += 1,
                StepStatus::Error { .. } => t.errors += 1,
                StepStatus::Skipped { .. } => t.skipped += 1,
                _ => {}
            }
            t
        })
    }

    fn push_attributes(&self, start: &mut BytesStart) {
        start.push_attribute(("tests", self.tests.to_string().as_str()));
        start.push_attribute(("failures", self.failures.to_string().as_str()));
        start.push_attribute(("errors", self.errors.to_string().as_str()));
        start.push_attribute(("skipped", self.skipped.to_string().as_str()));
        start.push_attribute(("time", seconds(self.duration_ms).as_str()));
    }
}

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML report string from CheckResults.
///
/// One `<testsuite>` per phase, one `<testcase>` per step.
pub fn generate_junit_xml(results: &CheckResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let totals = Totals::of(results.phases.iter().flat_map(|p| p.steps.iter()));

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "library-api-check"));
    totals.push_attributes(&mut suites_start);
    writer.write_event(Event::Start(suites_start))?;

    for (i, phase) in results.phases.iter().enumerate() {
        write_test_suite(&mut writer, phase, i, results)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    phase: &PhaseStateReport,
    id: usize,
    results: &CheckResults,
) -> Result<()> {
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", phase.name.as_str()));
    suite_start.push_attribute(("id", id.to_string().as_str()));
    Totals::of(phase.steps.iter()).push_attributes(&mut suite_start);
    suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
    suite_start.push_attribute(("hostname", results.base_url.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    let classname = format!("library-api-check.{}", phase.role.label().to_lowercase());
    for step in &phase.steps {
        write_test_case(writer, step, &classname)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    step: &StepStateReport,
    classname: &str,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", step.name.as_str()));
    case_start.push_attribute(("classname", classname));
    case_start.push_attribute(("time", seconds(step.duration_ms.unwrap_or(0)).as_str()));

    let (tag, message, text) = match &step.status {
        StepStatus::Fail { body, message, .. } => {
            ("failure", message.clone(), Some(body.as_str()))
        }
        StepStatus::Error { error } => ("error", error.clone(), None),
        StepStatus::Skipped { reason } => ("skipped", reason.clone(), None),
        _ => {
            writer.write_event(Event::Empty(case_start))?;
            return Ok(());
        }
    };

    writer.write_event(Event::Start(case_start))?;

    let mut detail = BytesStart::new(tag);
    detail.push_attribute(("message", message.as_str()));
    match text {
        Some(text) if !text.is_empty() => {
            writer.write_event(Event::Start(detail))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        _ => writer.write_event(Event::Empty(detail))?,
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Generate JUnit report
pub async fn generate(results: &CheckResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;

    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}

/// Write report to file
pub fn write_report(results: &CheckResults, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join(JUNIT_FILE);
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Role;
    use crate::runner::state::{AuthState, PhaseStatus, RunSummary};

    fn step(index: usize, name: &str, status: StepStatus) -> StepStateReport {
        StepStateReport {
            index,
            name: name.to_string(),
            method: "GET".to_string(),
            url: None,
            status,
            duration_ms: Some(120),
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let results = CheckResults {
            run_id: "run-1".to_string(),
            base_url: "http://localhost:8080/api".to_string(),
            phases: vec![
                PhaseStateReport {
                    name: "PUBLIC CATALOG ENDPOINTS".to_string(),
                    role: Role::Public,
                    auth: AuthState::NotRequired,
                    status: PhaseStatus::PartiallyPassed {
                        passed: 1,
                        failed: 1,
                    },
                    steps: vec![
                        step(0, "GET /books (public)", StepStatus::Ok { status: 200 }),
                        step(
                            1,
                            "GET /categories (public)",
                            StepStatus::Fail {
                                status: 500,
                                body: "Internal <error>".to_string(),
                                message: "-> 500: Internal <error>".to_string(),
                            },
                        ),
                        step(
                            2,
                            "GET /books/{id} (public)",
                            StepStatus::Skipped {
                                reason: "no bookId captured by an earlier step".to_string(),
                            },
                        ),
                    ],
                    total_duration_ms: Some(360),
                },
                PhaseStateReport {
                    name: "READER ENDPOINTS".to_string(),
                    role: Role::Reader,
                    auth: AuthState::Authenticated,
                    status: PhaseStatus::Failed,
                    steps: vec![step(
                        0,
                        "LOGIN READER",
                        StepStatus::Error {
                            error: "no response: connection refused".to_string(),
                        },
                    )],
                    total_duration_ms: Some(120),
                },
            ],
            summary: RunSummary {
                run_id: "run-1".to_string(),
                total_phases: 2,
                total_steps: 4,
                ok: 1,
                failed: 1,
                errored: 1,
                skipped: 1,
                total_duration_ms: Some(480),
            },
            generated_at: "2025-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="library-api-check""#));
        assert!(xml.contains(r#"tests="4" failures="1" errors="1" skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="PUBLIC CATALOG ENDPOINTS""#));
        assert!(xml.contains(r#"<testcase name="GET /books (public)""#));
        assert!(xml.contains(r#"<failure message="-&gt; 500: Internal &lt;error&gt;">"#));
        assert!(xml.contains("Internal &lt;error&gt;"));
        assert!(xml.contains(r#"<skipped message="no bookId captured by an earlier step"/>"#));
        assert!(xml.contains(r#"<error message="no response: connection refused"/>"#));
        assert!(xml.contains(r#"classname="library-api-check.reader""#));
    }
}
