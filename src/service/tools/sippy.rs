//! Tools backed by the Sippy API: prow job run summaries and artifact searches.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{FieldSpec, GenericTool, InputSchema, ToolInput};
use crate::base::types::Res;

const MAX_FAILURES_SHOWN: usize = 25;
const MAX_MATCHES_SHOWN: usize = 5;

/// Pull the numeric job run ID out of whatever the model sent.
///
/// The model sometimes wraps the ID in prose; any run of ten or more digits wins.
pub fn extract_job_id(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Some(id) = raw.split(|c: char| !c.is_ascii_digit()).find(|run| run.len() >= 10) {
        return Some(id.to_string());
    }

    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        return Some(raw.to_string());
    }

    None
}

fn require_api_url(api_url: &Option<String>) -> Res<&str> {
    api_url
        .as_deref()
        .map(|u| u.trim_end_matches('/'))
        .ok_or_else(|| anyhow::anyhow!("No Sippy API URL configured. Set SIPPY_AGENT_SIPPY_API_URL."))
}

fn require_job_id(raw: &str) -> Res<String> {
    extract_job_id(raw).ok_or_else(|| anyhow::anyhow!("Invalid job ID format. Expected a numeric ID, got: {raw}"))
}

fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("Unknown")
}

fn flag(data: &Value, key: &str) -> &'static str {
    if data.get(key).and_then(Value::as_bool).unwrap_or(false) { "Yes" } else { "No" }
}

fn truncate(text: &str, max: usize) -> String {
    let clean = text.trim().replace('\n', " ");
    if clean.chars().count() <= max {
        return clean;
    }

    let cut = clean.chars().take(max).collect::<String>();
    format!("{cut}...")
}

/// Render a duration in seconds as `1h 2m 3s`.
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s}s"),
        (_, _) if s == 0 => format!("{h}h {m}m"),
        _ => format!("{h}h {m}m {s}s"),
    }
}

// Job summary.

/// Fetches `/api/job/run/summary` for a prow job run.
pub struct ProwJobSummaryTool {
    api_url: Option<String>,
    http: reqwest::Client,
    schema: InputSchema,
}

impl ProwJobSummaryTool {
    pub fn new(api_url: Option<String>, http: reqwest::Client) -> Self {
        Self {
            api_url,
            http,
            schema: InputSchema::single("prow_job_run_id", "Numeric prow job run ID only (e.g., 1934795512955801600)"),
        }
    }
}

#[async_trait]
impl GenericTool for ProwJobSummaryTool {
    fn name(&self) -> &str {
        "get_prow_job_summary"
    }

    fn description(&self) -> &str {
        "Get a summary of a prow job run including URL, TestGrid URL, timing, results, and test failures. Input: just the numeric job ID (e.g., 1934795512955801600)"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    #[instrument(name = "ProwJobSummaryTool::execute", skip_all)]
    async fn execute(&self, input: &ToolInput) -> Res<String> {
        let api_url = require_api_url(&self.api_url)?;
        let job_id = require_job_id(&input.require_string("prow_job_run_id")?)?;
        let endpoint = format!("{api_url}/api/job/run/summary");

        info!("Fetching job summary for {job_id} from {endpoint}");

        let data = self
            .http
            .get(&endpoint)
            .query(&[("prow_job_run_id", job_id.as_str())])
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(format_job_summary(&data))
    }
}

/// Render a job run summary for the model.
pub fn format_job_summary(data: &Value) -> String {
    if data.as_object().is_none_or(|o| o.is_empty()) {
        return "No data returned from Sippy API".to_string();
    }

    let job_name = str_field(data, "name");
    let mut out = String::from("**Prow Job Summary**\n\n");

    out += &format!("Job ID: {}\n", data.get("id").map(|v| v.to_string().trim_matches('"').to_string()).unwrap_or_else(|| "Unknown".into()));
    out += &format!("Job Name: {job_name}\n");
    out += &format!("Release: {}\n", str_field(data, "release"));
    out += &format!("Cluster: {}\n\n", str_field(data, "cluster"));

    if job_name.starts_with("aggregated-") {
        out += "This is an aggregated job: it runs several instances of the same test and reports statistical results.\n\n";
    }

    if let Some(start) = data.get("startTime").and_then(Value::as_str) {
        out += &format!("Start Time: {start}\n");
    }
    match data.get("durationSeconds").and_then(Value::as_u64) {
        Some(secs) if secs > 0 => out += &format!("Duration: {} ({secs} seconds)\n\n", format_duration(secs)),
        _ => out += "Duration: Not available\n\n",
    }

    out += &format!("Overall Result: {}\n", str_field(data, "overallResult"));
    out += &format!("Succeeded: {}\n", flag(data, "succeeded"));
    out += &format!("Failed: {}\n", flag(data, "failed"));
    out += &format!("Infrastructure Failure: {}\n", flag(data, "infrastructureFailure"));
    out += &format!("Known Failure: {}\n", flag(data, "knownFailure"));
    out += &format!("Reason: {}\n\n", str_field(data, "reason"));

    let test_count = data.get("testCount").and_then(Value::as_u64).unwrap_or(0);
    let failure_count = data.get("testFailureCount").and_then(Value::as_u64).unwrap_or(0);
    out += &format!("Total Tests: {test_count}\nFailed Tests: {failure_count}\n");
    if test_count > 0 && failure_count > 0 {
        out += &format!("Failure Rate: {:.1}%\n", failure_count as f64 / test_count as f64 * 100.0);
    }
    out += "\n";

    if let Some(variants) = data.get("variants").and_then(Value::as_array).filter(|v| !v.is_empty()) {
        let variants = variants.iter().filter_map(Value::as_str).collect::<Vec<_>>();
        out += &format!("Variants: {}\n\n", variants.join(", "));
    }

    if let Some(failures) = data.get("testFailures").and_then(Value::as_object).filter(|f| !f.is_empty()) {
        out += &format!("**Failed Tests ({} total", failures.len());
        if failures.len() > MAX_FAILURES_SHOWN {
            out += &format!(", showing first {MAX_FAILURES_SHOWN}");
        }
        out += "):**\n";

        for (i, (test, message)) in failures.iter().take(MAX_FAILURES_SHOWN).enumerate() {
            let message = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
            out += &format!("{}. {test}\n   Error: {}\n", i + 1, truncate(&message, 300));
        }

        if failures.len() > MAX_FAILURES_SHOWN {
            out += &format!("... and {} more failed tests\n", failures.len() - MAX_FAILURES_SHOWN);
        }
        out += "\n";
    }

    if let Some(operators) = data.get("degradedOperators").and_then(Value::as_object).filter(|o| !o.is_empty()) {
        out += &format!("**Degraded Operators ({}):**\n", operators.len());
        for (name, info) in operators.iter().take(10) {
            let info = info.as_str().map(str::to_string).unwrap_or_else(|| info.to_string());
            out += &format!("- {name}: {}\n", truncate(&info, 200));
        }
        out += "\n";
    }

    if let Some(url) = data.get("url").and_then(Value::as_str).filter(|u| !u.is_empty()) {
        out += &format!("Prow Job URL: {url}\n");
    }
    if let Some(url) = data.get("testGridURL").and_then(Value::as_str).filter(|u| !u.is_empty()) {
        out += &format!("TestGrid URL: {url}\n");
    }

    out
}

// Log analysis.

/// Searches job artifacts through `/api/jobs/artifacts`.
pub struct LogAnalyzerTool {
    api_url: Option<String>,
    http: reqwest::Client,
    schema: InputSchema,
}

impl LogAnalyzerTool {
    pub fn new(api_url: Option<String>, http: reqwest::Client) -> Self {
        Self {
            api_url,
            http,
            schema: InputSchema::new(vec![
                FieldSpec::required("prow_job_run_id", "Numeric prow job run ID only (e.g., 1934795512955801600)"),
                FieldSpec::optional("path_glob", "Path glob of artifacts to search (e.g., '*build-log*', '**/junit*.xml')", Some(json!("*build-log*"))),
                FieldSpec::optional("text_regex", "Regex to search for in the artifacts (e.g., 'timeout', 'panic')", Some(json!("[Ee]rror|[Ff]ail"))),
            ]),
        }
    }
}

#[async_trait]
impl GenericTool for LogAnalyzerTool {
    fn name(&self) -> &str {
        "analyze_job_logs"
    }

    fn description(&self) -> &str {
        "Search job artifacts for patterns. Input: JSON with the numeric job ID, optional path_glob and text_regex"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    #[instrument(name = "LogAnalyzerTool::execute", skip_all)]
    async fn execute(&self, input: &ToolInput) -> Res<String> {
        let api_url = require_api_url(&self.api_url)?;
        let job_id = require_job_id(&input.require_string("prow_job_run_id")?)?;
        let path_glob = input.require_string("path_glob")?;
        let text_regex = input.require_string("text_regex")?;
        let endpoint = format!("{api_url}/api/jobs/artifacts");

        info!("Searching artifacts of {job_id} matching {path_glob} for /{text_regex}/");

        let data = self
            .http
            .get(&endpoint)
            .query(&[("prowJobRuns", job_id.as_str()), ("pathGlob", path_glob.as_str()), ("textRegex", text_regex.as_str())])
            .timeout(Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(format_log_analysis(&data, &job_id, &path_glob, &text_regex))
    }
}

/// Render artifact matches for the model.
pub fn format_log_analysis(data: &Value, job_id: &str, path_glob: &str, text_regex: &str) -> String {
    let mut out = format!("**Log Analysis Results**\n\nJob Run ID: {job_id}\nPath Pattern: {path_glob}\nSearch Pattern: {text_regex}\n\n");

    let Some(job_runs) = data.get("job_runs").and_then(Value::as_array) else {
        out += &format!("Results:\n{}\n", truncate(&data.to_string(), 500));
        return out;
    };

    if job_runs.is_empty() {
        out += "Results: No job runs found\n";
        return out;
    }

    for run in job_runs {
        let artifacts = run.get("artifacts").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        if artifacts.is_empty() {
            out += "Results: No artifacts found\n";
            continue;
        }

        out += &format!("Found {} matching artifacts:\n\n", artifacts.len());

        for artifact in artifacts {
            out += &format!("**{}**\n", str_field(artifact, "artifact_path"));
            if let Some(url) = artifact.get("artifact_url").and_then(Value::as_str).filter(|u| !u.is_empty()) {
                out += &format!("Full log: {url}\n");
            }

            let line_matches = artifact.pointer("/matched_content/line_matches");
            let matches = line_matches.and_then(|m| m.get("matches")).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

            if matches.is_empty() {
                out += "No matching lines in this artifact\n\n";
                continue;
            }

            out += &format!("{} matching lines:\n", matches.len());
            for (i, m) in matches.iter().take(MAX_MATCHES_SHOWN).enumerate() {
                let text = m.get("match").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| m.to_string());
                out += &format!("{}. {}\n", i + 1, truncate(&text, 200));
            }
            if matches.len() > MAX_MATCHES_SHOWN {
                out += &format!("... and {} more lines\n", matches.len() - MAX_MATCHES_SHOWN);
            }
            if line_matches.and_then(|m| m.get("truncated")).and_then(Value::as_bool).unwrap_or(false) {
                out += "Results were truncated; there may be more matches.\n";
            }
            out += "\n";
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_job_id() {
        assert_eq!(extract_job_id("1934795512955801600").as_deref(), Some("1934795512955801600"));
        assert_eq!(extract_job_id("job 1934795512955801600 please").as_deref(), Some("1934795512955801600"));
        assert_eq!(extract_job_id(" 12345 ").as_deref(), Some("12345"));
        assert_eq!(extract_job_id("job twelve"), None);
        assert_eq!(extract_job_id(""), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7200), "2h 0m");
        assert_eq!(format_duration(3723), "1h 2m 3s");
    }

    #[test]
    fn test_format_job_summary() {
        let data = json!({
            "id": 1934795512955801600u64,
            "name": "periodic-ci-openshift-release-master-nightly-4.20-e2e-aws",
            "release": "4.20",
            "durationSeconds": 3723,
            "overallResult": "F",
            "failed": true,
            "testCount": 200,
            "testFailureCount": 2,
            "testFailures": {"[sig-network] dns should resolve": "timeout waiting for pod"},
            "url": "https://prow.example/view/1"
        });

        let out = format_job_summary(&data);

        assert!(out.contains("Job ID: 1934795512955801600"));
        assert!(out.contains("Duration: 1h 2m 3s (3723 seconds)"));
        assert!(out.contains("Failed: Yes"));
        assert!(out.contains("Failure Rate: 1.0%"));
        assert!(out.contains("1. [sig-network] dns should resolve\n   Error: timeout waiting for pod"));
        assert!(out.contains("Prow Job URL: https://prow.example/view/1"));
        assert!(!out.contains("aggregated job"));
    }

    #[test]
    fn test_format_job_summary_empty() {
        assert_eq!(format_job_summary(&json!({})), "No data returned from Sippy API");
    }

    #[test]
    fn test_format_log_analysis() {
        let data = json!({
            "job_runs": [{
                "artifacts": [{
                    "artifact_path": "build-log.txt",
                    "matched_content": {"line_matches": {"matches": [{"match": "error: failed to install"}], "truncated": true}}
                }]
            }]
        });

        let out = format_log_analysis(&data, "1", "*build-log*", "error");

        assert!(out.contains("Found 1 matching artifacts"));
        assert!(out.contains("1. error: failed to install"));
        assert!(out.contains("truncated"));
    }

    #[tokio::test]
    async fn test_missing_api_url_is_an_error() {
        let tool = ProwJobSummaryTool::new(None, reqwest::Client::new());
        let input = tool.input_schema().coerce(tool.name(), "1934795512955801600").unwrap();

        let err = tool.execute(&input).await.unwrap_err();

        assert!(err.to_string().contains("No Sippy API URL configured"));
    }
}
