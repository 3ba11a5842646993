//! Release payload lookups against the OpenShift release controller.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{FieldSpec, GenericTool, InputSchema, ToolInput};
use crate::base::types::Res;

const STREAM_TYPES: [&str; 2] = ["nightly", "ci"];
const DEFAULT_LIMIT: usize = 10;

/// Reduce `"4.20"`, `"v4.20"` or `"OCP 4.20"` to `4.20`.
pub fn clean_release_version(raw: &str) -> Option<String> {
    let version = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect::<String>();

    match version.split_once('.') {
        Some((major, minor)) if is_digits(major) && is_digits(minor) => Some(version),
        _ => None,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `4.20` + `nightly` gives the stream `4.20.0-0.nightly`.
pub fn release_stream(version: &str, stream_type: &str) -> String {
    format!("{version}.0-0.{stream_type}")
}

/// The release stream a payload belongs to, if the name is shaped like
/// `4.20.0-0.nightly-2025-06-17-061341`.
pub fn payload_release_stream(name: &str) -> Option<String> {
    let (version, rest) = name.split_once(".0-0.")?;
    clean_release_version(version).filter(|v| v == version)?;

    let (stream_type, stamp) = rest.split_once('-')?;
    if !STREAM_TYPES.contains(&stream_type) || payload_timestamp(stamp).is_none() {
        return None;
    }

    Some(release_stream(version, stream_type))
}

/// Render a `2025-06-17-061341` stamp as `2025-06-17 06:13:41`.
fn payload_timestamp(stamp: &str) -> Option<String> {
    let parts = stamp.split('-').collect::<Vec<_>>();

    match parts.as_slice() {
        [y, m, d, t] if y.len() == 4 && m.len() == 2 && d.len() == 2 && t.len() == 6 && parts.iter().all(|p| is_digits(p)) => {
            Some(format!("{y}-{m}-{d} {}:{}:{}", &t[..2], &t[2..4], &t[4..]))
        }
        _ => None,
    }
}

/// When the payload was cut, read from the stamp that ends its name.
fn payload_created(name: &str) -> Option<String> {
    let start = name.len().checked_sub(17)?;
    name.get(start..).and_then(payload_timestamp)
}

/// Strip `payload_name = '...'` style wrapping the model sometimes sends.
pub fn clean_payload_name(raw: &str) -> String {
    let cleaned = raw.rsplit('=').next().unwrap_or(raw).trim().trim_matches(|c| c == '\'' || c == '"');

    cleaned
        .split_whitespace()
        .find(|word| payload_release_stream(word).is_some())
        .unwrap_or(cleaned)
        .to_string()
}

fn phase_of(tag: &Value) -> &str {
    tag.get("phase").and_then(Value::as_str).unwrap_or("Unknown")
}

fn name_of(tag: &Value) -> &str {
    tag.get("name").and_then(Value::as_str).unwrap_or("Unknown")
}

/// Lists recent payloads of a release stream, or reports on one payload.
pub struct ReleasePayloadTool {
    release_controller_url: String,
    http: reqwest::Client,
    schema: InputSchema,
}

impl ReleasePayloadTool {
    pub fn new(release_controller_url: String, http: reqwest::Client) -> Self {
        Self {
            release_controller_url: release_controller_url.trim_end_matches('/').to_string(),
            http,
            schema: InputSchema::new(vec![
                FieldSpec::required("release_version", "Release version (e.g., '4.20', '4.19')"),
                FieldSpec::optional("stream_type", "Stream type: 'nightly' or 'ci'", Some(json!("nightly"))),
                FieldSpec::optional("include_ready", "Include 'Ready' phase payloads", Some(json!(false))),
                FieldSpec::optional("limit", "Maximum number of payloads to return", Some(json!(DEFAULT_LIMIT))),
                FieldSpec::optional("payload_name", "Specific payload to report on (e.g., '4.20.0-0.nightly-2025-06-17-061341')", None),
            ]),
        }
    }

    async fn fetch_tags(&self, stream: &str) -> Res<Value> {
        let endpoint = format!("{}/releasestream/{stream}/tags", self.release_controller_url);

        info!("Fetching release payloads from {endpoint}");

        let response = self.http.get(&endpoint).timeout(Duration::from_secs(30)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            anyhow::bail!("Release stream '{stream}' not found. Check the release version and stream type.");
        }

        Ok(response.error_for_status()?.json::<Value>().await?)
    }
}

#[async_trait]
impl GenericTool for ReleasePayloadTool {
    fn name(&self) -> &str {
        "get_release_payloads"
    }

    fn description(&self) -> &str {
        "Get OpenShift release payload information and basic status. When asked for the 'latest' or 'last' payload, returns the most recent payload's name and status. Input: JSON with release_version (e.g., '4.20'), optional stream_type ('nightly' or 'ci'), include_ready, limit, or a specific payload_name"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    #[instrument(name = "ReleasePayloadTool::execute", skip_all)]
    async fn execute(&self, input: &ToolInput) -> Res<String> {
        if let Some(payload_name) = input.string("payload_name").filter(|p| !p.trim().is_empty()) {
            let payload_name = clean_payload_name(&payload_name);
            let stream = payload_release_stream(&payload_name)
                .ok_or_else(|| anyhow::anyhow!("Could not extract a release stream from payload name '{payload_name}'. Expected a name like '4.20.0-0.nightly-2025-06-17-061341'"))?;

            let data = self.fetch_tags(&stream).await?;
            return format_payload_status(&data, &payload_name, &stream);
        }

        let raw_version = input.require_string("release_version")?;
        let version = clean_release_version(&raw_version).ok_or_else(|| anyhow::anyhow!("Invalid release version format. Expected a version like '4.20', got: {raw_version}"))?;

        let stream_type = input.string("stream_type").unwrap_or_else(|| "nightly".to_string());
        if !STREAM_TYPES.contains(&stream_type.as_str()) {
            anyhow::bail!("Invalid stream type '{stream_type}'. Must be 'nightly' or 'ci'.");
        }

        let include_ready = input.bool("include_ready").unwrap_or(false);
        let limit = input.string("limit").and_then(|l| l.parse::<usize>().ok()).unwrap_or(DEFAULT_LIMIT);

        let data = self.fetch_tags(&release_stream(&version, &stream_type)).await?;

        Ok(format_payloads(&data, &version, &stream_type, include_ready, limit))
    }
}

/// Render the payload list of a release stream, newest first.
pub fn format_payloads(data: &Value, version: &str, stream_type: &str, include_ready: bool, limit: usize) -> String {
    if data.as_object().is_none_or(|o| o.is_empty()) {
        return "No data returned from release controller API".to_string();
    }

    let stream_name = name_of(data);
    let tags = data.get("tags").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    if tags.is_empty() {
        return format!("No payloads found for release stream {stream_name}");
    }

    let shown = tags
        .iter()
        .filter(|tag| include_ready || !phase_of(tag).eq_ignore_ascii_case("ready"))
        .take(if limit == 0 { usize::MAX } else { limit })
        .collect::<Vec<_>>();

    let mut out = format!("**OpenShift Release Payloads - {version} {stream_type}**\n\n");
    out += &format!("Release Stream: {stream_name}\n");
    out += &format!("Total Payloads: {} (showing {})\n\n", tags.len(), shown.len());

    let Some(latest) = shown.first() else {
        out += "No payloads found matching the criteria.\n";
        if !include_ready {
            out += "Note: 'Ready' phase payloads are excluded by default. Set include_ready to true to see them.\n";
        }
        return out;
    };

    out += &format!("Latest {version} {stream_type} payload: {} ({})\n\n", name_of(latest), phase_of(latest));

    out += "**Payloads:**\n";
    for (i, tag) in shown.iter().enumerate() {
        let name = name_of(tag);
        let created = payload_created(name);

        out += &format!("{}. {name}", i + 1);
        if let Some(created) = created {
            out += &format!(" ({created})");
        }
        out += &format!("\n   Status: {}\n", phase_of(tag));

        if let Some(pull_spec) = tag.get("pullSpec").and_then(Value::as_str).filter(|p| !p.is_empty()) {
            out += &format!("   Pull Spec: {pull_spec}\n");
        }
        if let Some(url) = tag.get("downloadURL").and_then(Value::as_str).filter(|u| !u.is_empty()) {
            out += &format!("   Download: {url}\n");
        }
    }

    let mut phases = BTreeMap::<String, usize>::new();
    for tag in &shown {
        *phases.entry(phase_of(tag).to_lowercase()).or_default() += 1;
    }

    out += "\n**Status Summary:**\n";
    for (phase, count) in phases {
        out += &format!("{phase}: {count}\n");
    }

    out
}

/// Render the status of one payload found in its stream's tag list.
pub fn format_payload_status(data: &Value, payload_name: &str, stream: &str) -> Res<String> {
    let tag = data
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.iter().find(|t| name_of(t) == payload_name))
        .ok_or_else(|| anyhow::anyhow!("Payload '{payload_name}' not found in release stream '{stream}'"))?;

    let phase = phase_of(tag);
    let mut out = String::from("**OpenShift Release Payload Status**\n\n");

    out += &format!("Payload: {payload_name}");
    if let Some(created) = payload_created(payload_name) {
        out += &format!(" (Created: {created})");
    }
    out += &format!("\nStatus: {phase}\nRelease Stream: {stream}\n");

    if let Some(pull_spec) = tag.get("pullSpec").and_then(Value::as_str).filter(|p| !p.is_empty()) {
        out += &format!("Pull Spec: {pull_spec}\n");
    }

    match phase.to_lowercase().as_str() {
        "rejected" => out += "\nThis payload was rejected due to blocking job failures.\n",
        "accepted" => out += "\nThis payload was accepted and is ready for use.\n",
        "ready" => out += "\nThis payload is ready but not yet tested by blocking jobs.\n",
        _ => {}
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Value {
        json!({
            "name": "4.20.0-0.nightly",
            "tags": [
                {"name": "4.20.0-0.nightly-2025-06-17-061341", "phase": "Ready", "pullSpec": "quay.io/x:1"},
                {"name": "4.20.0-0.nightly-2025-06-16-120000", "phase": "Rejected", "pullSpec": "quay.io/x:2"},
                {"name": "4.20.0-0.nightly-2025-06-15-120000", "phase": "Accepted"}
            ]
        })
    }

    #[test]
    fn test_clean_release_version() {
        assert_eq!(clean_release_version("4.20").as_deref(), Some("4.20"));
        assert_eq!(clean_release_version("v4.19 ").as_deref(), Some("4.19"));
        assert_eq!(clean_release_version("latest"), None);
        assert_eq!(clean_release_version("4."), None);
    }

    #[test]
    fn test_payload_release_stream() {
        assert_eq!(payload_release_stream("4.20.0-0.nightly-2025-06-17-061341").as_deref(), Some("4.20.0-0.nightly"));
        assert_eq!(payload_release_stream("4.19.0-0.ci-2025-06-17-061341").as_deref(), Some("4.19.0-0.ci"));
        assert_eq!(payload_release_stream("4.20.0-0.okd-2025-06-17-061341"), None);
        assert_eq!(payload_release_stream("4.20.0-0.nightly"), None);
    }

    #[test]
    fn test_clean_payload_name() {
        assert_eq!(clean_payload_name("payload_name = '4.20.0-0.nightly-2025-06-17-061341'"), "4.20.0-0.nightly-2025-06-17-061341");
        assert_eq!(clean_payload_name("the payload 4.20.0-0.ci-2025-06-17-061341 please"), "4.20.0-0.ci-2025-06-17-061341");
    }

    #[test]
    fn test_format_payloads_skips_ready_by_default() {
        let out = format_payloads(&tags(), "4.20", "nightly", false, 10);

        assert!(out.contains("Total Payloads: 3 (showing 2)"));
        assert!(out.contains("Latest 4.20 nightly payload: 4.20.0-0.nightly-2025-06-16-120000 (Rejected)"));
        assert!(out.contains("1. 4.20.0-0.nightly-2025-06-16-120000 (2025-06-16 12:00:00)\n   Status: Rejected\n   Pull Spec: quay.io/x:2\n"));
        assert!(out.contains("accepted: 1\nrejected: 1\n"));
        assert!(!out.contains("061341"));
    }

    #[test]
    fn test_format_payloads_limit_and_ready() {
        let out = format_payloads(&tags(), "4.20", "nightly", true, 1);

        assert!(out.contains("(showing 1)"));
        assert!(out.contains("Latest 4.20 nightly payload: 4.20.0-0.nightly-2025-06-17-061341 (Ready)"));
    }

    #[test]
    fn test_format_payloads_empty() {
        assert_eq!(format_payloads(&json!({"name": "4.20.0-0.ci", "tags": []}), "4.20", "ci", false, 10), "No payloads found for release stream 4.20.0-0.ci");
        assert_eq!(format_payloads(&json!({}), "4.20", "ci", false, 10), "No data returned from release controller API");
    }

    #[test]
    fn test_format_payload_status() {
        let out = format_payload_status(&tags(), "4.20.0-0.nightly-2025-06-16-120000", "4.20.0-0.nightly").unwrap();

        assert!(out.contains("Payload: 4.20.0-0.nightly-2025-06-16-120000 (Created: 2025-06-16 12:00:00)\nStatus: Rejected\n"));
        assert!(out.contains("rejected due to blocking job failures"));

        assert!(format_payload_status(&tags(), "4.20.0-0.nightly-2025-01-01-000000", "4.20.0-0.nightly").is_err());
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_before_any_request() {
        let tool = ReleasePayloadTool::new("http://127.0.0.1:9".into(), reqwest::Client::new());

        let input = tool.input_schema().coerce(tool.name(), r#"{"release_version": "latest"}"#).unwrap();
        assert!(tool.execute(&input).await.unwrap_err().to_string().contains("Invalid release version format"));

        let input = tool.input_schema().coerce(tool.name(), r#"{"release_version": "4.20", "stream_type": "okd"}"#).unwrap();
        assert!(tool.execute(&input).await.unwrap_err().to_string().contains("Invalid stream type 'okd'"));

        let input = tool.input_schema().coerce(tool.name(), r#"{"release_version": "4.20", "payload_name": "nonsense"}"#).unwrap();
        assert!(tool.execute(&input).await.unwrap_err().to_string().contains("Could not extract a release stream"));
    }
}
