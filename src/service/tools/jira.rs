//! Known-incident lookup against the TRT Jira project.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{FieldSpec, GenericTool, InputSchema, ToolInput};
use crate::base::types::Res;

const TECH_TERMS: [&str; 11] = ["registry", "timeout", "error", "fail", "503", "502", "infrastructure", "node", "cluster", "network", "build"];
const SKIP_PATTERNS: [&str; 10] = ["none", "null", "no job", "let's", "we can", "this time", "search for all", "open incidents", "trt project", "default value"];
const MAX_TERMS: usize = 3;
const MAX_RESULTS: u32 = 20;

/// Basic auth for Jira; absent unless both parts are configured.
#[derive(Debug, Clone, Default)]
pub struct JiraCredentials {
    auth: Option<(String, String)>,
}

impl JiraCredentials {
    pub fn from_parts(username: Option<String>, token: Option<String>) -> Self {
        Self { auth: username.zip(token) }
    }

    pub fn is_set(&self) -> bool {
        self.auth.is_some()
    }
}

pub struct JiraIncidentTool {
    jira_url: String,
    credentials: JiraCredentials,
    http: reqwest::Client,
    schema: InputSchema,
}

impl JiraIncidentTool {
    pub fn new(jira_url: String, credentials: JiraCredentials, http: reqwest::Client) -> Self {
        Self {
            jira_url: jira_url.trim_end_matches('/').to_string(),
            credentials,
            http,
            schema: InputSchema::new(vec![FieldSpec::optional(
                "search_terms",
                "Optional search terms to filter incidents (e.g., 'registry', 'build11', 'timeout')",
                None,
            )]),
        }
    }
}

#[async_trait]
impl GenericTool for JiraIncidentTool {
    fn name(&self) -> &str {
        "check_known_incidents"
    }

    fn description(&self) -> &str {
        "Check Jira for known open TRT incidents. ONLY use this when job errors suggest a correlation. Use specific keywords that match actual errors found in logs."
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    #[instrument(name = "JiraIncidentTool::execute", skip_all)]
    async fn execute(&self, input: &ToolInput) -> Res<String> {
        if self.jira_url.is_empty() {
            anyhow::bail!("No Jira URL configured. Set SIPPY_AGENT_JIRA_URL.");
        }

        let terms = input.string("search_terms").map(|s| clean_search_terms(&s)).unwrap_or_default();
        let jql = build_jql(&terms);
        let endpoint = format!("{}/rest/api/2/search", self.jira_url);

        if terms.is_empty() {
            info!("Querying Jira for all open TRT incidents");
        } else {
            info!("Querying Jira with search terms: {}", terms.join(","));
        }
        info!("JQL: {jql}");

        let mut request = self
            .http
            .get(&endpoint)
            .query(&[("jql", jql.as_str()), ("fields", "key,summary,status,priority,created,updated,description,labels")])
            .query(&[("maxResults", MAX_RESULTS)])
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(30));

        if !self.credentials.is_set() {
            debug!("No Jira credentials configured, querying anonymously");
        }
        if let Some((username, token)) = &self.credentials.auth {
            request = request.basic_auth(username, Some(token));
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => anyhow::bail!("Jira authentication failed. Check the configured Jira username and token."),
            StatusCode::FORBIDDEN => anyhow::bail!("Access denied to Jira. You may need authentication or permissions to view the TRT project."),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                warn!("Jira returned {status}: {body}");
                anyhow::bail!("HTTP {status} - {body}");
            }
            _ => {}
        }

        let data = response.json::<Value>().await?;

        Ok(format_incidents(&data, &terms, &self.jira_url))
    }
}

/// Reduce free-form model input to at most a few technical keywords.
///
/// Inputs that look like chatter rather than search terms yield nothing, which
/// searches all open incidents.
pub fn clean_search_terms(raw: &str) -> Vec<String> {
    let raw = raw.trim().to_lowercase();

    if raw.is_empty() || raw.len() > 50 || SKIP_PATTERNS.iter().any(|p| raw.contains(p)) {
        return Vec::new();
    }

    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| is_tech_term(word))
        .take(MAX_TERMS)
        .map(str::to_string)
        .collect()
}

fn is_tech_term(word: &str) -> bool {
    match word.strip_prefix("build") {
        Some("") => false,
        Some(suffix) => suffix.chars().all(|c| c.is_ascii_digit()),
        None => TECH_TERMS.contains(&word),
    }
}

pub fn build_jql(terms: &[String]) -> String {
    let mut parts = vec![r#"project = "TRT""#.to_string(), r#"labels = "trt-incident""#.to_string(), "status not in (Closed, Done, Resolved)".to_string()];

    if !terms.is_empty() {
        let text_search = terms.iter().map(|t| format!(r#"text ~ "{t}""#)).collect::<Vec<_>>().join(" OR ");
        parts.push(format!("({text_search})"));
    }

    parts.join(" AND ")
}

fn format_jira_date(raw: &str) -> String {
    let day = raw.split('T').next().unwrap_or_default();

    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) if raw.is_empty() => "Unknown".to_string(),
        Err(_) => day.to_string(),
    }
}

fn nested_name<'a>(fields: &'a Value, key: &str) -> &'a str {
    fields.get(key).and_then(|v| v.get("name")).and_then(Value::as_str).unwrap_or("Unknown")
}

/// Render a Jira search response.
pub fn format_incidents(data: &Value, terms: &[String], jira_url: &str) -> String {
    let issues = data.get("issues").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    let total = data.get("total").and_then(Value::as_u64).unwrap_or(issues.len() as u64);

    if issues.is_empty() {
        return if terms.is_empty() {
            "No open TRT incidents found with 'trt-incident' label".to_string()
        } else {
            format!("No open TRT incidents found matching search terms: {}", terms.join(","))
        };
    }

    let mut out = String::from("**Known Open Incidents**\n\n");
    if !terms.is_empty() {
        out += &format!("Search Terms: {}\n", terms.join(","));
    }
    out += &format!("Found {} of {total} total incidents:\n\n", issues.len());

    for issue in issues {
        let key = issue.get("key").and_then(Value::as_str).unwrap_or("Unknown");
        let empty = Value::Null;
        let fields = issue.get("fields").unwrap_or(&empty);
        let summary = fields.get("summary").and_then(Value::as_str).unwrap_or("No summary");
        let created = format_jira_date(fields.get("created").and_then(Value::as_str).unwrap_or_default());
        let updated = format_jira_date(fields.get("updated").and_then(Value::as_str).unwrap_or_default());

        out += &format!("**{key}** - {summary}\n");
        out += &format!("Status: {} | Priority: {}\n", nested_name(fields, "status"), nested_name(fields, "priority"));
        out += &format!("Created: {created} | Updated: {updated}\n");

        let labels = fields
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|l| {
                        let l = l.to_lowercase();
                        l.contains("trt") || l.contains("incident")
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if !labels.is_empty() {
            out += &format!("Labels: {}\n", labels.join(", "));
        }

        if let Some(description) = fields.get("description").and_then(Value::as_str).filter(|d| !d.trim().is_empty()) {
            let clean = description.replace('\r', "").replace('\n', " ");
            let clean = clean.trim();
            let snippet = if clean.chars().count() > 200 { format!("{}...", clean.chars().take(200).collect::<String>()) } else { clean.to_string() };
            out += &format!("Description: {snippet}\n");
        }

        out += &format!("Link: {jira_url}/browse/{key}\n\n");
    }

    if total > issues.len() as u64 {
        out += &format!("... and {} more incidents (use more specific search terms to narrow results)\n", total - issues.len() as u64);
    }

    out
}
