//! Tools the agent can call, and the registry that owns them.

pub mod example;
pub mod jira;
pub mod release;
pub mod schema;
pub mod sippy;

use std::{collections::HashMap, fmt, ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::base::{config::Config, error::AgentError, types::Res};

pub use schema::{FieldSpec, InputSchema, ToolInput};

// Traits.

/// Generic tool trait that tools must implement.
///
/// A tool is a named, schema-described unit of external capability. It takes coerced
/// input and returns text for the model to read. Failures are returned as `Err`; the
/// dispatcher turns them into observations so they never abort a turn.
#[async_trait]
pub trait GenericTool: Send + Sync + 'static {
    /// Unique, stable name the model uses in `Action:`.
    fn name(&self) -> &str;

    /// What the tool does; only used to build the prompt catalogue.
    fn description(&self) -> &str;

    /// The arguments the tool expects.
    fn input_schema(&self) -> &InputSchema;

    /// Run the tool.
    async fn execute(&self, input: &ToolInput) -> Res<String>;
}

// Structs.

/// A registered tool.
///
/// This is trivially cloneable, so registry snapshots share the underlying tools.
#[derive(Clone)]
pub struct Tool {
    inner: Arc<dyn GenericTool>,
}

impl Deref for Tool {
    type Target = dyn GenericTool;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

impl Tool {
    pub fn new(inner: impl GenericTool) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Name-to-tool mapping, in registration order.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; names must be unique.
    pub fn register(&mut self, tool: Tool) -> Result<(), AgentError> {
        let name = tool.name().to_string();

        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateToolName(name));
        }

        self.index.insert(name, self.tools.len());
        self.tools.push(tool);

        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Tool, AgentError> {
        self.index.get(name).map(|&i| &self.tools[i]).ok_or_else(|| AgentError::ToolNotFound {
            name: name.to_string(),
            available: self.names(),
        })
    }

    pub fn list(&self) -> &[Tool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the registry of every built-in tool.
///
/// Each tool gets only the endpoint and credentials it needs. The HTTP client is shared,
/// so connections are pooled across tools and concurrent turns.
pub fn default_registry(config: &Config) -> Res<ToolRegistry> {
    let http = reqwest::Client::builder().user_agent(concat!("sippy-agent/", env!("CARGO_PKG_VERSION"))).build()?;

    let mut registry = ToolRegistry::new();

    registry.register(Tool::new(example::EchoTool::new()))?;
    registry.register(Tool::new(example::JobAnalysisTool::new()))?;
    registry.register(Tool::new(example::TestFailureTool::new()))?;
    registry.register(Tool::new(sippy::ProwJobSummaryTool::new(config.sippy_api_url.clone(), http.clone())))?;
    registry.register(Tool::new(sippy::LogAnalyzerTool::new(config.sippy_api_url.clone(), http.clone())))?;
    registry.register(Tool::new(jira::JiraIncidentTool::new(
        config.jira_url.clone(),
        jira::JiraCredentials::from_parts(config.jira_username.clone(), config.jira_token.clone()),
        http.clone(),
    )))?;
    registry.register(Tool::new(release::ReleasePayloadTool::new(config.release_controller_url.clone(), http)))?;

    info!("Created {} tools: {:?}", registry.len(), registry.names());

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();

        registry.register(Tool::new(example::EchoTool::new())).unwrap();
        let err = registry.register(Tool::new(example::EchoTool::new())).unwrap_err();

        assert_eq!(err, AgentError::DuplicateToolName("example_tool".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_reports_valid_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(example::EchoTool::new())).unwrap();

        assert_eq!(registry.lookup("example_tool").unwrap().name(), "example_tool");

        match registry.lookup("nope").unwrap_err() {
            AgentError::ToolNotFound { name, available } => {
                assert_eq!(name, "nope");
                assert_eq!(available, vec!["example_tool"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_registry_order() {
        let config = Config::new(ConfigInner::default());

        let registry = default_registry(&config).unwrap();

        assert_eq!(
            registry.names(),
            vec![
                "example_tool",
                "analyze_job",
                "analyze_test_failures",
                "get_prow_job_summary",
                "analyze_job_logs",
                "check_known_incidents",
                "get_release_payloads"
            ]
        );
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(example::EchoTool::new())).unwrap();

        let snapshot = registry.clone();
        registry.register(Tool::new(example::JobAnalysisTool::new())).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
