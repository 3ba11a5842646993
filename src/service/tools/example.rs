//! The echo tool and placeholders for analyses that are not wired to a backend yet.

use async_trait::async_trait;
use serde_json::Value;

use super::{FieldSpec, GenericTool, InputSchema, ToolInput};
use crate::base::types::Res;

/// Echoes its input back; handy for checking the loop end to end.
pub struct EchoTool {
    schema: InputSchema,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            schema: InputSchema::single("message", "Message to echo back"),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenericTool for EchoTool {
    fn name(&self) -> &str {
        "example_tool"
    }

    fn description(&self) -> &str {
        "An example tool that echoes back the input"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    async fn execute(&self, input: &ToolInput) -> Res<String> {
        Ok(format!("Echo: {}", input.require_string("message")?))
    }
}

/// Placeholder for a dedicated job analysis backend.
pub struct JobAnalysisTool {
    schema: InputSchema,
}

impl JobAnalysisTool {
    pub fn new() -> Self {
        Self {
            schema: InputSchema::new(vec![
                FieldSpec::required("job_id", "ID of the CI job to analyze"),
                FieldSpec::optional("include_logs", "Whether to include log analysis", Some(Value::Bool(false))),
            ]),
        }
    }
}

impl Default for JobAnalysisTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenericTool for JobAnalysisTool {
    fn name(&self) -> &str {
        "analyze_job"
    }

    fn description(&self) -> &str {
        "Analyze a CI job for failures and issues"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    async fn execute(&self, input: &ToolInput) -> Res<String> {
        let job_id = input.require_string("job_id")?;
        let include_logs = input.bool("include_logs").unwrap_or(false);

        Ok(format!("Job analysis for {job_id} is not available yet. Include logs: {include_logs}"))
    }
}

/// Placeholder for test failure trend analysis.
pub struct TestFailureTool {
    schema: InputSchema,
}

impl TestFailureTool {
    pub fn new() -> Self {
        Self {
            schema: InputSchema::new(vec![
                FieldSpec::required("test_name", "Name of the failing test"),
                FieldSpec::optional("time_range", "Time range for analysis (e.g., '7d', '30d')", None),
            ]),
        }
    }
}

impl Default for TestFailureTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenericTool for TestFailureTool {
    fn name(&self) -> &str {
        "analyze_test_failures"
    }

    fn description(&self) -> &str {
        "Analyze test failures for patterns and root causes"
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    async fn execute(&self, input: &ToolInput) -> Res<String> {
        let test_name = input.require_string("test_name")?;
        let time_range = input.string("time_range").unwrap_or_else(|| "default".to_string());

        Ok(format!("Test failure analysis for '{test_name}' over {time_range} period is not available yet."))
    }
}
