//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::{agent::budget::BudgetLimits, base::error::AgentError, base::prompts};

use super::types::Res;

/// Default LLM endpoint (a local OpenAI-compatible server such as Ollama).
fn default_llm_endpoint() -> String {
    "http://localhost:11434/v1".to_string()
}

/// Default model to use.
fn default_model_name() -> String {
    "llama3.1:8b".to_string()
}

/// Default sampling temperature.
fn default_temperature() -> f32 {
    0.1
}

/// Default max output tokens per completion.
fn default_llm_max_tokens() -> u32 {
    4096
}

/// Default per-request timeout for the LLM endpoint.
fn default_llm_timeout_secs() -> u64 {
    120
}

/// Default maximum number of loop iterations per turn.
fn default_max_iterations() -> usize {
    15
}

/// Default wall-clock ceiling per turn.
fn default_max_execution_secs() -> u64 {
    1800
}

/// Default number of prior exchanges carried into a turn.
fn default_chat_history_exchanges() -> usize {
    3
}

/// Default Jira instance.
fn default_jira_url() -> String {
    "https://issues.redhat.com".to_string()
}

/// Default OpenShift release controller API.
fn default_release_controller_url() -> String {
    "https://amd64.ocp.releases.ci.openshift.org/api/v1".to_string()
}

/// Default system directive for the agent.
fn default_system_directive() -> String {
    prompts::AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Configuration for the sippy agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// OpenAI-compatible API endpoint (`SIPPY_AGENT_LLM_ENDPOINT`).
    #[serde(default = "default_llm_endpoint")]
    pub llm_endpoint: String,
    /// API key (`SIPPY_AGENT_OPENAI_API_KEY`); not needed for local endpoints.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Model name (`SIPPY_AGENT_MODEL_NAME`), e.g. `llama3.1:8b` or `gpt-4.1`.
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Sampling temperature (`SIPPY_AGENT_TEMPERATURE`), between 0 and 2.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Max output tokens per completion (`SIPPY_AGENT_LLM_MAX_TOKENS`).
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
    /// Per-request timeout in seconds (`SIPPY_AGENT_LLM_TIMEOUT_SECS`).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    /// Transport retries inside the OpenAI client (`SIPPY_AGENT_LLM_MAX_RETRIES`).
    /// The loop itself never retries a failed model call.
    #[serde(default)]
    pub llm_max_retries: u32,
    /// Maximum loop iterations per turn (`SIPPY_AGENT_MAX_ITERATIONS`).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Wall-clock ceiling per turn in seconds (`SIPPY_AGENT_MAX_EXECUTION_SECS`).
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,
    /// Number of prior exchanges carried into each turn (`SIPPY_AGENT_CHAT_HISTORY_EXCHANGES`).
    #[serde(default = "default_chat_history_exchanges")]
    pub chat_history_exchanges: usize,
    /// Optional custom system directive to override the default (`SIPPY_AGENT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Sippy API base URL (`SIPPY_AGENT_SIPPY_API_URL`).
    #[serde(default)]
    pub sippy_api_url: Option<String>,
    /// Jira instance URL (`SIPPY_AGENT_JIRA_URL`).
    #[serde(default = "default_jira_url")]
    pub jira_url: String,
    /// Jira username (`SIPPY_AGENT_JIRA_USERNAME`).
    #[serde(default)]
    pub jira_username: Option<String>,
    /// Jira API token (`SIPPY_AGENT_JIRA_TOKEN`).
    #[serde(default)]
    pub jira_token: Option<String>,
    /// Release controller API base URL (`SIPPY_AGENT_RELEASE_CONTROLLER_URL`).
    #[serde(default = "default_release_controller_url")]
    pub release_controller_url: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            llm_endpoint: default_llm_endpoint(),
            openai_api_key: None,
            model_name: default_model_name(),
            temperature: default_temperature(),
            llm_max_tokens: default_llm_max_tokens(),
            llm_timeout_secs: default_llm_timeout_secs(),
            llm_max_retries: 0,
            max_iterations: default_max_iterations(),
            max_execution_secs: default_max_execution_secs(),
            chat_history_exchanges: default_chat_history_exchanges(),
            system_directive: default_system_directive(),
            sippy_api_url: None,
            jira_url: default_jira_url(),
            jira_username: None,
            jira_token: None,
            release_controller_url: default_release_controller_url(),
        }
    }
}

impl ConfigInner {
    /// Whether the endpoint is OpenAI's hosted API.
    pub fn is_openai_endpoint(&self) -> bool {
        self.llm_endpoint.to_lowercase().contains("openai.com")
    }

    /// Whether the endpoint is served from this machine.
    pub fn is_local_endpoint(&self) -> bool {
        self.llm_endpoint.contains("localhost") || self.llm_endpoint.contains("127.0.0.1")
    }

    /// The Budget Guard limits for a turn.
    pub fn budget_limits(&self) -> BudgetLimits {
        BudgetLimits {
            max_iterations: self.max_iterations,
            max_duration: Duration::from_secs(self.max_execution_secs),
        }
    }

    /// Check the settings that cannot be expressed in the type.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::InvalidConfig("temperature must be between 0 and 2".into()));
        }

        if self.llm_max_tokens < 1 || self.llm_max_tokens > 128000 {
            return Err(AgentError::InvalidConfig("max tokens must be between 1 and 128000".into()));
        }

        if self.max_iterations < 1 {
            return Err(AgentError::InvalidConfig("max iterations must be at least 1".into()));
        }

        if self.max_execution_secs < 1 {
            return Err(AgentError::InvalidConfig("max execution time must be at least 1 second".into()));
        }

        if self.is_openai_endpoint() && self.openai_api_key.as_deref().is_none_or(str::is_empty) {
            return Err(AgentError::InvalidConfig(
                "an OpenAI API key is required when using the OpenAI endpoint; set SIPPY_AGENT_OPENAI_API_KEY or use a local endpoint".into(),
            ));
        }

        Ok(())
    }
}

impl Config {
    pub fn new(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("SIPPY_AGENT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }
}
