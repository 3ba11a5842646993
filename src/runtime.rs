//! Runtime services and shared state for the agent.

use std::sync::Arc;

use tracing::instrument;

use crate::agent::Agent;
use crate::base::{
    config::Config,
    types::{Res, Void},
};
use crate::interaction::cli::{self, CliOptions};
use crate::service::{
    llm::LlmClient,
    tools::{ToolRegistry, default_registry},
};

/// Runtime service context that can be shared across the application.
///
/// This struct is trivially cloneable, allowing it to be passed around without the need
/// for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The agent, shared by every front end.
    pub agent: Arc<Agent>,
}

impl Runtime {
    /// Create a runtime backed by the configured OpenAI-compatible endpoint and the built-in tools.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        let llm = LlmClient::openai(&config);
        let registry = default_registry(&config)?;

        Ok(Self::with_parts(config, llm, registry))
    }

    /// Create a runtime from explicit parts.
    pub fn with_parts(config: Config, llm: LlmClient, registry: ToolRegistry) -> Self {
        let agent = Arc::new(Agent::new(config.clone(), llm.clone(), registry));

        Self { config, llm, agent }
    }

    pub async fn start(&self, options: CliOptions) -> Void {
        cli::run(self, options).await
    }
}
