//! The agent host and its orchestration core.

pub mod budget;
pub mod dispatcher;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod trace;
pub mod turn;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc::UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    error::AgentError,
    types::{AgentResponse, Step},
};
use crate::service::{
    llm::LlmClient,
    tools::{Tool, ToolRegistry},
};
use trace::TraceSink;
use turn::TurnContext;

/// Action recorded on the step that carries a parse failure.
pub const PARSE_ERROR_ACTION: &str = "_Exception";

/// What the agent is running with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub model_name: String,
    pub endpoint: String,
    pub tools: Vec<String>,
    pub max_iterations: usize,
    pub max_execution_secs: u64,
}

/// Hosts the loop: owns the model client and the current tool registry snapshot.
///
/// Turns read an `Arc` snapshot of the registry taken when they start, so adding tools or
/// rebuilding never disturbs a turn in flight. Concurrent turns share nothing else.
pub struct Agent {
    config: Config,
    llm: LlmClient,
    registry: RwLock<Arc<ToolRegistry>>,
}

impl Agent {
    pub fn new(config: Config, llm: LlmClient, registry: ToolRegistry) -> Self {
        Self {
            config,
            llm,
            registry: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry new turns will use.
    pub async fn snapshot(&self) -> Arc<ToolRegistry> {
        self.registry.read().await.clone()
    }

    /// Run a turn and return the full response once it is done.
    pub async fn chat(&self, input: &str, chat_history: &str) -> AgentResponse {
        self.run_turn(input, chat_history, &mut TraceSink::buffered(), &CancellationToken::new()).await
    }

    /// Run a turn, sending each step down `tx` as soon as it completes.
    pub async fn chat_streaming(&self, input: &str, chat_history: &str, tx: UnboundedSender<Step>, cancel: &CancellationToken) -> AgentResponse {
        self.run_turn(input, chat_history, &mut TraceSink::streaming(tx), cancel).await
    }

    /// Run a turn, handing each step to `callback` as soon as it completes.
    pub async fn chat_with_callback(&self, input: &str, chat_history: &str, callback: impl FnMut(&Step) + Send + 'static) -> AgentResponse {
        self.run_turn(input, chat_history, &mut TraceSink::with_callback(callback), &CancellationToken::new()).await
    }

    #[instrument(name = "Agent::run_turn", skip_all)]
    pub async fn run_turn(&self, input: &str, chat_history: &str, sink: &mut TraceSink, cancel: &CancellationToken) -> AgentResponse {
        let registry = self.snapshot().await;

        let ctx = TurnContext {
            llm: &self.llm,
            registry: &registry,
            directive: &self.config.system_directive,
            limits: self.config.budget_limits(),
        };

        turn::run(&ctx, input, chat_history, sink, cancel).await
    }

    /// Register another tool for subsequent turns.
    pub async fn add_tool(&self, tool: Tool) -> Result<(), AgentError> {
        let mut current = self.registry.write().await;

        let mut next = ToolRegistry::clone(&current);
        next.register(tool)?;

        info!("Added tool; now {} tools: {:?}", next.len(), next.names());
        *current = Arc::new(next);

        Ok(())
    }

    /// Swap in a whole new registry for subsequent turns.
    pub async fn rebuild(&self, registry: ToolRegistry) {
        info!("Rebuilding with {} tools", registry.len());
        *self.registry.write().await = Arc::new(registry);
    }

    pub async fn list_tools(&self) -> Vec<String> {
        self.snapshot().await.names()
    }

    pub async fn status(&self) -> AgentStatus {
        AgentStatus {
            model_name: self.llm.model_name().to_string(),
            endpoint: self.llm.endpoint().to_string(),
            tools: self.list_tools().await,
            max_iterations: self.config.max_iterations,
            max_execution_secs: self.config.max_execution_secs,
        }
    }
}
