//! Common imports for front ends built on the agent.

pub use crate::agent::{Agent, AgentStatus, trace::TraceSink};
pub use crate::base::{
    config::Config,
    types::{AgentResponse, Err, Res, Step, TurnStatus, Void},
};
pub use crate::service::{
    llm::LlmClient,
    tools::{Tool, ToolRegistry},
};
pub use tracing::{debug, error, info, instrument, warn};
