use std::{ops::AddAssign, time::Duration};

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Action names that mark a failed parse rather than a dispatchable tool.
pub const ERROR_SENTINELS: [&str; 3] = ["_Exception", "Invalid", "Error"];

/// One thought / action / input / observation unit produced during a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

/// Token accounting gathered by observing each model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub call_count: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
        self.call_count += rhs.call_count;
    }
}

/// The budget that ended a turn early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Budget {
    Iterations { limit: usize },
    Time { limit: Duration },
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Budget::Iterations { limit } => write!(f, "iteration limit of {limit} steps"),
            Budget::Time { limit } => write!(f, "time limit of {}s", limit.as_secs()),
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnStatus {
    /// The model produced a final answer.
    Answered,
    /// A budget ran out; the answer is assembled from partial reasoning.
    BudgetExhausted { budget: Budget },
    /// The caller cancelled the turn.
    Cancelled,
    /// The language model could not be reached or answered garbage.
    Failed,
}

/// The response object every turn produces, whatever happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<Step>,
    pub tools_used: Vec<String>,
    pub token_usage: TokenUsage,
}

impl AgentResponse {
    /// Whether the model reached a final answer on its own.
    pub fn is_answered(&self) -> bool {
        self.status == TurnStatus::Answered
    }
}

/// Unique dispatched tool names, in first-use order, without the parse-error sentinels.
pub fn tools_used(steps: &[Step]) -> Vec<String> {
    let mut used: Vec<String> = Vec::new();

    for step in steps {
        let action = step.action.as_str();
        if action.is_empty() || ERROR_SENTINELS.contains(&action) || used.iter().any(|u| u == action) {
            continue;
        }
        used.push(action.to_string());
    }

    used
}

/// A previous user / assistant exchange carried into the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub user: String,
    pub assistant: String,
}

/// Render the last `limit` exchanges as the caller-supplied history string.
pub fn render_chat_history(exchanges: &[ChatExchange], limit: usize) -> String {
    let start = exchanges.len().saturating_sub(limit);

    exchanges[start..]
        .iter()
        .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}
