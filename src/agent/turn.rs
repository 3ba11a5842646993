//! The loop that drives one turn: prompt, parse, dispatch, repeat.

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::{
    PARSE_ERROR_ACTION,
    budget::{BudgetGuard, BudgetLimits},
    dispatcher::Dispatcher,
    history::CallHistory,
    parser::{self, DEFAULT_THOUGHT, Parsed},
    prompt::build_prompt,
    trace::TraceSink,
};
use crate::base::{
    error::AgentError,
    prompts::PARSE_ERROR_GUIDANCE,
    types::{AgentResponse, Budget, Err, Step, TokenUsage, TurnStatus, tools_used},
};
use crate::service::{llm::LlmClient, tools::ToolRegistry};

/// Shown when a turn is cancelled before the model answered.
pub const CANCELLED_ANSWER: &str = "The request was cancelled before an answer was reached.";

/// Everything a turn reads but does not own.
pub struct TurnContext<'a> {
    pub llm: &'a LlmClient,
    pub registry: &'a ToolRegistry,
    pub directive: &'a str,
    pub limits: BudgetLimits,
}

enum Outcome {
    Answered(String),
    Exhausted(Budget),
    Cancelled,
    Failed(Err),
}

/// Run one turn to completion.
///
/// This never fails; model errors, budgets, and cancellation all come back as an
/// [`AgentResponse`] with the matching status. Steps reach `sink` as they complete.
#[instrument(name = "turn::run", skip_all)]
pub async fn run(ctx: &TurnContext<'_>, input: &str, chat_history: &str, sink: &mut TraceSink, cancel: &CancellationToken) -> AgentResponse {
    let mut guard = BudgetGuard::start(ctx.limits);
    let mut history = CallHistory::new();
    let mut usage = TokenUsage::default();
    let dispatcher = Dispatcher::new(ctx.registry);

    info!("Starting turn with {} tools, limits {:?}", ctx.registry.len(), ctx.limits);

    let outcome = loop {
        if cancel.is_cancelled() {
            break Outcome::Cancelled;
        }
        if let Some(budget) = guard.exhausted() {
            break Outcome::Exhausted(budget);
        }

        let prompt = build_prompt(ctx.directive, ctx.registry, chat_history, input, sink.steps());

        let completion = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Outcome::Cancelled,
            result = timeout(guard.remaining(), ctx.llm.complete(&prompt)) => match result {
                Ok(Ok(completion)) => completion,
                Ok(Err(err)) => break Outcome::Failed(err),
                Err(_) => break Outcome::Exhausted(guard.time_budget()),
            },
        };

        usage += TokenUsage {
            call_count: 1,
            ..completion.usage.unwrap_or_default()
        };

        let step = match parser::parse(&completion.text) {
            Ok(Parsed::FinalAnswer { answer, .. }) => break Outcome::Answered(answer),
            Ok(Parsed::Action { thought, action, input: action_input }) => {
                guard.record_iteration();

                let observation = match timeout(guard.remaining(), dispatcher.dispatch(&action, &action_input, &mut history)).await {
                    Ok(observation) => observation,
                    Err(_) => break Outcome::Exhausted(guard.time_budget()),
                };

                // The tool ran to completion, but a cancelled turn does not act on it.
                if cancel.is_cancelled() {
                    break Outcome::Cancelled;
                }

                if !observation.is_success() {
                    info!("`{action}` gave a {:?} observation", observation.kind);
                }

                Step {
                    thought,
                    action,
                    action_input,
                    observation: observation.text,
                }
            }
            Err(err) => {
                guard.record_iteration();
                warn!("Could not parse model output: {err}");

                Step {
                    thought: DEFAULT_THOUGHT.to_string(),
                    action: PARSE_ERROR_ACTION.to_string(),
                    action_input: completion.text,
                    observation: PARSE_ERROR_GUIDANCE.to_string(),
                }
            }
        };

        sink.emit(step);
    };

    let steps = sink.drain();

    let (answer, status, error) = match outcome {
        Outcome::Answered(answer) => (answer, TurnStatus::Answered, None),
        Outcome::Exhausted(budget) => {
            warn!("Turn stopped by the {budget}");
            (budget_answer(budget, &steps), TurnStatus::BudgetExhausted { budget }, None)
        }
        Outcome::Cancelled => {
            info!("Turn cancelled");
            (CANCELLED_ANSWER.to_string(), TurnStatus::Cancelled, None)
        }
        Outcome::Failed(err) => {
            error!("Language model call failed: {err:#}");
            let message = format!("{err:#}");
            (
                format!("I encountered an error while processing your request: {message}"),
                TurnStatus::Failed,
                Some(AgentError::Model(message).to_string()),
            )
        }
    };

    info!(
        "Turn finished after {} steps, {} iterations and {} model calls: {status:?}",
        steps.len(),
        guard.iterations_used(),
        usage.call_count
    );

    AgentResponse {
        answer,
        status,
        error,
        tools_used: tools_used(&steps),
        steps,
        token_usage: usage,
    }
}

/// Best-effort answer when a budget runs out, built from the last real step.
pub fn budget_answer(budget: Budget, steps: &[Step]) -> String {
    let mut answer = format!("I was unable to reach a final answer within the {budget}.");

    if let Some(last) = steps.iter().rev().find(|s| s.action != PARSE_ERROR_ACTION) {
        answer += &format!("\n\nMy last reasoning was: {}\n\nThe last observation from `{}` was:\n{}", last.thought, last.action, last.observation);
    }

    answer
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_budget_answer_uses_last_real_step() {
        let steps = vec![
            Step {
                thought: "look up the job".into(),
                action: "get_prow_job_summary".into(),
                action_input: "1".into(),
                observation: "Overall Result: F".into(),
            },
            Step {
                thought: DEFAULT_THOUGHT.into(),
                action: PARSE_ERROR_ACTION.into(),
                action_input: "???".into(),
                observation: PARSE_ERROR_GUIDANCE.into(),
            },
        ];

        let answer = budget_answer(Budget::Iterations { limit: 2 }, &steps);

        assert_eq!(
            answer,
            "I was unable to reach a final answer within the iteration limit of 2 steps.\n\nMy last reasoning was: look up the job\n\nThe last observation from `get_prow_job_summary` was:\nOverall Result: F"
        );
    }

    #[test]
    fn test_budget_answer_without_steps() {
        assert_eq!(
            budget_answer(Budget::Time { limit: Duration::from_secs(30) }, &[]),
            "I was unable to reach a final answer within the time limit of 30s."
        );
    }
}
