//! Turns a parsed action into an observation. Never fails: every problem becomes text.

use std::{any::Any, panic::AssertUnwindSafe};

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use super::history::CallHistory;
use crate::base::prompts::DUPLICATE_CALL_GUIDANCE;
use crate::service::tools::ToolRegistry;

/// How a dispatch went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationKind {
    Success,
    Suppressed,
    ToolNotFound,
    SchemaViolation,
    ExecutionFailed,
}

/// Text fed back to the model after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub kind: ObservationKind,
    pub text: String,
}

impl Observation {
    fn new(kind: ObservationKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ObservationKind::Success
    }
}

/// Dispatches actions against one registry snapshot.
pub struct Dispatcher<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Run `action` with `raw_input`, unless it already ran with the same input this turn.
    ///
    /// Every call that reaches a registered tool is recorded, whether or not it succeeds.
    #[instrument(name = "Dispatcher::dispatch", skip(self, raw_input, history))]
    pub async fn dispatch(&self, action: &str, raw_input: &str, history: &mut CallHistory) -> Observation {
        if history.seen(action, raw_input) {
            info!("Suppressing repeated call to `{action}`");
            return Observation::new(ObservationKind::Suppressed, DUPLICATE_CALL_GUIDANCE);
        }

        let tool = match self.registry.lookup(action) {
            Ok(tool) => tool,
            Err(err) => {
                warn!("{err}");
                return Observation::new(ObservationKind::ToolNotFound, err.to_string());
            }
        };

        history.record(action, raw_input);

        let input = match tool.input_schema().coerce(action, raw_input) {
            Ok(input) => input,
            Err(err) => {
                warn!("{err}");
                return Observation::new(ObservationKind::SchemaViolation, format!("Error: {err}"));
            }
        };

        match AssertUnwindSafe(tool.execute(&input)).catch_unwind().await {
            Ok(Ok(text)) => {
                debug!("`{action}` returned {} chars", text.len());
                Observation::new(ObservationKind::Success, text)
            }
            Ok(Err(err)) => {
                warn!("`{action}` failed: {err:#}");
                Observation::new(ObservationKind::ExecutionFailed, format!("Error: {err:#}"))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("`{action}` panicked: {message}");
                Observation::new(ObservationKind::ExecutionFailed, format!("Error: `{action}` crashed: {message}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
