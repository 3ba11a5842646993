//! Per-turn record of tool calls, used to suppress exact repeats.

use std::collections::HashSet;

/// Trim and collapse runs of whitespace; nothing else.
pub fn normalize_input(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The `(tool, normalized input)` pairs already dispatched this turn.
#[derive(Debug, Default)]
pub struct CallHistory {
    calls: HashSet<(String, String)>,
}

impl CallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, tool: &str, input: &str) -> bool {
        self.calls.contains(&(tool.to_string(), normalize_input(input)))
    }

    pub fn record(&mut self, tool: &str, input: &str) {
        self.calls.insert((tool.to_string(), normalize_input(input)));
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
