//! Parses the model's ReAct-formatted completion into an action or a final answer.
//!
//! Precedence is fixed: a `Final Answer:` marker anywhere wins over any `Action:` block, and
//! the last such marker is used. Otherwise the first `Action:` / `Action Input:` pair is used
//! and anything after it is treated as hallucinated continuation.

use thiserror::Error;

use crate::base::types::ERROR_SENTINELS;

const THOUGHT: &str = "Thought:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";
const FINAL_ANSWER: &str = "Final Answer:";

/// Shown in the trace when the model gave no usable thought.
pub const DEFAULT_THOUGHT: &str = "Processing...";

/// A successfully parsed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Action { thought: String, action: String, input: String },
    FinalAnswer { thought: Option<String>, answer: String },
}

/// Why a completion could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no `Action:` or `Final Answer:` found")]
    NoDirective,
    #[error("`Action:` has no tool name")]
    EmptyAction,
    #[error("`Action: {0}` is not followed by `Action Input:`")]
    MissingActionInput(String),
    #[error("`{0}` is not a dispatchable action")]
    Sentinel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    Observation,
}

#[derive(Debug)]
struct Segment {
    marker: Option<Marker>,
    body: String,
}

/// Parse one completion.
pub fn parse(text: &str) -> Result<Parsed, ParseError> {
    if let Some(pos) = text.rfind(FINAL_ANSWER) {
        let answer = text[pos + FINAL_ANSWER.len()..].trim().to_string();
        let thought = segments(&text[..pos]).into_iter().rev().find(|s| s.marker == Some(Marker::Thought)).map(|s| s.body.trim().to_string()).filter(|t| !t.is_empty());

        return Ok(Parsed::FinalAnswer { thought, answer });
    }

    let segments = segments(text);
    let action_at = segments.iter().position(|s| s.marker == Some(Marker::Action)).ok_or(ParseError::NoDirective)?;

    let action = segments[action_at].body.trim().to_string();
    if action.is_empty() {
        return Err(ParseError::EmptyAction);
    }
    if ERROR_SENTINELS.contains(&action.as_str()) {
        return Err(ParseError::Sentinel(action));
    }

    let input = match segments.get(action_at + 1) {
        Some(Segment { marker: Some(Marker::ActionInput), body }) => unquote(body.trim()).to_string(),
        _ => return Err(ParseError::MissingActionInput(action)),
    };

    let thought = segments[..action_at]
        .iter()
        .rev()
        .find(|s| matches!(s.marker, Some(Marker::Thought) | None))
        .map(|s| s.body.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_THOUGHT)
        .to_string();

    Ok(Parsed::Action { thought, action, input })
}

/// Split text at markers that open a line.
fn segments(text: &str) -> Vec<Segment> {
    let mut out = vec![Segment { marker: None, body: String::new() }];

    for line in text.lines() {
        let trimmed = line.trim_start();

        match line_marker(trimmed) {
            Some((Marker::Action, rest)) => match rest.find(ACTION_INPUT) {
                // `Action: x Action Input: y` on one line.
                Some(split) => {
                    out.push(Segment { marker: Some(Marker::Action), body: rest[..split].to_string() });
                    out.push(Segment { marker: Some(Marker::ActionInput), body: rest[split + ACTION_INPUT.len()..].to_string() });
                }
                None => out.push(Segment { marker: Some(Marker::Action), body: rest.to_string() }),
            },
            Some((marker, rest)) => out.push(Segment { marker: Some(marker), body: rest.to_string() }),
            None => {
                if let Some(current) = out.last_mut() {
                    if !current.body.is_empty() {
                        current.body.push('\n');
                    }
                    current.body.push_str(line);
                }
            }
        }
    }

    out
}

fn line_marker(line: &str) -> Option<(Marker, &str)> {
    // `Action Input:` must be tried before `Action:`.
    [(ACTION_INPUT, Marker::ActionInput), (ACTION, Marker::Action), (THOUGHT, Marker::Thought), (OBSERVATION, Marker::Observation)]
        .into_iter()
        .find_map(|(prefix, marker)| line.strip_prefix(prefix).map(|rest| (marker, rest)))
}

/// Strip one pair of wrapping double quotes from a plain string input.
fn unquote(input: &str) -> &str {
    match input.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if !inner.contains('"') => inner,
        _ => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(thought: &str, action: &str, input: &str) -> Parsed {
        Parsed::Action {
            thought: thought.into(),
            action: action.into(),
            input: input.into(),
        }
    }

    #[test]
    fn test_parse_action() {
        let parsed = parse("Thought: t\nAction: echo\nAction Input: hi").unwrap();

        assert_eq!(parsed, action("t", "echo", "hi"));
    }

    #[test]
    fn test_parse_final_answer() {
        let parsed = parse("Thought: Do I need to use a tool? No\nFinal Answer:   The job failed on install.  \n").unwrap();

        assert_eq!(
            parsed,
            Parsed::FinalAnswer {
                thought: Some("Do I need to use a tool? No".into()),
                answer: "The job failed on install.".into()
            }
        );
    }

    #[test]
    fn test_final_answer_without_thought() {
        assert_eq!(parse("Final Answer: done").unwrap(), Parsed::FinalAnswer { thought: None, answer: "done".into() });
    }

    #[test]
    fn test_final_answer_keeps_multiline_text() {
        let parsed = parse("Final Answer: line one\n\nAction: not a directive\nline three").unwrap();

        assert_eq!(
            parsed,
            Parsed::FinalAnswer {
                thought: None,
                answer: "line one\n\nAction: not a directive\nline three".into()
            }
        );
    }

    #[test]
    fn test_final_answer_wins_over_earlier_action() {
        let parsed = parse("Thought: t\nAction: echo\nAction Input: hi\nThought: never mind\nFinal Answer: done").unwrap();

        assert_eq!(
            parsed,
            Parsed::FinalAnswer {
                thought: Some("never mind".into()),
                answer: "done".into()
            }
        );
    }

    #[test]
    fn test_last_final_answer_is_used() {
        let parsed = parse("Final Answer: first\nFinal Answer: second").unwrap();

        assert!(matches!(parsed, Parsed::FinalAnswer { answer, .. } if answer == "second"));
    }

    #[test]
    fn test_first_action_block_is_used() {
        let parsed = parse("Thought: a\nAction: echo\nAction Input: one\nObservation: made up\nThought: b\nAction: other\nAction Input: two").unwrap();

        assert_eq!(parsed, action("a", "echo", "one"));
    }

    #[test]
    fn test_action_input_spans_lines_until_next_marker() {
        let parsed = parse("Thought: t\nAction: analyze_job_logs\nAction Input: {\n  \"prow_job_run_id\": \"1\"\n}\nObservation:").unwrap();

        assert_eq!(parsed, action("t", "analyze_job_logs", "{\n  \"prow_job_run_id\": \"1\"\n}"));
    }

    #[test]
    fn test_action_and_input_on_one_line() {
        assert_eq!(parse("Action: echo Action Input: hi").unwrap(), action(DEFAULT_THOUGHT, "echo", "hi"));
    }

    #[test]
    fn test_untagged_preamble_is_the_thought() {
        assert_eq!(parse("I should echo.\nAction: echo\nAction Input: hi").unwrap(), action("I should echo.", "echo", "hi"));
    }

    #[test]
    fn test_empty_thought_defaults() {
        assert_eq!(parse("Thought:\nAction: echo\nAction Input: hi").unwrap(), action(DEFAULT_THOUGHT, "echo", "hi"));
    }

    #[test]
    fn test_input_quotes_are_stripped() {
        assert_eq!(parse("Action: echo\nAction Input: \"hi\"").unwrap(), action(DEFAULT_THOUGHT, "echo", "hi"));
        assert_eq!(parse("Action: echo\nAction Input: {\"a\": \"b\"}").unwrap(), action(DEFAULT_THOUGHT, "echo", "{\"a\": \"b\"}"));
    }

    #[test]
    fn test_markers_must_open_a_line() {
        assert_eq!(parse("I will take Action: echo later"), Err(ParseError::NoDirective));
    }

    #[test]
    fn test_malformed_text_is_a_parse_error() {
        assert_eq!(parse("I think the job failed because of networking."), Err(ParseError::NoDirective));
        assert_eq!(parse(""), Err(ParseError::NoDirective));
    }

    #[test]
    fn test_action_without_input_is_a_parse_error() {
        assert_eq!(parse("Thought: t\nAction: echo"), Err(ParseError::MissingActionInput("echo".into())));
        assert_eq!(parse("Action: echo\nThought: hmm\nAction Input: hi"), Err(ParseError::MissingActionInput("echo".into())));
    }

    #[test]
    fn test_empty_action_is_a_parse_error() {
        assert_eq!(parse("Action:   \nAction Input: hi"), Err(ParseError::EmptyAction));
    }

    #[test]
    fn test_sentinels_are_parse_errors() {
        for sentinel in ERROR_SENTINELS {
            assert_eq!(parse(&format!("Action: {sentinel}\nAction Input: x")), Err(ParseError::Sentinel(sentinel.into())));
        }
    }

    #[test]
    fn test_unknown_tool_names_are_left_to_the_dispatcher() {
        assert_eq!(parse("Action: unknown_tool\nAction Input: x").unwrap(), action(DEFAULT_THOUGHT, "unknown_tool", "x"));
    }
}
