//! Assembles the full prompt sent to the model on each iteration.

use crate::base::{prompts::REACT_FORMAT_INSTRUCTIONS, types::Step};
use crate::service::tools::ToolRegistry;

/// One line per tool: `name: description, args: {...}`.
pub fn tool_catalogue(registry: &ToolRegistry) -> String {
    registry
        .list()
        .iter()
        .map(|t| format!("{}: {}, args: {}", t.name(), t.description(), t.input_schema().describe()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn tool_names(registry: &ToolRegistry) -> String {
    registry.names().join(", ")
}

/// Prior steps rendered in the same grammar the model writes, ending with a fresh `Thought:`.
pub fn scratchpad(steps: &[Step]) -> String {
    let mut out = String::new();

    for step in steps {
        if step.action == super::PARSE_ERROR_ACTION {
            // The raw completion is kept verbatim so the model can see what it got wrong.
            out += &format!("{}\nObservation: {}\n", step.action_input, step.observation);
            continue;
        }

        out += &format!("Thought: {}\nAction: {}\nAction Input: {}\nObservation: {}\n", step.thought, step.action, step.action_input, step.observation);
    }

    if !steps.is_empty() {
        out += "Thought:";
    }

    out
}

/// The whole prompt for one model call.
pub fn build_prompt(directive: &str, registry: &ToolRegistry, chat_history: &str, input: &str, steps: &[Step]) -> String {
    let format = REACT_FORMAT_INSTRUCTIONS.replace("{tools}", &tool_catalogue(registry)).replace("{tool_names}", &tool_names(registry));

    format!("{directive}\n\n{format}\n\nPrevious conversation history:\n{chat_history}\n\nNew input: {input}\n{}", scratchpad(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tools::{Tool, example::EchoTool, example::JobAnalysisTool};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(EchoTool::new())).unwrap();
        registry.register(Tool::new(JobAnalysisTool::new())).unwrap();
        registry
    }

    #[test]
    fn test_catalogue_and_names() {
        let registry = registry();

        assert_eq!(tool_names(&registry), "example_tool, analyze_job");
        assert!(tool_catalogue(&registry).starts_with("example_tool: An example tool that echoes back the input, args: {\"message\" (required): Message to echo back}\n"));
    }

    #[test]
    fn test_scratchpad_renders_steps_in_order() {
        let steps = vec![
            Step {
                thought: "t".into(),
                action: "example_tool".into(),
                action_input: "hi".into(),
                observation: "Echo: hi".into(),
            },
            Step {
                thought: String::new(),
                action: super::super::PARSE_ERROR_ACTION.into(),
                action_input: "gibberish".into(),
                observation: "Invalid format.".into(),
            },
        ];

        assert_eq!(
            scratchpad(&steps),
            "Thought: t\nAction: example_tool\nAction Input: hi\nObservation: Echo: hi\ngibberish\nObservation: Invalid format.\nThought:"
        );
        assert_eq!(scratchpad(&[]), "");
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("Be helpful.", &registry(), "User: a\nAssistant: b", "Why did job 1 fail?", &[]);

        assert!(prompt.starts_with("Be helpful.\n\nTOOLS:"));
        assert!(prompt.contains("should be one of [example_tool, analyze_job]"));
        assert!(!prompt.contains("{tools}"));
        assert!(prompt.ends_with("Previous conversation history:\nUser: a\nAssistant: b\n\nNew input: Why did job 1 fail?\n"));
    }
}
