//! Interactive terminal front end.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::base::types::{ChatExchange, render_chat_history};
use crate::prelude::*;
use crate::runtime::Runtime;

const HELP: &str = "\
Sippy AI Agent commands:

  help      Show this help message
  tools     List available tools
  history   Show chat history
  clear     Clear chat history
  quit      Exit the application
  exit      Exit the application

Example queries:
  Analyze job 1934795512955801600 for failures
  Are there any known incidents about registry timeouts?";

/// How the front end presents turns.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Print each step as it completes.
    pub show_thinking: bool,
    /// Print the structured response as JSON instead of the answer text.
    pub json: bool,
    /// Answer this one question and exit.
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Tools,
    History,
    Clear,
    Quit,
    Empty,
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => Self::Empty,
            "help" => Self::Help,
            "tools" => Self::Tools,
            "history" => Self::History,
            "clear" => Self::Clear,
            "quit" | "exit" => Self::Quit,
            _ => Self::Ask(line.to_string()),
        }
    }
}

/// Exchanges of this session; the most recent few ride along with each turn.
#[derive(Debug, Default)]
pub struct ChatSession {
    exchanges: Vec<ChatExchange>,
    carried: usize,
}

impl ChatSession {
    pub fn new(carried: usize) -> Self {
        Self { exchanges: Vec::new(), carried }
    }

    pub fn context(&self) -> String {
        render_chat_history(&self.exchanges, self.carried)
    }

    /// Remember a finished turn. Cancelled turns are not part of the conversation.
    pub fn record(&mut self, user: &str, response: &AgentResponse) {
        if response.status == TurnStatus::Cancelled {
            return;
        }

        self.exchanges.push(ChatExchange {
            user: user.to_string(),
            assistant: response.answer.clone(),
        });
    }

    pub fn exchanges(&self) -> &[ChatExchange] {
        &self.exchanges
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

/// Run the front end until the user quits or stdin closes.
#[instrument(name = "cli::run", skip_all)]
pub async fn run(runtime: &Runtime, options: CliOptions) -> Void {
    let mut session = ChatSession::new(runtime.config.chat_history_exchanges);

    if let Some(query) = options.query.as_deref() {
        ask(runtime, &mut session, query, &options).await?;
        return Ok(());
    }

    print_welcome(runtime).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        // Once a turn has listened for Ctrl-C the default handler is gone, so the prompt listens too.
        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!("\nGoodbye!");
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Help => println!("{HELP}\n"),
            Command::Tools => {
                for tool in runtime.agent.list_tools().await {
                    println!("  - {tool}");
                }
                println!();
            }
            Command::History => print_history(&session),
            Command::Clear => {
                session.clear();
                println!("Chat history cleared.\n");
            }
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Ask(input) => {
                // A failed turn is already reported to the user; keep the session alive.
                if let Err(err) = ask(runtime, &mut session, &input, &options).await {
                    error!("Failed to process input: {err:#}");
                    println!("Error: {err:#}\n");
                }
            }
        }
    }

    Ok(())
}

/// The next line of input, or `None` once input ends or `interrupt` fires.
async fn next_input<R, I>(lines: &mut Lines<R>, interrupt: I) -> Res<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = interrupt => Ok(None),
    }
}

/// Run one turn, streaming steps and honouring Ctrl-C.
async fn ask(runtime: &Runtime, session: &mut ChatSession, input: &str, options: &CliOptions) -> Void {
    let context = session.context();
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Step>();

    let turn = runtime.agent.chat_streaming(input, &context, tx, &cancel);
    tokio::pin!(turn);

    let response = loop {
        tokio::select! {
            response = &mut turn => break response,
            Some(step) = rx.recv() => {
                if options.show_thinking {
                    print_step(&step);
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                println!("\nCancelling...");
                cancel.cancel();
            }
        }
    };

    while let Ok(step) = rx.try_recv() {
        if options.show_thinking {
            print_step(&step);
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    session.record(input, &response);

    Ok(())
}

async fn print_welcome(runtime: &Runtime) {
    let status = runtime.agent.status().await;

    println!("Sippy AI Agent - Your CI/CD Analysis Assistant");
    println!("Model: {} ({})", status.model_name, status.endpoint);
    println!("Available tools: {}", status.tools.join(", "));
    println!("Type 'help' for commands, 'quit' or 'exit' to leave\n");
}

fn print_history(session: &ChatSession) {
    if session.exchanges().is_empty() {
        println!("No chat history yet.\n");
        return;
    }

    for (i, exchange) in session.exchanges().iter().enumerate() {
        println!("{}. User: {}\n   Agent: {}\n", i + 1, exchange.user, exchange.assistant);
    }
}

fn print_step(step: &Step) {
    println!("Thought: {}", step.thought);
    println!("Action: {}", step.action);
    println!("Action Input: {}", step.action_input);
    println!("Observation: {}\n", step.observation);
}

fn print_response(response: &AgentResponse) {
    match response.status {
        TurnStatus::Answered | TurnStatus::Cancelled => {}
        TurnStatus::BudgetExhausted { budget } => println!("[stopped: {budget}]"),
        TurnStatus::Failed => println!("[failed]"),
    }

    println!("\nSippy AI:\n{}\n", response.answer);

    if !response.tools_used.is_empty() {
        println!("Tools used: {}", response.tools_used.join(", "));
    }
    if response.token_usage.total_tokens > 0 {
        let usage = &response.token_usage;
        println!("Tokens: {} prompt + {} completion = {} over {} calls", usage.prompt_tokens, usage.completion_tokens, usage.total_tokens, usage.call_count);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    use crate::base::types::TokenUsage;

    fn response(answer: &str, status: TurnStatus) -> AgentResponse {
        AgentResponse {
            answer: answer.into(),
            status,
            error: None,
            steps: Vec::new(),
            tools_used: Vec::new(),
            token_usage: TokenUsage::default(),
        }
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("  HELP "), Command::Help);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(Command::parse(" Analyze job 1 "), Command::Ask("Analyze job 1".into()));
    }

    #[tokio::test]
    async fn test_interrupt_ends_input_at_the_prompt() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        assert_eq!(next_input(&mut lines, std::future::ready(())).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_input_reads_a_line() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"tools\n").await.unwrap();

        assert_eq!(next_input(&mut lines, std::future::pending::<()>()).await.unwrap().as_deref(), Some("tools"));
    }

    #[test]
    fn test_session_carries_recent_exchanges() {
        let mut session = ChatSession::new(2);

        session.record("a", &response("1", TurnStatus::Answered));
        session.record("b", &response("2", TurnStatus::Failed));
        session.record("c", &response("3", TurnStatus::Answered));
        session.record("d", &response("4", TurnStatus::Cancelled));

        assert_eq!(session.exchanges().len(), 3);
        assert_eq!(session.context(), "User: b\nAssistant: 2\nUser: c\nAssistant: 3");

        session.clear();
        assert_eq!(session.context(), "");
    }
}
