//! Library root for `sippy-agent`.
//!
//! Sippy agent is a conversational assistant for triaging CI failures. A language model
//! reasons in the ReAct format and calls tools (job summaries, artifact searches, known
//! incident lookups) until it can answer:
//! - `agent` holds the orchestration loop and its parts
//! - `service` holds the language model and tool integrations
//! - `interaction` holds the terminal front end
//!
//! The model and every tool sit behind traits, so each can be swapped or mocked.

pub mod agent;
pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use interaction::cli::CliOptions;
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Installs the crypto provider, builds the runtime, and runs the terminal front end.
pub async fn start(config: Config, options: CliOptions) -> Void {
    info!("Starting sippy-agent ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start(options).await?;

    Ok(())
}
