//! OpenAI-compatible chat completions client.
//!
//! Works against OpenAI itself and any server that speaks the same API (Ollama, vLLM, ...).

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse, Stop},
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{Completion, GenericLlmClient, LlmClient};
use crate::base::{
    config::Config,
    types::{Res, TokenUsage},
};

/// Generation stops here so the model cannot invent tool output.
pub const STOP_SEQUENCE: &str = "\nObservation:";

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        if config.openai_api_key.as_deref().is_none_or(str::is_empty) && !config.is_local_endpoint() {
            warn!("No API key configured for remote endpoint {}", config.llm_endpoint);
        }

        // Local servers ignore the key, but the client insists on one.
        let api_key = config.openai_api_key.clone().filter(|k| !k.is_empty()).unwrap_or_else(|| "dummy-key".to_string());
        let cfg = OpenAIConfig::new().with_api_key(api_key).with_api_base(config.llm_endpoint.trim_end_matches('/'));

        info!("Using model `{}` at {}", config.model_name, config.llm_endpoint);

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    fn build_request(&self, prompt: &str) -> Res<CreateChatCompletionRequest> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default().content(prompt).build()?.into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model_name)
            .messages(vec![message])
            .temperature(self.config.temperature)
            .max_completion_tokens(self.config.llm_max_tokens)
            .stop(Stop::StringArray(vec![STOP_SEQUENCE.to_string()]))
            .build()?;

        Ok(request)
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request: CreateChatCompletionRequest) -> Res<CreateChatCompletionResponse> {
        const RETRY_DELAY_MS: u64 = 1000;

        let max_retries = self.config.llm_max_retries;
        let per_call = Duration::from_secs(self.config.llm_timeout_secs);
        let mut retries = 0;

        loop {
            let result = timeout(per_call, self.client.chat().create(request.clone())).await;

            match result {
                Ok(Ok(response)) => {
                    debug!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= max_retries {
                        return Err(anyhow::anyhow!("LLM call failed after {} attempts: {err}", retries + 1));
                    }
                    retries += 1;
                    warn!("LLM call failed, retrying {retries}/{max_retries}: {err}");
                }
                Err(_) => {
                    if retries >= max_retries {
                        return Err(anyhow::anyhow!("LLM call timed out after {}s", self.config.llm_timeout_secs));
                    }
                    retries += 1;
                    warn!("LLM call timed out, retrying {retries}/{max_retries}");
                }
            }

            let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
            tokio::time::sleep(delay).await;
        }
    }
}

fn to_token_usage(usage: &CompletionUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        call_count: 1,
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::complete", skip_all)]
    async fn complete(&self, prompt: &str) -> Res<Completion> {
        let request = self.build_request(prompt)?;
        let response = self.call_openai_api(request).await?;

        let text = response.choices.first().and_then(|choice| choice.message.content.clone()).unwrap_or_default();
        let usage = response.usage.as_ref().map(to_token_usage);

        debug!("Completion of {} chars, usage {:?}", text.len(), usage);

        Ok(Completion { text, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn endpoint(&self) -> &str {
        &self.config.llm_endpoint
    }
}
