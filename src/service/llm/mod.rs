pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, TokenUsage};

// Types.

/// One model completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Not every OpenAI-compatible server reports usage.
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), usage: None }
    }
}

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// The loop only needs text in and text out. Implementations must stop generating at
/// `\nObservation:` so the model never writes its own observations.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Complete the full ReAct prompt.
    async fn complete(&self, prompt: &str) -> Res<Completion>;

    /// Model identifier, for status reporting.
    fn model_name(&self) -> &str;

    /// Endpoint the client talks to, for status reporting.
    fn endpoint(&self) -> &str;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: impl GenericLlmClient) -> Self {
        Self { inner: Arc::new(inner) }
    }
}
