//! Sub-call invoker
//!
//! Bridges `llm_query` calls from the execution environment to the sub
//! model. Each invocation is one flat request/response call charged to the
//! sub class of the ledger; there is no nested agent loop.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::agent::ledger::CostLedger;
use crate::core::{CallClass, Message, Result};
use crate::llm::{pricing, GenerateOptions, LlmProvider};
use crate::repl::SubModelHandler;

pub struct SubModelInvoker {
    provider: Arc<dyn LlmProvider>,
    model: String,
    ledger: Arc<Mutex<CostLedger>>,
    options: GenerateOptions,
}

impl SubModelInvoker {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        ledger: Arc<Mutex<CostLedger>>,
        options: GenerateOptions,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            ledger,
            options,
        }
    }
}

#[async_trait]
impl SubModelHandler for SubModelInvoker {
    async fn query(&self, prompt: &str) -> Result<String> {
        let messages = vec![Message::user(prompt)];
        let response = self
            .provider
            .chat(&self.model, &messages, Some(self.options.clone()))
            .await?;

        let record = pricing::cost_of_call(&self.model, &messages, &response);
        self.ledger.lock().await.record(CallClass::Sub, &record);

        Ok(response.content)
    }
}
