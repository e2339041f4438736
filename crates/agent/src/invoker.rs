//! LLM invoker: one role, one call.
//!
//! Sends `(system instruction, user content)` to the configured provider and
//! returns the raw reply text. Each call is independent: no conversation
//! state is kept, and there are no retries at this layer. An elapsed
//! per-call timeout is reported as [`ProviderError::Timeout`].

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use zoogent_config::AppConfig;
use zoogent_core::error::{ProviderError, Result};
use zoogent_core::message::Message;
use zoogent_core::provider::{Provider, ProviderRequest};

use crate::extract::{Extracted, extract};
use crate::prompts::{AgentRole, OutputKind, PromptRegistry};

const DEFAULT_MODEL: &str = "apac.amazon.nova-micro-v1:0";

pub struct LlmInvoker {
    provider: Arc<dyn Provider>,
    prompts: Arc<PromptRegistry>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl LlmInvoker {
    pub fn new(provider: Arc<dyn Provider>, prompts: Arc<PromptRegistry>) -> Self {
        Self {
            provider,
            prompts,
            model: DEFAULT_MODEL.into(),
            temperature: 0.7,
            max_tokens: Some(1024),
            timeout: Duration::from_secs(20),
        }
    }

    /// Model, sampling and timeout settings from the loaded config. A
    /// per-provider `default_model` wins over the root one.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        prompts: Arc<PromptRegistry>,
        config: &AppConfig,
    ) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self {
            provider,
            prompts,
            model,
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            timeout: Duration::from_secs(config.pipeline.llm_timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `role` over `user_content` and return the raw reply.
    pub async fn invoke(
        &self,
        role: AgentRole,
        user_content: &str,
    ) -> std::result::Result<String, ProviderError> {
        let template = self.prompts.get(role);
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(template.system.clone()),
                Message::user(user_content),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_output: template.output == OutputKind::Json,
        };

        debug!(
            role = %role,
            provider = %self.provider.name(),
            model = %self.model,
            "Invoking agent"
        );

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(role = %role, error = %e, "Agent invocation failed");
                return Err(e);
            }
            Err(_) => {
                warn!(role = %role, timeout_secs = self.timeout.as_secs(), "Agent invocation timed out");
                return Err(ProviderError::Timeout(format!(
                    "{role} did not answer within {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if let Some(usage) = &response.usage {
            debug!(role = %role, total_tokens = usage.total_tokens, "Agent replied");
        }

        Ok(response.message.content)
    }

    /// Invoke and decode according to the role's declared output kind.
    pub async fn invoke_extracted(&self, role: AgentRole, user_content: &str) -> Result<Extracted> {
        let raw = self.invoke(role, user_content).await?;
        let kind = self.prompts.get(role).output;
        extract(kind, &raw).map_err(|e| {
            warn!(role = %role, kind = ?kind, error = %e, "Agent reply malformed");
            e.into()
        })
    }

    /// Reply of a text role.
    pub async fn invoke_text(&self, role: AgentRole, user_content: &str) -> Result<String> {
        Ok(self.invoke_extracted(role, user_content).await?.into_text()?)
    }

    /// Items of a list role.
    pub async fn invoke_list(&self, role: AgentRole, user_content: &str) -> Result<Vec<String>> {
        Ok(self.invoke_extracted(role, user_content).await?.into_list()?)
    }

    /// Object of a JSON role, decoded into `T`.
    pub async fn invoke_json<T: DeserializeOwned>(
        &self,
        role: AgentRole,
        user_content: &str,
    ) -> Result<T> {
        Ok(self.invoke_extracted(role, user_content).await?.decode()?)
    }
}
