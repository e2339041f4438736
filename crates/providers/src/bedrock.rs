//! AWS Bedrock provider using the Converse API.
//!
//! Features:
//! - Bearer token authentication (`AWS_BEARER_TOKEN_BEDROCK` style API keys)
//! - Regional endpoint `bedrock-runtime.<region>.amazonaws.com`
//! - System prompt as the top-level `system` field
//! - Inference profile IDs and ARNs as model identifiers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zoogent_core::error::ProviderError;
use zoogent_core::message::{Message, Role};
use zoogent_core::provider::*;

const DEFAULT_REGION: &str = "ap-southeast-1";

/// Bedrock Converse API provider.
pub struct BedrockProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl BedrockProvider {
    /// Create a provider for the given region (defaults to Singapore).
    pub fn new(api_key: impl Into<String>, region: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        let region = region.unwrap_or(DEFAULT_REGION);

        Self {
            name: "bedrock".into(),
            base_url: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or VPC endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model IDs may be ARNs containing `/` and `:`; both must be escaped in
    /// the URL path.
    fn encode_model_id(model: &str) -> String {
        model.replace(':', "%3A").replace('/', "%2F")
    }

    /// Split system messages out; Bedrock takes them as a top-level field.
    fn extract_system(messages: &[Message]) -> (Vec<SystemBlock>, Vec<&Message>) {
        let mut system = Vec::new();
        let mut rest = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system.push(SystemBlock {
                    text: msg.content.clone(),
                }),
                _ => rest.push(msg),
            }
        }

        (system, rest)
    }

    fn to_api_messages(messages: &[&Message]) -> Vec<ConverseMessage> {
        messages
            .iter()
            .map(|m| ConverseMessage {
                role: match m.role {
                    Role::Assistant => "assistant".into(),
                    _ => "user".into(),
                },
                content: vec![ContentBlock {
                    text: m.content.clone(),
                }],
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> ConverseRequest {
        let (system, rest) = Self::extract_system(&request.messages);
        ConverseRequest {
            system,
            messages: Self::to_api_messages(&rest),
            inference_config: InferenceConfig {
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }

    fn output_text(response: ConverseResponse) -> Option<String> {
        let text: Vec<String> = response
            .output
            .message?
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join(""))
        }
    }
}

#[async_trait]
impl zoogent_core::Provider for BedrockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!(
            "{}/model/{}/converse",
            self.base_url,
            Self::encode_model_id(&request.model)
        );
        let body = Self::build_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending converse request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Bedrock API key or missing model access".into(),
            ));
        }

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Bedrock returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ConverseResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let usage = api_response.usage.as_ref().map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.total_tokens,
        });

        let text = Self::output_text(api_response).ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "No text content in converse output".into(),
        })?;

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage,
            model: request.model,
        })
    }
}

// --- Converse API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock>,
    messages: Vec<ConverseMessage>,
    inference_config: InferenceConfig,
}

#[derive(Debug, Serialize)]
struct SystemBlock {
    text: String,
}

#[derive(Debug, Serialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct ContentBlock {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    usage: Option<ConverseUsage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    #[serde(default)]
    message: Option<ConverseOutputMessage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutputMessage {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

#[derive(Debug, Deserialize)]
struct OutputBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
}
