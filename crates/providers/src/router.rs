//! Provider selection from configuration.

use std::sync::Arc;
use tracing::info;
use zoogent_config::AppConfig;
use zoogent_core::error::ProviderError;
use zoogent_core::provider::Provider;

use crate::bedrock::BedrockProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the default provider described by `config`.
///
/// A per-provider `[providers.<name>]` section overrides the root API key and
/// supplies the URL/region. Local endpoints (ollama, vllm, llama.cpp) need no
/// key; every other provider fails with `NotConfigured` when none is set.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let api_url = provider_config.and_then(|p| p.api_url.clone());

    let provider: Arc<dyn Provider> = match name {
        "bedrock" => {
            let key = api_key.ok_or_else(|| missing_key(name))?;
            let region = provider_config.and_then(|p| p.region.as_deref());
            let mut p = BedrockProvider::new(key, region);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        _ => {
            let key = match api_key {
                Some(key) => key,
                None if is_local(name) => name.to_string(),
                None => return Err(missing_key(name)),
            };
            let base_url = api_url
                .or_else(|| default_base_url(name).map(String::from))
                .ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "Unknown provider '{name}': set [providers.{name}] api_url to use it"
                    ))
                })?;
            Arc::new(OpenAiCompatProvider::new(name, base_url, key))
        }
    };

    info!(provider = %name, model = %config.default_model, "Provider configured");
    Ok(provider)
}

fn missing_key(name: &str) -> ProviderError {
    ProviderError::NotConfigured(format!("No API key configured for provider '{name}'"))
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Chat-completions base URL for the OpenAI-compatible names we know.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    Some(match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoogent_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("anthropic").is_none());
    }

    #[test]
    fn unknown_provider_without_url_is_not_configured() {
        let config = AppConfig {
            default_provider: "anthropic".into(),
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(msg) if msg.contains("anthropic")));
    }

    #[test]
    fn unknown_provider_with_url_is_openai_compatible() {
        let mut config = AppConfig {
            default_provider: "my-gateway".into(),
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "my-gateway".into(),
            ProviderConfig {
                api_url: Some("https://llm.internal/v1".into()),
                ..ProviderConfig::default()
            },
        );
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "my-gateway");
    }

    #[test]
    fn bedrock_requires_key() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn bedrock_from_root_key() {
        let config = AppConfig {
            api_key: Some("token".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "bedrock");
    }

    #[test]
    fn per_provider_section_overrides() {
        let mut config = AppConfig {
            default_provider: "openai".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-test".into()),
                ..ProviderConfig::default()
            },
        );
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
