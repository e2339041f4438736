//! LLM Provider implementations for ZooGent.
//!
//! All providers implement the `zoogent_core::Provider` trait.
//! [`router::build_from_config`] selects the configured backend.

pub mod bedrock;
pub mod openai_compat;
pub mod router;

pub use bedrock::BedrockProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
