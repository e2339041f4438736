//! # ZooGent Core
//!
//! Domain types, traits, and error definitions for the ZooGent shopping
//! assistant. This crate has **zero framework dependencies**. It defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Both external capabilities the pipeline consumes are traits here:
//! - [`Provider`]: a hosted text-generation model
//! - [`SearchBackend`]: a web search API with site restriction
//!
//! Implementations live in `zoogent-providers` and `zoogent-search`, so the
//! orchestrator can be exercised end-to-end with scripted mocks.

pub mod error;
pub mod message;
pub mod product;
pub mod provider;
pub mod request;
pub mod search;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MalformedOutputError, ProviderError, Result, SearchError};
pub use message::{Message, Role};
pub use product::{CandidateSet, SearchResultItem, normalize_title};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use request::{UserRequest, UserType};
pub use search::{RawSearchHit, SearchBackend};
