//! SearchBackend trait: the abstraction over web search APIs.
//!
//! A backend runs one query restricted to one site and returns raw hits.
//! Mapping hits into [`SearchResultItem`](crate::product::SearchResultItem)s
//! and deduplicating them is the job of the domain-scoped search layer.

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single hit as returned by a search API, before domain tagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSearchHit {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// A human-readable name (e.g., "google_cse").
    fn name(&self) -> &str;

    /// Search for `query` on `site` only, returning at most `max_results` hits.
    async fn search(
        &self,
        query: &str,
        site: &str,
        max_results: u32,
    ) -> std::result::Result<Vec<RawSearchHit>, SearchError>;
}
