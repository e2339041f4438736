//! Relevance filtering and ranking of marketplace candidates.
//!
//! Both steps are a single agent call over a JSON projection of the items.
//! The `try_*` forms report what went wrong; [`RelevanceRanker::filter`] and
//! [`RelevanceRanker::rank`] fail open and hand back the input unchanged.
//! Neither ever returns an item that was not in the input.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use zoogent_core::error::{MalformedOutputError, Result};
use zoogent_core::product::{SearchResultItem, normalize_title};
use zoogent_core::request::UserType;

use crate::invoker::LlmInvoker;
use crate::prompts::AgentRole;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterOutput {
    relevant_indices: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RankOutput {
    products: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct FilterProjection<'a> {
    index: usize,
    title: &'a str,
    snippet: &'a str,
}

pub struct RelevanceRanker {
    invoker: Arc<LlmInvoker>,
}

impl RelevanceRanker {
    pub fn new(invoker: Arc<LlmInvoker>) -> Self {
        Self { invoker }
    }

    /// Keep the items the model marks relevant, in their original order.
    pub async fn filter(
        &self,
        query: &str,
        items: Vec<SearchResultItem>,
        user_type: UserType,
    ) -> Vec<SearchResultItem> {
        match self.try_filter(query, &items, user_type).await {
            Ok(kept) => kept,
            Err(e) => {
                warn!(error = %e, count = items.len(), "Relevance filter failed, keeping all items");
                items
            }
        }
    }

    /// Like [`filter`](Self::filter) but surfaces invocation and decoding
    /// errors. An empty selection still yields the full input.
    pub async fn try_filter(
        &self,
        query: &str,
        items: &[SearchResultItem],
        user_type: UserType,
    ) -> Result<Vec<SearchResultItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let projection: Vec<FilterProjection<'_>> = items
            .iter()
            .enumerate()
            .map(|(index, item)| FilterProjection {
                index,
                title: &item.title,
                snippet: &item.snippet,
            })
            .collect();

        let content = format!(
            "Search query:\n{query}\n\nBuyer: {} ({})\n\nResults:\n{}",
            user_type.label(),
            user_type.description(),
            serde_json::to_string_pretty(&projection)?
        );

        let output: FilterOutput = self
            .invoker
            .invoke_json(AgentRole::RelevanceFilter, &content)
            .await?;
        let indices = select_indices(&output.relevant_indices, items.len());

        if indices.is_empty() {
            warn!(count = items.len(), "Relevance filter selected nothing, keeping all items");
            return Ok(items.to_vec());
        }

        debug!(kept = indices.len(), of = items.len(), "Relevance filter applied");
        Ok(indices.into_iter().map(|i| items[i].clone()).collect())
    }

    /// Order items by suitability. The result is a permutation or ranked
    /// subset of `items`.
    pub async fn rank(
        &self,
        query: &str,
        items: Vec<SearchResultItem>,
        user_type: UserType,
    ) -> Vec<SearchResultItem> {
        match self.try_rank(query, &items, user_type).await {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, count = items.len(), "Rank failed, keeping original order");
                items
            }
        }
    }

    pub async fn try_rank(
        &self,
        query: &str,
        items: &[SearchResultItem],
        user_type: UserType,
    ) -> Result<Vec<SearchResultItem>> {
        if items.len() < 2 {
            return Ok(items.to_vec());
        }

        let content = format!(
            "Search query:\n{query}\n\nBuyer: {} ({})\n\nProducts (JSON):\n{}",
            user_type.label(),
            user_type.description(),
            serde_json::to_string_pretty(items)?
        );

        let output: RankOutput = self.invoker.invoke_json(AgentRole::Rank, &content).await?;
        let ranked = match_back(&output.products, items);

        if ranked.is_empty() {
            return Err(MalformedOutputError::UnexpectedShape(
                "ranked products match none of the candidates".into(),
            )
            .into());
        }

        debug!(ranked = ranked.len(), of = items.len(), "Rank applied");
        Ok(ranked)
    }
}

/// In-range, non-negative, first-seen indices, sorted back into input order.
fn select_indices(raw: &[serde_json::Value], len: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut indices: Vec<usize> = raw
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter_map(|n| usize::try_from(n).ok())
        .filter(|i| *i < len && seen.insert(*i))
        .collect();
    indices.sort_unstable();
    indices
}

/// Resolve echoed entries to input items: objects by `link` then by
/// normalized `title`, plain strings by normalized title. Unknown entries
/// and repeats are dropped.
fn match_back(entries: &[serde_json::Value], items: &[SearchResultItem]) -> Vec<SearchResultItem> {
    let mut used = HashSet::new();
    let mut ranked = Vec::new();

    for entry in entries {
        let (link, title) = match entry {
            serde_json::Value::Object(map) => (
                map.get("link").and_then(|v| v.as_str()),
                map.get("title").and_then(|v| v.as_str()),
            ),
            serde_json::Value::String(title) => (None, Some(title.as_str())),
            _ => (None, None),
        };

        let by_link = link.and_then(|link| {
            items
                .iter()
                .position(|item| item.link == link)
                .filter(|i| !used.contains(i))
        });
        let found = by_link.or_else(|| {
            let key = normalize_title(title?);
            items
                .iter()
                .enumerate()
                .find(|(i, item)| !used.contains(i) && item.key() == key)
                .map(|(i, _)| i)
        });

        if let Some(i) = found {
            used.insert(i);
            ranked.push(items[i].clone());
        }
    }

    ranked
}
