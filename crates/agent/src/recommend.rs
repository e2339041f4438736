//! Product-name recommendation, name ranking and advertising copy.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zoogent_core::error::Result;
use zoogent_core::product::{SearchResultItem, normalize_title};

use crate::invoker::LlmInvoker;
use crate::prompts::AgentRole;

/// What the recommendation step produced and how hard it had to try.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendation {
    pub names: Vec<String>,
    /// Context-aware attempts made (errors and empty lists both count)
    pub attempts: u32,
    pub used_fallback: bool,
}

/// Generated introduction for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIntroduction {
    pub title: String,
    pub link: String,
    pub introduction: String,
}

#[derive(Debug, Deserialize)]
struct IntroductionOutput {
    introduction: String,
}

#[derive(Debug, Deserialize)]
struct NameRankOutput {
    products: Vec<serde_json::Value>,
}

pub struct Recommender {
    invoker: Arc<LlmInvoker>,
}

impl Recommender {
    pub fn new(invoker: Arc<LlmInvoker>) -> Self {
        Self { invoker }
    }

    /// Ask for product names using the forum results as context.
    ///
    /// The context-aware call is made at most `max_attempts` times, stopping
    /// at the first non-empty list. If all of them come back empty or fail,
    /// one request-only call is made. Only that last call's error escapes;
    /// an empty final list is returned as `Ok` with no names.
    pub async fn recommend(
        &self,
        request: &str,
        forum_results: &[SearchResultItem],
        max_attempts: u32,
    ) -> Result<Recommendation> {
        let content = format!(
            "User request:\n{request}\n\nForum results:\n{}",
            serde_json::to_string_pretty(forum_results)?
        );

        for attempt in 1..=max_attempts.max(1) {
            match self.invoker.invoke_list(AgentRole::ProductRecommend, &content).await {
                Ok(names) => {
                    let names = clean_names(names);
                    if !names.is_empty() {
                        info!(attempt, count = names.len(), "Recommendation succeeded");
                        return Ok(Recommendation {
                            names,
                            attempts: attempt,
                            used_fallback: false,
                        });
                    }
                    warn!(attempt, "Recommendation returned no products");
                }
                Err(e) => warn!(attempt, error = %e, "Recommendation call failed"),
            }
        }

        warn!("Falling back to request-only recommendation");
        let names = self
            .invoker
            .invoke_list(
                AgentRole::ProductRecommendRequestOnly,
                &format!("User request:\n{request}"),
            )
            .await?;

        Ok(Recommendation {
            names: clean_names(names),
            attempts: max_attempts.max(1),
            used_fallback: true,
        })
    }

    /// Order product names by fit. Unknown names in the reply are dropped;
    /// names the model left out keep their relative order at the end. Fails
    /// open to the input order.
    pub async fn rank_names(&self, request: &str, names: Vec<String>) -> Vec<String> {
        if names.len() < 2 {
            return names;
        }

        let content = format!(
            "User request:\n{request}\n\nProducts to rank (one per line):\n{}",
            names.join("\n")
        );

        let output: NameRankOutput =
            match self.invoker.invoke_json(AgentRole::MatchNames, &content).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(error = %e, "Name ranking failed, keeping order");
                    return names;
                }
            };

        let mut remaining = names;
        let mut ranked = Vec::with_capacity(remaining.len());
        for entry in output.products.iter().filter_map(|v| v.as_str()) {
            let key = normalize_title(entry);
            if let Some(pos) = remaining.iter().position(|n| normalize_title(n) == key) {
                ranked.push(remaining.remove(pos));
            }
        }

        if ranked.is_empty() {
            warn!("Name ranking matched nothing, keeping order");
            return remaining;
        }

        ranked.extend(remaining);
        ranked
    }

    /// Write an introduction for each of `products`, concurrently. Products
    /// whose call fails are left out.
    pub async fn advertise(
        &self,
        request: &str,
        products: &[SearchResultItem],
    ) -> Vec<ProductIntroduction> {
        let calls = products.iter().map(|product| async move {
            let details = serde_json::to_string_pretty(product).ok()?;
            let content = format!("User request:\n{request}\n\nProduct details (JSON):\n{details}");

            match self
                .invoker
                .invoke_json::<IntroductionOutput>(AgentRole::Advertising, &content)
                .await
            {
                Ok(out) if !out.introduction.trim().is_empty() => Some(ProductIntroduction {
                    title: product.title.clone(),
                    link: product.link.clone(),
                    introduction: out.introduction.trim().to_string(),
                }),
                Ok(_) => None,
                Err(e) => {
                    debug!(title = %product.title, error = %e, "No introduction");
                    None
                }
            }
        });

        join_all(calls).await.into_iter().flatten().collect()
    }
}

/// Drop markdown emphasis and repeats from recommended names.
fn clean_names(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim_matches(|c: char| c == '*' || c == '"' || c.is_whitespace()).to_string())
        .filter(|n| !n.is_empty() && seen.insert(normalize_title(n)))
        .collect()
}
