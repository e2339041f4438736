//! Prompt template registry.
//!
//! Every agent role has one fixed system instruction and a declared output
//! kind. The registry is built once at startup, optionally patched with
//! per-role overrides from the config file, and shared read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The agent roles the pipeline invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Intent,
    QueryRewrite,
    QueryExpansion,
    ForumSummary,
    RelevanceFilter,
    ProductRecommend,
    ProductRecommendRequestOnly,
    Rank,
    MatchNames,
    Advertising,
    FinalSummary,
}

impl AgentRole {
    pub const ALL: [AgentRole; 11] = [
        Self::Intent,
        Self::QueryRewrite,
        Self::QueryExpansion,
        Self::ForumSummary,
        Self::RelevanceFilter,
        Self::ProductRecommend,
        Self::ProductRecommendRequestOnly,
        Self::Rank,
        Self::MatchNames,
        Self::Advertising,
        Self::FinalSummary,
    ];

    /// Config key used for `[prompts]` overrides.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::QueryRewrite => "query_rewrite",
            Self::QueryExpansion => "query_expansion",
            Self::ForumSummary => "forum_summary",
            Self::RelevanceFilter => "relevance_filter",
            Self::ProductRecommend => "product_recommend",
            Self::ProductRecommendRequestOnly => "product_recommend_request_only",
            Self::Rank => "rank",
            Self::MatchNames => "match_names",
            Self::Advertising => "advertising",
            Self::FinalSummary => "final_summary",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.key() == key)
    }

    /// The output shape this role is asked to produce.
    pub fn output_kind(&self) -> OutputKind {
        match self {
            Self::QueryRewrite | Self::ForumSummary | Self::FinalSummary => OutputKind::Text,
            Self::QueryExpansion | Self::ProductRecommend | Self::ProductRecommendRequestOnly => {
                OutputKind::List
            }
            Self::Intent
            | Self::RelevanceFilter
            | Self::Rank
            | Self::MatchNames
            | Self::Advertising => OutputKind::Json,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// How a role's raw text is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Trimmed free text
    Text,
    /// Numbered list (`1. item`)
    List,
    /// A JSON object somewhere in the text
    Json,
}

/// One role's fixed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTemplate {
    pub role: AgentRole,
    pub system: String,
    pub output: OutputKind,
}

/// Immutable role → template lookup.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: HashMap<AgentRole, AgentTemplate>,
}

impl PromptRegistry {
    /// The built-in templates.
    pub fn builtin() -> Self {
        let templates = AgentRole::ALL
            .into_iter()
            .map(|role| {
                (
                    role,
                    AgentTemplate {
                        role,
                        system: builtin_instruction(role).to_string(),
                        output: role.output_kind(),
                    },
                )
            })
            .collect();
        Self { templates }
    }

    /// Built-in templates with instruction text replaced for the roles named
    /// in `overrides` (keyed by [`AgentRole::key`]). Unknown keys are logged
    /// and ignored. Output kinds cannot be overridden.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut registry = Self::builtin();
        for (key, text) in overrides {
            match AgentRole::from_key(key) {
                Some(role) if !text.trim().is_empty() => {
                    debug!(role = %role, "Prompt override applied");
                    if let Some(template) = registry.templates.get_mut(&role) {
                        template.system = text.trim().to_string();
                    }
                }
                Some(role) => warn!(role = %role, "Ignoring empty prompt override"),
                None => warn!(key = %key, "Ignoring prompt override for unknown role"),
            }
        }
        registry
    }

    pub fn get(&self, role: AgentRole) -> &AgentTemplate {
        // Both constructors populate every role.
        &self.templates[&role]
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_instruction(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Intent => concat!(
            "You are Intent Agent of project ZooGent. ",
            "Classify the shopper behind the current request. ",
            "userType is \"B2B\" when the request is about sourcing for a business ",
            "(bulk quantities, suppliers, wholesale, resale, office or company procurement) ",
            "and \"B2C\" otherwise. ",
            "isFollowUp is true only when a previous request is given and the current request ",
            "refines, narrows or continues it. ",
            "Return ONLY a JSON object like this:\n",
            "{\"userType\": \"B2C\", \"isFollowUp\": false}\n",
            "No explanation, no extra text."
        ),
        AgentRole::QueryRewrite => concat!(
            "You are Search Agent of project ZooGent. ",
            "Rewrite ONLY the user's message into a clear, SEO-friendly English query ",
            "focused on user needs. When a previous request is given, merge its constraints ",
            "into the new query. DO NOT repeat the original user message or include it in your output. ",
            "Output ONLY a single rewritten query with no explanations, no prefixes and no extra text."
        ),
        AgentRole::QueryExpansion => concat!(
            "You are Query Expansion Agent of project ZooGent. ",
            "Given a product search query and the kind of buyer, write 3 to 5 distinct search queries ",
            "that approach the same need from different angles such as brand, model line, key feature ",
            "or price band. Keep each query short and specific. ",
            "Output ONLY a numbered list in the format '1. query'. ",
            "Do not add explanations or extra text."
        ),
        AgentRole::ForumSummary => concat!(
            "You are SummarizeAgent. Your task is to read the forum search results ",
            "(title, snippet, domain, etc.) and produce a single, well-structured paragraph ",
            "that introduces the product being discussed, highlights key features, advantages, ",
            "disadvantages, and summarizes the main points of debate across the forums. ",
            "Limit your summary to 100 words. ",
            "Do not add unverified information; only use what is implied by the provided results."
        ),
        AgentRole::RelevanceFilter => concat!(
            "You are Relevance Agent of project ZooGent. ",
            "You receive a search query, the kind of buyer and a JSON array of search results, ",
            "each with an index, a title and a snippet. ",
            "Keep only results that are listings for a product matching the query and suitable for that buyer. ",
            "Drop category pages, articles and unrelated products. ",
            "Return ONLY a JSON object like this:\n",
            "{\"relevantIndices\": [0, 2, 3]}\n",
            "No explanation, no extra text."
        ),
        AgentRole::ProductRecommend => concat!(
            "You are ProductRecommendAgent. ",
            "Read the user's request and the forum search results **as optional context**, ",
            "but you are free to use your own broad knowledge of the market to recommend the best-matching products. ",
            "Do not limit yourself to only the forum text. ",
            "Return at least 1 and at most 5 **specific, currently-sold best-matching products with full product names including their exact model numbers**. ",
            "Output ONLY a numbered list in the format '1. Brand ModelNumber'. ",
            "Do not add explanations or extra text."
        ),
        AgentRole::ProductRecommendRequestOnly => concat!(
            "You are ProductRecommendAgent. ",
            "Read the user's request **as optional context**, ",
            "but you are free to use your own broad knowledge of the market to recommend the best-matching products. ",
            "Return at least 1 and at most 5 **specific, currently-sold products with full product names including model numbers**. ",
            "Output ONLY a numbered list in the format '1. Brand ModelNumber'. ",
            "Do not add explanations or extra text."
        ),
        AgentRole::Rank => concat!(
            "You are Rank Agent of project ZooGent. ",
            "You receive a search query, the kind of buyer and a JSON array of product listings. ",
            "Order the listings from most suitable to least suitable for that buyer and query. ",
            "You may leave out listings that clearly do not fit. ",
            "Copy each listing object unchanged, never invent new ones. ",
            "Return ONLY a JSON object like this:\n",
            "{\"products\": [{\"title\": \"...\", \"link\": \"...\", \"snippet\": \"...\", \"domain\": \"...\"}]}\n",
            "No explanation, no extra text."
        ),
        AgentRole::MatchNames => concat!(
            "You are Match Agent of project ZooGent. ",
            "Rank the provided products from most suitable (1) to least suitable (N) ",
            "based solely on how well they fit the user's request. ",
            "Return ONLY a JSON object like this:\n",
            "{\"products\": [\"Product1\", \"Product2\", ...]}\n",
            "No explanation, no extra text."
        ),
        AgentRole::Advertising => concat!(
            "You are ProductAdvertisingAgent of project ZooGent. ",
            "Write a concise, appealing introduction for the given product, ",
            "highlighting how it matches the user's needs. ",
            "Base your wording on the provided product details but rewrite it as a natural advertising intro. ",
            "Return ONLY a JSON object exactly like this:\n",
            "{ \"introduction\": \"Your rewritten product intro here.\" }\n",
            "No extra text, no explanation."
        ),
        AgentRole::FinalSummary => concat!(
            "You are Final Summary Agent of project ZooGent. ",
            "Write a short, friendly closing message of at most three sentences for the shopper. ",
            "Name the product category, confirm that the listed products were picked for their request ",
            "and invite them to refine the search. ",
            "Do not quote prices or details that are not in the product list. ",
            "Output ONLY the message."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_template() {
        let registry = PromptRegistry::builtin();
        for role in AgentRole::ALL {
            let template = registry.get(role);
            assert_eq!(template.role, role);
            assert_eq!(template.output, role.output_kind());
            assert!(!template.system.is_empty());
        }
    }

    #[test]
    fn role_keys_round_trip() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::from_key(role.key()), Some(role));
        }
        assert_eq!(AgentRole::from_key("master_analysis"), None);
    }

    #[test]
    fn json_roles_show_their_shape() {
        let registry = PromptRegistry::builtin();
        assert!(registry.get(AgentRole::Intent).system.contains("userType"));
        assert!(registry.get(AgentRole::RelevanceFilter).system.contains("relevantIndices"));
        assert!(registry.get(AgentRole::Rank).system.contains("\"products\""));
        assert!(registry.get(AgentRole::Advertising).system.contains("introduction"));
    }

    #[test]
    fn overrides_replace_text_only() {
        let mut overrides = HashMap::new();
        overrides.insert("query_rewrite".to_string(), "  Rewrite tersely.  ".to_string());
        overrides.insert("not_a_role".to_string(), "ignored".to_string());
        overrides.insert("rank".to_string(), "   ".to_string());

        let registry = PromptRegistry::with_overrides(&overrides);
        assert_eq!(registry.get(AgentRole::QueryRewrite).system, "Rewrite tersely.");
        assert_eq!(registry.get(AgentRole::QueryRewrite).output, OutputKind::Text);
        assert_eq!(
            registry.get(AgentRole::Rank).system,
            PromptRegistry::builtin().get(AgentRole::Rank).system
        );
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&AgentRole::ProductRecommendRequestOnly).unwrap();
        assert_eq!(json, r#""product_recommend_request_only""#);
    }
}
