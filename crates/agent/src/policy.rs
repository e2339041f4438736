//! Per-step retry and failure policy.
//!
//! The orchestrator asks this table what to do when a step fails instead of
//! hard-coding it at each call site.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zoogent_config::PipelineConfig;

/// A unit of work inside a pipeline stage that can fail on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Classify,
    Rewrite,
    QueryExpansion,
    ForumSearch,
    ForumSummary,
    MarketplaceSearch,
    RelevanceFilter,
    Rank,
    Recommend,
    ProductSearch,
    Conclude,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Classify => "classify",
            Self::Rewrite => "rewrite",
            Self::QueryExpansion => "query_expansion",
            Self::ForumSearch => "forum_search",
            Self::ForumSummary => "forum_summary",
            Self::MarketplaceSearch => "marketplace_search",
            Self::RelevanceFilter => "relevance_filter",
            Self::Rank => "rank",
            Self::Recommend => "recommend",
            Self::ProductSearch => "product_search",
            Self::Conclude => "conclude",
        };
        f.write_str(name)
    }
}

/// What happens when a step fails after its attempts are used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Substitute the step's documented default value
    Fallback,
    /// Pass the step's input through unchanged
    FailOpen,
    /// Abort the turn with the step's error
    FailTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    pub max_attempts: u32,
    pub on_failure: FailureMode,
}

impl StagePolicy {
    pub const fn once(on_failure: FailureMode) -> Self {
        Self {
            max_attempts: 1,
            on_failure,
        }
    }

    pub fn recovers(&self) -> bool {
        self.on_failure != FailureMode::FailTurn
    }
}

#[derive(Debug, Clone)]
pub struct PolicyTable {
    steps: HashMap<Step, StagePolicy>,
}

impl PolicyTable {
    pub fn from_config(config: &PipelineConfig) -> Self {
        use FailureMode::*;

        let steps = HashMap::from([
            (Step::Classify, StagePolicy::once(Fallback)),
            (Step::Rewrite, StagePolicy::once(Fallback)),
            (Step::QueryExpansion, StagePolicy::once(Fallback)),
            (Step::ForumSearch, StagePolicy::once(Fallback)),
            (Step::ForumSummary, StagePolicy::once(Fallback)),
            (Step::MarketplaceSearch, StagePolicy::once(FailTurn)),
            (Step::RelevanceFilter, StagePolicy::once(FailOpen)),
            (Step::Rank, StagePolicy::once(FailOpen)),
            (
                Step::Recommend,
                StagePolicy {
                    max_attempts: config.recommend_max_attempts.max(1),
                    on_failure: FailTurn,
                },
            ),
            (Step::ProductSearch, StagePolicy::once(Fallback)),
            (Step::Conclude, StagePolicy::once(Fallback)),
        ]);

        Self { steps }
    }

    pub fn get(&self, step: Step) -> StagePolicy {
        self.steps
            .get(&step)
            .copied()
            .unwrap_or(StagePolicy::once(FailureMode::FailTurn))
    }

    /// Replace one step's policy.
    pub fn with(mut self, step: Step, policy: StagePolicy) -> Self {
        self.steps.insert(step, policy);
        self
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recommendation_retries() {
        let table = PolicyTable::default();
        assert_eq!(table.get(Step::Recommend).max_attempts, 3);
        for step in [Step::Classify, Step::Rewrite, Step::Rank, Step::Conclude, Step::MarketplaceSearch] {
            assert_eq!(table.get(step).max_attempts, 1, "{step}");
        }
    }

    #[test]
    fn local_recovery_steps_never_fail_the_turn() {
        let table = PolicyTable::default();
        for step in [Step::Classify, Step::Rewrite, Step::ForumSummary, Step::Conclude] {
            assert_eq!(table.get(step).on_failure, FailureMode::Fallback);
        }
        assert_eq!(table.get(Step::Rank).on_failure, FailureMode::FailOpen);
        assert_eq!(table.get(Step::RelevanceFilter).on_failure, FailureMode::FailOpen);
        assert_eq!(table.get(Step::MarketplaceSearch).on_failure, FailureMode::FailTurn);
    }

    #[test]
    fn attempts_follow_config() {
        let config = PipelineConfig {
            recommend_max_attempts: 5,
            ..PipelineConfig::default()
        };
        assert_eq!(PolicyTable::from_config(&config).get(Step::Recommend).max_attempts, 5);
    }

    #[test]
    fn override_one_step() {
        let table = PolicyTable::default().with(Step::Rank, StagePolicy::once(FailureMode::FailTurn));
        assert!(!table.get(Step::Rank).recovers());
        assert!(table.get(Step::RelevanceFilter).recovers());
    }
}
