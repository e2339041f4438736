//! The shopping pipeline: the heart of ZooGent.
//!
//! A turn flows strictly forward through role-specific agent calls
//! interleaved with domain-scoped searches:
//!
//! 1. **Classify** the buyer (B2C/B2B) and detect follow-ups
//! 2. **Rewrite** the request into a search query
//! 3. **Research** forum discussion and marketplace listings in parallel
//! 4. **Recommend/Rank** the candidates
//! 5. **Conclude** with a short natural-language message
//! 6. **Deliver** a [`TurnResult`]
//!
//! Each agent call goes through the [`LlmInvoker`] with a template from the
//! [`PromptRegistry`]; replies are decoded by the [`extract`] functions.

pub mod extract;
pub mod invoker;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod prompts;
pub mod recommend;
pub mod relevance;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use extract::{Extracted, extract, extract_json, extract_list, extract_text};
pub use invoker::LlmInvoker;
pub use pipeline::{
    DEFAULT_CONCLUSION, ForumInfo, NO_FORUM_RESULTS, NO_FORUM_SUMMARY, Pipeline, TurnResult,
};
pub use policy::{FailureMode, PolicyTable, StagePolicy, Step};
pub use progress::{PipelineEvent, Stage};
pub use prompts::{AgentRole, AgentTemplate, OutputKind, PromptRegistry};
pub use recommend::{ProductIntroduction, Recommendation, Recommender};
pub use relevance::RelevanceRanker;
pub use session::{Turn, TurnHistory, TurnOutcome};
