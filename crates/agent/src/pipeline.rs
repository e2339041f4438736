//! The multi-stage turn pipeline.
//!
//! One call to [`Pipeline::run`] takes a free-text shopping request through
//! six stages:
//!
//! 1. **Classify** the buyer type and whether this is a follow-up
//! 2. **Rewrite** the request into a search query
//! 3. **Research** forums and marketplaces concurrently
//! 4. **Recommend/Rank** the marketplace candidates
//! 5. **Conclude** with a short summary (and optional product intros)
//! 6. **Deliver** the assembled [`TurnResult`]
//!
//! Failure handling per step comes from the [`PolicyTable`]. Only
//! marketplace search and an exhausted recommendation can fail a turn with
//! the default table.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zoogent_config::{AppConfig, DomainConfig, PipelineConfig, PipelineVariant};
use zoogent_core::error::{Error, Result};
use zoogent_core::product::{CandidateSet, SearchResultItem, normalize_title};
use zoogent_core::provider::Provider;
use zoogent_core::request::{UserRequest, UserType};
use zoogent_core::search::SearchBackend;
use zoogent_search::{DomainFailurePolicy, DomainSearch};

use crate::invoker::LlmInvoker;
use crate::policy::{PolicyTable, Step};
use crate::progress::{PipelineEvent, Stage};
use crate::prompts::{AgentRole, PromptRegistry};
use crate::recommend::{ProductIntroduction, Recommendation, Recommender};
use crate::relevance::RelevanceRanker;

pub const NO_FORUM_RESULTS: &str = "No forum results found.";
pub const NO_FORUM_SUMMARY: &str = "No summary available.";
pub const DEFAULT_CONCLUSION: &str = "Here are your personalized product recommendations:";

/// Forum discussion backing the recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumInfo {
    pub results: Vec<SearchResultItem>,
    pub summary: String,
}

/// Everything a caller needs to render one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub summary: String,
    pub search_query: String,
    pub user_type: UserType,
    pub is_follow_up: bool,
    pub forum_info: ForumInfo,
    /// Most suitable first
    pub ranked_products: Vec<SearchResultItem>,
    /// Product names from the recommendation agent, when it ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub introductions: Vec<ProductIntroduction>,
    pub stage_reached: Stage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentOutput {
    #[serde(default)]
    user_type: Option<String>,
    #[serde(default)]
    is_follow_up: Option<serde_json::Value>,
}

/// Per-turn state. Dropped when the turn ends.
struct PipelineRun {
    request: UserRequest,
    search_query: String,
    stage: Stage,
    forum: ForumInfo,
}

struct Progress<'a> {
    tx: Option<&'a mpsc::Sender<PipelineEvent>>,
}

impl Progress<'_> {
    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = self.tx
            && tx.send(event).await.is_err()
        {
            debug!("Progress receiver dropped");
        }
    }
}

pub struct Pipeline {
    invoker: Arc<LlmInvoker>,
    search: DomainSearch,
    ranker: RelevanceRanker,
    recommender: Recommender,
    domains: Arc<DomainConfig>,
    config: PipelineConfig,
    results_per_domain: u32,
    policy: PolicyTable,
}

impl Pipeline {
    pub fn new(
        invoker: Arc<LlmInvoker>,
        search: DomainSearch,
        domains: DomainConfig,
        config: PipelineConfig,
    ) -> Self {
        debug!(
            provider = %invoker.provider_name(),
            search = %search.backend_name(),
            variant = ?config.variant,
            "Pipeline assembled"
        );
        Self {
            ranker: RelevanceRanker::new(invoker.clone()),
            recommender: Recommender::new(invoker.clone()),
            policy: PolicyTable::from_config(&config),
            invoker,
            search,
            domains: Arc::new(domains),
            config,
            results_per_domain: 1,
        }
    }

    /// Wire a pipeline from the loaded configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        backend: Arc<dyn SearchBackend>,
        config: &AppConfig,
    ) -> Self {
        let prompts = Arc::new(PromptRegistry::with_overrides(&config.prompts));
        let invoker = Arc::new(LlmInvoker::from_config(provider, prompts, config));
        let search = DomainSearch::new(backend, Duration::from_secs(config.search.timeout_secs));

        Self::new(
            invoker,
            search,
            config.domains.clone(),
            config.pipeline.clone(),
        )
        .with_results_per_domain(config.search.results_per_domain)
    }

    pub fn with_results_per_domain(mut self, n: u32) -> Self {
        self.results_per_domain = n.max(1);
        self
    }

    pub fn with_policy(mut self, policy: PolicyTable) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn invoker(&self) -> &LlmInvoker {
        &self.invoker
    }

    /// Run one turn. Blank `user_text` is rejected before any call is made.
    pub async fn run(&self, user_text: &str, prior_turn: Option<&str>) -> Result<TurnResult> {
        self.execute(user_text, prior_turn, Progress { tx: None }).await
    }

    /// Run one turn, reporting stage changes on `progress`.
    pub async fn run_with_progress(
        &self,
        user_text: &str,
        prior_turn: Option<&str>,
        progress: mpsc::Sender<PipelineEvent>,
    ) -> Result<TurnResult> {
        self.execute(user_text, prior_turn, Progress { tx: Some(&progress) })
            .await
    }

    async fn execute(
        &self,
        user_text: &str,
        prior_turn: Option<&str>,
        progress: Progress<'_>,
    ) -> Result<TurnResult> {
        if user_text.trim().is_empty() {
            warn!("Rejecting empty request");
            return Err(Error::EmptyRequest);
        }

        let prior_turn = prior_turn
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        let mut run = PipelineRun {
            request: UserRequest::new(user_text.trim(), prior_turn),
            search_query: String::new(),
            stage: Stage::Classify,
            forum: ForumInfo::default(),
        };

        match self.drive(&mut run, &progress).await {
            Ok(result) => {
                info!(
                    query = %result.search_query,
                    user_type = %result.user_type,
                    products = result.ranked_products.len(),
                    "Turn complete"
                );
                progress
                    .emit(PipelineEvent::Done {
                        stage_reached: result.stage_reached,
                    })
                    .await;
                Ok(result)
            }
            Err(e) => {
                warn!(stage = ?run.stage, error = %e, "Turn failed");
                progress
                    .emit(PipelineEvent::Failed {
                        stage: run.stage,
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut PipelineRun, progress: &Progress<'_>) -> Result<TurnResult> {
        self.enter(run, Stage::Classify, progress).await;
        self.classify(&mut run.request, progress).await?;

        self.enter(run, Stage::Rewrite, progress).await;
        run.search_query = self.rewrite(&run.request, progress).await?;

        self.enter(run, Stage::Research, progress).await;
        let user_type = run.request.user_type;
        let marketplace = async {
            match self.config.variant {
                PipelineVariant::DirectRank => {
                    self.marketplace_path(&run.search_query, user_type, progress)
                        .await
                }
                PipelineVariant::RecommendThenRank => Ok(CandidateSet::new()),
            }
        };
        let (forum, candidates) =
            tokio::join!(self.forum_path(&run.search_query, progress), marketplace);
        run.forum = forum?;
        let candidates = candidates?;

        self.enter(run, Stage::Recommend, progress).await;
        let (ranked, recommendations) = match self.config.variant {
            PipelineVariant::DirectRank => self.direct_rank(run, candidates, progress).await?,
            PipelineVariant::RecommendThenRank => {
                self.products_from_recommendations(run, true, progress).await?
            }
        };

        self.enter(run, Stage::Conclude, progress).await;
        let k = self.config.advertise_top_k.min(ranked.len());
        let (summary, introductions) = tokio::join!(
            self.conclude(run, &ranked, progress),
            self.recommender.advertise(&run.request.text, &ranked[..k])
        );
        let summary = summary?;

        self.enter(run, Stage::Deliver, progress).await;
        Ok(TurnResult {
            summary,
            search_query: run.search_query.clone(),
            user_type: run.request.user_type,
            is_follow_up: run.request.is_follow_up,
            forum_info: std::mem::take(&mut run.forum),
            ranked_products: ranked,
            recommendations,
            introductions,
            stage_reached: Stage::Deliver,
        })
    }

    async fn enter(&self, run: &mut PipelineRun, stage: Stage, progress: &Progress<'_>) {
        debug!(stage = ?stage, index = stage.index(), "Entering stage");
        run.stage = stage;
        progress.emit(PipelineEvent::stage(stage)).await;
    }

    /// Apply the step's failure policy to `outcome`.
    async fn settle<T>(
        &self,
        step: Step,
        stage: Stage,
        outcome: Result<T>,
        fallback: impl FnOnce() -> T,
        progress: &Progress<'_>,
    ) -> Result<T> {
        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let policy = self.policy.get(step);
        if !policy.recovers() {
            return Err(err);
        }

        warn!(step = %step, mode = ?policy.on_failure, error = %err, "Step failed, recovering");
        progress
            .emit(PipelineEvent::Degraded {
                stage,
                step: step.to_string(),
                reason: err.to_string(),
            })
            .await;
        Ok(fallback())
    }

    // --- Stage 1 ---

    async fn classify(&self, request: &mut UserRequest, progress: &Progress<'_>) -> Result<()> {
        let content = match &request.prior_turn {
            Some(prior) => format!(
                "Previous request:\n{prior}\n\nCurrent request:\n{}",
                request.text
            ),
            None => format!("Current request:\n{}", request.text),
        };

        let outcome = self
            .invoker
            .invoke_json::<IntentOutput>(AgentRole::Intent, &content)
            .await;
        let intent = self
            .settle(Step::Classify, Stage::Classify, outcome, IntentOutput::default, progress)
            .await?;

        request.user_type = intent
            .user_type
            .as_deref()
            .and_then(UserType::parse)
            .unwrap_or_default();
        request.is_follow_up = request.prior_turn.is_some()
            && match intent.is_follow_up {
                Some(serde_json::Value::Bool(flag)) => flag,
                Some(serde_json::Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
                _ => false,
            };

        info!(
            user_type = %request.user_type,
            follow_up = request.is_follow_up,
            "Request classified"
        );
        Ok(())
    }

    // --- Stage 2 ---

    async fn rewrite(&self, request: &UserRequest, progress: &Progress<'_>) -> Result<String> {
        let mut content = format!(
            "Buyer: {} ({})\n\n",
            request.user_type.label(),
            request.user_type.description()
        );
        if let Some(prior) = request.follow_up_context() {
            content.push_str(&format!("Previous request:\n{prior}\n\n"));
        }
        content.push_str(&format!("User request:\n{}", request.text));

        let outcome = self
            .invoker
            .invoke_text(AgentRole::QueryRewrite, &content)
            .await
            .map(|text| first_line(&text));
        let query = self
            .settle(Step::Rewrite, Stage::Rewrite, outcome, String::new, progress)
            .await?;

        if query.is_empty() {
            debug!("Rewrite empty, searching with the raw request");
            return Ok(request.text.clone());
        }
        info!(query = %query, "Search query ready");
        Ok(query)
    }

    // --- Stage 3 ---

    fn domain_policy(&self) -> DomainFailurePolicy {
        DomainFailurePolicy::from_skip_flag(self.config.skip_failed_domains)
    }

    async fn forum_path(&self, query: &str, progress: &Progress<'_>) -> Result<ForumInfo> {
        let found = self
            .search
            .search(
                query,
                &self.domains.forum,
                self.results_per_domain,
                self.domain_policy(),
            )
            .await
            .map_err(Error::from);
        let results = self
            .settle(Step::ForumSearch, Stage::Research, found, CandidateSet::new, progress)
            .await?
            .into_items();

        if results.is_empty() {
            return Ok(ForumInfo {
                results,
                summary: NO_FORUM_RESULTS.into(),
            });
        }

        let outcome = async {
            let content = serde_json::to_string_pretty(&results)?;
            self.invoker.invoke_text(AgentRole::ForumSummary, &content).await
        }
        .await;
        let summary = self
            .settle(Step::ForumSummary, Stage::Research, outcome, String::new, progress)
            .await?;

        Ok(ForumInfo {
            results,
            summary: if summary.is_empty() {
                NO_FORUM_SUMMARY.into()
            } else {
                summary
            },
        })
    }

    async fn expand(
        &self,
        query: &str,
        user_type: UserType,
        progress: &Progress<'_>,
    ) -> Result<Vec<String>> {
        let content = format!(
            "Search query:\n{query}\n\nBuyer: {} ({})",
            user_type.label(),
            user_type.description()
        );
        let outcome = self
            .invoker
            .invoke_list(AgentRole::QueryExpansion, &content)
            .await;
        let expanded = self
            .settle(Step::QueryExpansion, Stage::Research, outcome, Vec::new, progress)
            .await?;

        let main = normalize_title(query);
        let mut seen = std::collections::HashSet::from([main]);
        Ok(expanded
            .into_iter()
            .filter(|q| seen.insert(normalize_title(q)))
            .take(self.config.max_sub_queries)
            .collect())
    }

    /// Main query plus sub-queries, searched concurrently and unioned in
    /// query order. Fails only when every query fails.
    async fn marketplace_path(
        &self,
        query: &str,
        user_type: UserType,
        progress: &Progress<'_>,
    ) -> Result<CandidateSet> {
        let mut queries = vec![query.to_string()];
        if self.config.expand_queries {
            queries.extend(self.expand(query, user_type, progress).await?);
        }

        let domains = self.domains.marketplace_for(user_type);
        let policy = self.domain_policy();
        let outcomes = join_all(
            queries
                .iter()
                .map(|q| self.search.search(q, domains, self.results_per_domain, policy)),
        )
        .await;

        let mut candidates = CandidateSet::new();
        let mut succeeded = 0usize;
        let mut last_error = None;

        for (q, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(found) => {
                    debug!(query = %q, found = found.len(), "Marketplace query complete");
                    succeeded += 1;
                    candidates.union(found);
                }
                Err(e) => {
                    warn!(query = %q, error = %e, "Marketplace query failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error.filter(|_| succeeded == 0) {
            return self
                .settle(
                    Step::MarketplaceSearch,
                    Stage::Research,
                    Err(e.into()),
                    CandidateSet::new,
                    progress,
                )
                .await;
        }

        info!(
            queries = queries.len(),
            candidates = candidates.len(),
            "Marketplace search complete"
        );
        Ok(candidates)
    }

    // --- Stage 4 ---

    async fn direct_rank(
        &self,
        run: &PipelineRun,
        candidates: CandidateSet,
        progress: &Progress<'_>,
    ) -> Result<(Vec<SearchResultItem>, Vec<String>)> {
        if candidates.is_empty() {
            info!("No marketplace candidates, asking for recommendations");
            return self.products_from_recommendations(run, false, progress).await;
        }

        let query = run.search_query.as_str();
        let user_type = run.request.user_type;
        let items = candidates.into_items();

        let items = if self.config.relevance_filter {
            let outcome = self.ranker.try_filter(query, &items, user_type).await;
            self.settle(Step::RelevanceFilter, Stage::Recommend, outcome, || items.clone(), progress)
                .await?
        } else {
            items
        };

        let outcome = self.ranker.try_rank(query, &items, user_type).await;
        let mut ranked = self
            .settle(Step::Rank, Stage::Recommend, outcome, || items.clone(), progress)
            .await?;
        ranked.truncate(self.config.top_n);
        Ok((ranked, Vec::new()))
    }

    /// Recommend names (bounded retry, then request-only), optionally rank
    /// them, then search each name on the marketplaces.
    async fn products_from_recommendations(
        &self,
        run: &PipelineRun,
        rank_names: bool,
        progress: &Progress<'_>,
    ) -> Result<(Vec<SearchResultItem>, Vec<String>)> {
        let attempts = self.policy.get(Step::Recommend).max_attempts;
        let outcome = self
            .recommender
            .recommend(&run.request.text, &run.forum.results, attempts)
            .await;
        let recommendation = self
            .settle(Step::Recommend, Stage::Recommend, outcome, Recommendation::default, progress)
            .await?;

        info!(
            attempts = recommendation.attempts,
            used_fallback = recommendation.used_fallback,
            names = recommendation.names.len(),
            "Recommendations ready"
        );
        if recommendation.used_fallback {
            progress
                .emit(PipelineEvent::Degraded {
                    stage: Stage::Recommend,
                    step: Step::Recommend.to_string(),
                    reason: format!(
                        "no products from forum context after {} attempts, used the request alone",
                        recommendation.attempts
                    ),
                })
                .await;
        }

        if recommendation.names.is_empty() {
            return Err(Error::NoResults {
                query: run.search_query.clone(),
            });
        }

        let names = if rank_names {
            self.recommender
                .rank_names(&run.request.text, recommendation.names)
                .await
        } else {
            recommendation.names
        };

        let domains = self.domains.marketplace_for(run.request.user_type);
        let policy = self.domain_policy();
        let outcomes = join_all(
            names
                .iter()
                .map(|name| self.search.search(name, domains, self.results_per_domain, policy)),
        )
        .await;

        let mut products = CandidateSet::new();
        for (name, outcome) in names.iter().zip(outcomes) {
            let found = self
                .settle(
                    Step::ProductSearch,
                    Stage::Recommend,
                    outcome.map_err(Error::from),
                    CandidateSet::new,
                    progress,
                )
                .await?;
            debug!(name = %name, found = found.len(), "Recommended product searched");
            products.union(found);
        }

        if products.is_empty() {
            return Err(Error::NoResults {
                query: run.search_query.clone(),
            });
        }

        let mut ranked = products.into_items();
        ranked.truncate(self.config.top_n);
        Ok((ranked, names))
    }

    // --- Stage 5 ---

    async fn conclude(
        &self,
        run: &PipelineRun,
        ranked: &[SearchResultItem],
        progress: &Progress<'_>,
    ) -> Result<String> {
        let listing = ranked
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {} ({})", i + 1, p.title, p.domain))
            .collect::<Vec<_>>()
            .join("\n");
        let content = format!(
            "User request:\n{}\n\nSearch query:\n{}\n\nTop products:\n{listing}",
            run.request.text, run.search_query
        );

        let outcome = self
            .invoker
            .invoke_text(AgentRole::FinalSummary, &content)
            .await;
        let summary = self
            .settle(Step::Conclude, Stage::Conclude, outcome, String::new, progress)
            .await?;

        Ok(if summary.is_empty() {
            DEFAULT_CONCLUSION.into()
        } else {
            summary
        })
    }
}

/// First non-empty line without wrapping quotes.
fn first_line(raw: &str) -> String {
    raw.lines()
        .map(|l| l.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}
