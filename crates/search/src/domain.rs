//! Domain-scoped search.
//!
//! Runs one query against every domain in a list concurrently, tags each hit
//! with its domain and merges everything into one [`CandidateSet`] in domain
//! order, so the first domain in the list wins title collisions regardless
//! of which request finished first.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use zoogent_core::error::SearchError;
use zoogent_core::product::{CandidateSet, SearchResultItem};
use zoogent_core::search::SearchBackend;

/// What to do when one domain's request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainFailurePolicy {
    /// Fail the whole search on the first domain error.
    Abort,
    /// Skip failed domains; error only when every domain failed.
    SkipFailed,
}

impl DomainFailurePolicy {
    pub fn from_skip_flag(skip_failed: bool) -> Self {
        if skip_failed {
            Self::SkipFailed
        } else {
            Self::Abort
        }
    }
}

/// Fans a query out over a domain list using one [`SearchBackend`].
#[derive(Clone)]
pub struct DomainSearch {
    backend: Arc<dyn SearchBackend>,
    timeout: Duration,
}

impl DomainSearch {
    pub fn new(backend: Arc<dyn SearchBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Search `query` on each of `domains`, up to `per_domain` hits each.
    ///
    /// An empty domain list yields an empty set. Under
    /// [`DomainFailurePolicy::Abort`] the first failure in domain order is
    /// returned. Under [`DomainFailurePolicy::SkipFailed`] a failure is
    /// returned only if no domain succeeded.
    pub async fn search(
        &self,
        query: &str,
        domains: &[String],
        per_domain: u32,
        policy: DomainFailurePolicy,
    ) -> Result<CandidateSet, SearchError> {
        if domains.is_empty() {
            return Ok(CandidateSet::new());
        }

        let futures = domains.iter().map(|domain| async move {
            let outcome =
                tokio::time::timeout(self.timeout, self.backend.search(query, domain, per_domain))
                    .await
                    .unwrap_or_else(|_| {
                        Err(SearchError::Timeout(format!(
                            "no response from {domain} within {}s",
                            self.timeout.as_secs()
                        )))
                    });
            (domain, outcome)
        });

        let outcomes = join_all(futures).await;

        let mut set = CandidateSet::new();
        let mut failures = 0usize;
        let mut last_error: Option<SearchError> = None;

        for (domain, outcome) in outcomes {
            match outcome {
                Ok(hits) => {
                    debug!(domain = %domain, hits = hits.len(), "Domain search complete");
                    set.extend(
                        hits.into_iter()
                            .map(|hit| SearchResultItem::from_hit(hit, domain.as_str())),
                    );
                }
                Err(e) => {
                    warn!(
                        backend = %self.backend.name(),
                        domain = %domain,
                        error = %e,
                        "Domain search failed"
                    );
                    if policy == DomainFailurePolicy::Abort {
                        return Err(e);
                    }
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == domains.len() {
            return Err(SearchError::AllFailed {
                attempted: failures,
                last: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use zoogent_core::search::RawSearchHit;

    /// Scripted backend: per-site hits or failures, optional per-site delay.
    struct ScriptedBackend {
        hits: HashMap<String, Vec<RawSearchHit>>,
        failing: Vec<String>,
        delays: HashMap<String, Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                hits: HashMap::new(),
                failing: Vec::new(),
                delays: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_hits(mut self, site: &str, titles: &[(&str, &str)]) -> Self {
            let hits = titles
                .iter()
                .map(|(title, snippet)| RawSearchHit {
                    title: (*title).into(),
                    link: format!("https://{site}/{}", title.replace(' ', "-")),
                    snippet: (*snippet).into(),
                    image_url: None,
                })
                .collect();
            self.hits.insert(site.into(), hits);
            self
        }

        fn failing(mut self, site: &str) -> Self {
            self.failing.push(site.into());
            self
        }

        fn delayed(mut self, site: &str, delay: Duration) -> Self {
            self.delays.insert(site.into(), delay);
            self
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(
            &self,
            _query: &str,
            site: &str,
            max_results: u32,
        ) -> Result<Vec<RawSearchHit>, SearchError> {
            self.calls.lock().unwrap().push(site.to_string());
            if let Some(delay) = self.delays.get(site) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.iter().any(|s| s == site) {
                return Err(SearchError::ApiError {
                    status_code: 500,
                    message: format!("{site} unavailable"),
                });
            }
            Ok(self
                .hits
                .get(site)
                .map(|h| h.iter().take(max_results as usize).cloned().collect())
                .unwrap_or_default())
        }
    }

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    fn search(backend: ScriptedBackend) -> DomainSearch {
        DomainSearch::new(Arc::new(backend), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn first_domain_wins_title_collisions() {
        let backend = ScriptedBackend::new()
            .with_hits("amazon.com", &[("Ergo Chair Pro", "from amazon")])
            .with_hits("shopee.com.my", &[("ergo chair pro", "from shopee")])
            // The first domain answering last must not change the winner.
            .delayed("amazon.com", Duration::from_millis(50));

        let set = search(backend)
            .search(
                "ergonomic chair",
                &domains(&["amazon.com", "shopee.com.my"]),
                5,
                DomainFailurePolicy::SkipFailed,
            )
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].domain, "amazon.com");
        assert_eq!(set.items()[0].snippet, "from amazon");
    }

    #[tokio::test]
    async fn results_are_in_domain_order() {
        let backend = ScriptedBackend::new()
            .with_hits("a.com", &[("A1", ""), ("A2", "")])
            .with_hits("b.com", &[("B1", "")]);

        let set = search(backend)
            .search("q", &domains(&["b.com", "a.com"]), 5, DomainFailurePolicy::Abort)
            .await
            .unwrap();

        let titles: Vec<&str> = set.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["B1", "A1", "A2"]);
    }

    #[tokio::test]
    async fn per_domain_limit_is_passed_through() {
        let backend = ScriptedBackend::new().with_hits("a.com", &[("A1", ""), ("A2", ""), ("A3", "")]);
        let set = search(backend)
            .search("q", &domains(&["a.com"]), 1, DomainFailurePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn skip_failed_keeps_successful_domains() {
        let backend = ScriptedBackend::new()
            .failing("a.com")
            .with_hits("b.com", &[("B1", "")]);

        let set = search(backend)
            .search("q", &domains(&["a.com", "b.com"]), 1, DomainFailurePolicy::SkipFailed)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].domain, "b.com");
    }

    #[tokio::test]
    async fn abort_fails_on_any_domain_error() {
        let backend = ScriptedBackend::new()
            .failing("a.com")
            .with_hits("b.com", &[("B1", "")]);

        let err = search(backend)
            .search("q", &domains(&["a.com", "b.com"]), 1, DomainFailurePolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ApiError { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn every_domain_failing_is_an_error() {
        let backend = ScriptedBackend::new().failing("a.com").failing("b.com");

        let err = search(backend)
            .search("q", &domains(&["a.com", "b.com"]), 1, DomainFailurePolicy::SkipFailed)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::AllFailed { attempted: 2, .. }));
    }

    #[tokio::test]
    async fn empty_results_are_not_failures() {
        let backend = ScriptedBackend::new();
        let set = search(backend)
            .search("q", &domains(&["a.com"]), 1, DomainFailurePolicy::SkipFailed)
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn empty_domain_list_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::new());
        let search = DomainSearch::new(backend.clone(), Duration::from_secs(1));
        let set = search
            .search("q", &[], 1, DomainFailurePolicy::Abort)
            .await
            .unwrap();
        assert!(set.is_empty());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_domain_times_out() {
        let backend = ScriptedBackend::new()
            .with_hits("fast.com", &[("F1", "")])
            .with_hits("slow.com", &[("S1", "")])
            .delayed("slow.com", Duration::from_secs(60));

        let search = DomainSearch::new(Arc::new(backend), Duration::from_secs(2));
        let set = search
            .search("q", &domains(&["slow.com", "fast.com"]), 1, DomainFailurePolicy::SkipFailed)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].domain, "fast.com");
    }
}
