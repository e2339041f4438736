//! Shared mocks for agent and pipeline tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use zoogent_core::error::{ProviderError, SearchError};
use zoogent_core::message::Message;
use zoogent_core::product::SearchResultItem;
use zoogent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use zoogent_core::search::{RawSearchHit, SearchBackend};

use crate::prompts::{AgentRole, PromptRegistry};

type Script = dyn Fn(AgentRole, &str) -> Result<String, ProviderError> + Send + Sync;

/// A provider whose reply is computed from the role (recognised by its
/// built-in system text) and the user content.
pub struct ScriptedProvider {
    script: Box<Script>,
    prompts: PromptRegistry,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(AgentRole, &str) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            prompts: PromptRegistry::builtin(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// How many calls were made for `role`.
    pub fn calls_for(&self, role: AgentRole) -> usize {
        let system = &self.prompts.get(role).system;
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.messages[0].content == system)
            .count()
    }

    fn role_of(&self, system: &str) -> AgentRole {
        AgentRole::ALL
            .into_iter()
            .find(|role| self.prompts.get(*role).system == system)
            .unwrap_or_else(|| panic!("ScriptedProvider: unknown system prompt: {system}"))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let role = self.role_of(&request.messages[0].content);
        let text = (self.script)(role, &request.messages[1].content)?;
        Ok(make_text_response(&text))
    }
}

/// A provider that always fails with a network error.
pub struct FailingProvider {
    call_count: Mutex<usize>,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Err(ProviderError::Timeout("unreachable".into()))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A search backend answering from a per-site table. Queries containing a
/// registered keyword get that keyword's hits instead.
#[derive(Default)]
pub struct MockSearch {
    by_site: HashMap<String, Vec<RawSearchHit>>,
    by_keyword: Vec<(String, String, Vec<RawSearchHit>)>,
    failing_sites: Vec<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(mut self, site: &str, titles: &[&str]) -> Self {
        self.by_site.insert(site.into(), hits(site, titles));
        self
    }

    pub fn keyword(mut self, keyword: &str, site: &str, titles: &[&str]) -> Self {
        self.by_keyword
            .push((keyword.to_lowercase(), site.into(), hits(site, titles)));
        self
    }

    pub fn failing(mut self, site: &str) -> Self {
        self.failing_sites.push(site.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    fn name(&self) -> &str {
        "mock_search"
    }

    async fn search(
        &self,
        query: &str,
        site: &str,
        max_results: u32,
    ) -> Result<Vec<RawSearchHit>, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), site.to_string()));

        if self.failing_sites.iter().any(|s| s == site) {
            return Err(SearchError::QuotaExceeded);
        }

        let lowered = query.to_lowercase();
        let keyed = self
            .by_keyword
            .iter()
            .find(|(keyword, s, _)| s == site && lowered.contains(keyword.as_str()))
            .map(|(_, _, hits)| hits);

        let found = keyed.or_else(|| self.by_site.get(site));
        Ok(found
            .map(|h| h.iter().take(max_results as usize).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn hits(site: &str, titles: &[&str]) -> Vec<RawSearchHit> {
    titles
        .iter()
        .map(|title| RawSearchHit {
            title: (*title).into(),
            link: link_for(site, title),
            snippet: format!("{title} on {site}"),
            image_url: None,
        })
        .collect()
}

pub fn link_for(site: &str, title: &str) -> String {
    format!("https://{site}/{}", title.to_lowercase().replace(' ', "-"))
}

pub fn item(title: &str, site: &str) -> SearchResultItem {
    SearchResultItem {
        title: title.into(),
        link: link_for(site, title),
        snippet: format!("{title} on {site}"),
        image: None,
        domain: site.into(),
    }
}
