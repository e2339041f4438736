//! Google Custom Search backend.
//!
//! One request per (query, site) pair: the query is suffixed with a
//! `site:<domain>` token and `num` is clamped to the API's 1..=10 range.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use zoogent_config::SearchConfig;
use zoogent_core::error::SearchError;
use zoogent_core::search::{RawSearchHit, SearchBackend};

const MAX_NUM: u32 = 10;

pub struct GoogleSearch {
    endpoint: String,
    api_key: String,
    cx: String,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn new(api_key: impl Into<String>, cx: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".into(),
            api_key: api_key.into(),
            cx: cx.into(),
            client,
        }
    }

    /// Build from the `[search]` config section. Both credentials are required.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SearchError::NotConfigured("search.api_key / GOOGLE_API_KEY".into()))?;
        let cx = config
            .cx
            .clone()
            .ok_or_else(|| SearchError::NotConfigured("search.cx / GOOGLE_CX".into()))?;
        Ok(Self::new(api_key, cx).with_endpoint(&config.endpoint))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn to_hits(response: CseResponse) -> Vec<RawSearchHit> {
        response
            .items
            .into_iter()
            .map(|item| RawSearchHit {
                image_url: item
                    .pagemap
                    .and_then(|p| p.cse_image.into_iter().next())
                    .and_then(|img| img.src),
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect()
    }
}

/// Append a site restriction token to a query.
pub fn site_restricted_query(query: &str, site: &str) -> String {
    format!("{} site:{}", query.trim(), site)
}

#[async_trait]
impl SearchBackend for GoogleSearch {
    fn name(&self) -> &str {
        "google_cse"
    }

    async fn search(
        &self,
        query: &str,
        site: &str,
        max_results: u32,
    ) -> Result<Vec<RawSearchHit>, SearchError> {
        let q = site_restricted_query(query, site);
        let num = max_results.clamp(1, MAX_NUM).to_string();

        debug!(site = %site, query = %q, "Custom search request");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", q.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(SearchError::QuotaExceeded);
        }

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, site = %site, body = %body, "Custom search returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: body,
            });
        }

        let parsed: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(Self::to_hits(parsed))
    }
}

// --- Custom Search API types (internal) ---

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    cse_image: Vec<CseImage>,
}

#[derive(Debug, Deserialize)]
struct CseImage {
    #[serde(default)]
    src: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_token_appended() {
        assert_eq!(
            site_restricted_query("  budget phone ", "lowyat.net"),
            "budget phone site:lowyat.net"
        );
    }

    #[test]
    fn parse_items_with_and_without_images() {
        let data = r#"{
            "kind": "customsearch#search",
            "items": [
                {
                    "title": "Oppo A79 5G",
                    "link": "https://shopee.com.my/oppo-a79",
                    "snippet": "8GB RAM, 5000mAh",
                    "pagemap": {"cse_image": [{"src": "https://img.example/a79.jpg"}]}
                },
                {"title": "Redmi 13C", "link": "https://lazada.com.my/redmi-13c"}
            ]
        }"#;
        let parsed: CseResponse = serde_json::from_str(data).unwrap();
        let hits = GoogleSearch::to_hits(parsed);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].image_url.as_deref(), Some("https://img.example/a79.jpg"));
        assert_eq!(hits[1].snippet, "");
        assert!(hits[1].image_url.is_none());
    }

    #[test]
    fn no_items_is_empty() {
        let parsed: CseResponse = serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(GoogleSearch::to_hits(parsed).is_empty());
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = SearchConfig::default();
        assert!(matches!(
            GoogleSearch::from_config(&config),
            Err(SearchError::NotConfigured(_))
        ));

        let config = SearchConfig {
            api_key: Some("k".into()),
            cx: Some("cx".into()),
            ..SearchConfig::default()
        };
        let backend = GoogleSearch::from_config(&config).unwrap();
        assert_eq!(backend.name(), "google_cse");
    }
}
