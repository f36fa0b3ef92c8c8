use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, require_key, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct WebSearchResponse {
    web: Option<Web>,
}

#[derive(Debug, Deserialize)]
struct Web {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone)]
pub struct BraveProvider {
    client: reqwest::Client,
}

impl BraveProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for BraveProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Brave
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let token = require_key(config, "brave subscription token")?;

        let count = limit.to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .header("X-Subscription-Token", token)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("search_lang", "es"),
                ("country", "es"),
            ])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let parsed: WebSearchResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let results = parsed
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                source: ProviderId::Brave,
                snippet: truncate_snippet(&r.description),
            })
            .collect();
        Ok(results)
    }
}
