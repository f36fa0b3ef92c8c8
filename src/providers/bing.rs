use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, require_key, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Clone)]
pub struct BingProvider {
    client: reqwest::Client,
}

impl BingProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for BingProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Bing
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let key = require_key(config, "bing subscription key")?;

        let count = limit.to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .header("Ocp-Apim-Subscription-Key", key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("offset", "0"),
                ("mkt", "es-ES"),
            ])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let parsed: BingResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(parsed
            .web_pages
            .map(|w| w.value)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|page| SearchResult {
                title: page.name,
                url: page.url,
                source: ProviderId::Bing,
                snippet: truncate_snippet(&page.snippet),
            })
            .collect())
    }
}
