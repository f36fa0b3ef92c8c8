use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, require_key, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://serpapi.com/search";

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: reqwest::Client,
}

impl SerpApiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::SerpApi
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let key = require_key(config, "serpapi api key")?;

        let num = limit.to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("api_key", key),
                ("q", query),
                ("num", num.as_str()),
                ("engine", "google"),
                ("hl", "es"),
                ("gl", "es"),
            ])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let parsed: SerpResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(parsed
            .organic_results
            .into_iter()
            .take(limit)
            .map(|r| SearchResult {
                title: r.title,
                url: r.link,
                source: ProviderId::SerpApi,
                snippet: truncate_snippet(&r.snippet),
            })
            .collect())
    }
}
