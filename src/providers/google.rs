use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, require_key_and_cx, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The Custom Search API rejects `num` above 10.
const MAX_NUM: usize = 10;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let (key, cx) = require_key_and_cx(config, "google api key + cse id")?;

        let num = limit.min(MAX_NUM).to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("key", key),
                ("cx", cx),
                ("q", query),
                ("num", num.as_str()),
                ("lr", "lang_es"),
            ])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let parsed: CseResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .take(limit)
            .map(|item| SearchResult {
                title: item.title,
                url: item.link,
                source: ProviderId::Google,
                snippet: truncate_snippet(&item.snippet),
            })
            .collect())
    }
}
