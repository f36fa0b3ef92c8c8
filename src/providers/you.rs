use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, require_key, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://api.ydc-index.io/search";

// The You.com response contract is not fully published; hits have been
// observed both under `web.results` and as a top-level `hits` array.
// Check `web.results` first, then `hits`, otherwise treat as empty.
#[derive(Debug, Deserialize)]
struct YouResponse {
    web: Option<YouWeb>,
    hits: Option<Vec<YouHit>>,
}

#[derive(Debug, Deserialize)]
struct YouWeb {
    #[serde(default)]
    results: Vec<YouHit>,
}

#[derive(Debug, Deserialize)]
struct YouHit {
    url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    snippets: Vec<String>,
}

fn hits(parsed: YouResponse) -> Vec<YouHit> {
    if let Some(web) = parsed.web {
        web.results
    } else if let Some(hits) = parsed.hits {
        hits
    } else {
        Vec::new()
    }
}

fn to_result(hit: YouHit) -> Option<SearchResult> {
    let url = hit.url?;
    let snippet = if !hit.description.is_empty() {
        hit.description
    } else {
        hit.snippets.into_iter().next().unwrap_or_default()
    };
    Some(SearchResult {
        title: hit.title,
        url,
        source: ProviderId::You,
        snippet: truncate_snippet(&snippet),
    })
}

#[derive(Debug, Clone)]
pub struct YouProvider {
    client: reqwest::Client,
}

impl YouProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for YouProvider {
    fn id(&self) -> ProviderId {
        ProviderId::You
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let key = require_key(config, "you.com api key")?;

        let count = limit.to_string();
        let resp = self
            .client
            .get(ENDPOINT)
            .header("X-API-Key", key)
            .query(&[("query", query), ("num_web_results", count.as_str())])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let parsed: YouResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(hits(parsed)
            .into_iter()
            .filter_map(to_result)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_web_results_shape() {
        let js = r#"
        {
          "web": {
            "results": [
              {"url": "https://a.example", "title": "A", "description": "from web"}
            ]
          },
          "hits": [
            {"url": "https://b.example", "title": "B", "description": "from hits"}
          ]
        }
        "#;
        let parsed: YouResponse = serde_json::from_str(js).unwrap();
        let hits = hits(parsed);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn falls_back_to_hits_shape() {
        let js = r#"
        {
          "hits": [
            {"url": "https://b.example", "title": "B", "snippets": ["s1", "s2"]}
          ]
        }
        "#;
        let parsed: YouResponse = serde_json::from_str(js).unwrap();
        let hit = hits(parsed).into_iter().next().unwrap();
        let result = to_result(hit).unwrap();
        assert_eq!(result.snippet, "s1");
    }

    #[test]
    fn unknown_shape_is_empty_not_error() {
        let parsed: YouResponse = serde_json::from_str(r#"{"answers": []}"#).unwrap();
        assert!(hits(parsed).is_empty());
    }

    #[test]
    fn hit_without_url_is_dropped() {
        let hit = YouHit {
            url: None,
            title: "t".to_string(),
            description: "d".to_string(),
            snippets: vec![],
        };
        assert!(to_result(hit).is_none());
    }
}
