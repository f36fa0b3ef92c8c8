use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{check_status, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::rotation;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

/// Public instances known to expose the JSON API without registration.
/// Any single one may be down or rate-limited at any moment; rotation
/// handles that.
const DEFAULT_INSTANCES: &[&str] = &[
    "https://searx.be",
    "https://searx.tiekoetter.com",
    "https://search.bus-hit.me",
    "https://search.ononoki.org",
    "https://paulgo.io",
    "https://searx.work",
];

/// Instances tried per call before giving up.
const MAX_INSTANCE_ATTEMPTS: usize = 3;

/// Comma/whitespace-separated override for the instance list.
const INSTANCES_ENV: &str = "SEARXNG_INSTANCES";

fn instances_from_env() -> Option<Vec<String>> {
    let raw = std::env::var(INSTANCES_ENV).ok()?;
    let mut out: Vec<String> = Vec::new();
    for piece in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let piece = piece.trim().trim_end_matches('/');
        if !piece.is_empty() && !out.iter().any(|s| s == piece) {
            out.push(piece.to_string());
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[derive(Debug, Deserialize)]
struct InstanceResponse {
    #[serde(default)]
    results: Vec<InstanceResult>,
}

#[derive(Debug, Deserialize)]
struct InstanceResult {
    url: Option<String>,
    #[serde(default)]
    title: String,
    // SearXNG puts the snippet under `content` in JSON format.
    #[serde(default)]
    content: String,
}

async fn query_instance(
    client: &reqwest::Client,
    base: String,
    query: &str,
    limit: usize,
    timeout: std::time::Duration,
) -> Result<Vec<SearchResult>, ProviderError> {
    let endpoint = format!("{}/search", base.trim_end_matches('/'));
    let resp = client
        .get(&endpoint)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("language", "es"),
            ("safesearch", "0"),
            ("categories", "general"),
        ])
        .header("Accept", "application/json")
        .timeout(timeout)
        .send()
        .await?;
    check_status(&resp)?;

    let parsed: InstanceResponse = resp
        .json()
        .await
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let out: Vec<SearchResult> = parsed
        .results
        .into_iter()
        .filter_map(|r| {
            let url = r.url?;
            Some(SearchResult {
                title: r.title,
                url,
                source: ProviderId::Searxng,
                snippet: truncate_snippet(&r.content),
            })
        })
        .take(limit)
        .collect();

    // An empty result set falls through to the next instance.
    if out.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct SearxngProvider {
    client: reqwest::Client,
    instances: Vec<String>,
}

impl SearxngProvider {
    pub fn new(client: reqwest::Client) -> Self {
        let instances = instances_from_env().unwrap_or_else(|| {
            DEFAULT_INSTANCES.iter().map(|s| s.to_string()).collect()
        });
        Self { client, instances }
    }

    pub fn with_instances(client: reqwest::Client, instances: Vec<String>) -> Self {
        Self { client, instances }
    }
}

#[async_trait]
impl SearchProvider for SearxngProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Searxng
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        debug!(instances = self.instances.len(), "rotating searxng instances");
        rotation::first_success(&self.instances, MAX_INSTANCE_ATTEMPTS, |base| {
            query_instance(&self.client, base, query, limit, config.timeout)
        })
        .await
    }
}
