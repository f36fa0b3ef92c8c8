use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{truncate_snippet, ProviderId, SearchResult};

const ENDPOINT: &str = "https://api.duckduckgo.com/";

// The Instant Answer API returns at most two useful things: an "abstract"
// (one curated summary with a URL) and a list of related topics, where a
// topic is either a direct link or a named group of links.
#[derive(Debug, Deserialize, Default)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "FirstURL")]
        first_url: String,
        #[serde(rename = "Text", default)]
        text: String,
    },
    Group {
        #[serde(rename = "Topics", default)]
        topics: Vec<RelatedTopic>,
    },
}

/// Sub-topics taken from each nested topic group.
const PER_GROUP: usize = 2;

fn topic_result(query: &str, first_url: String, text: String) -> SearchResult {
    let title = if text.is_empty() {
        query.to_string()
    } else {
        text.clone()
    };
    SearchResult {
        title,
        url: first_url,
        source: ProviderId::DuckDuckGo,
        snippet: truncate_snippet(&text),
    }
}

fn collect_results(query: &str, limit: usize, answer: InstantAnswer) -> Vec<SearchResult> {
    let mut out = Vec::new();

    if !answer.abstract_url.is_empty() {
        let title = if answer.heading.is_empty() {
            query.to_string()
        } else {
            answer.heading
        };
        out.push(SearchResult {
            title,
            url: answer.abstract_url,
            source: ProviderId::DuckDuckGo,
            snippet: truncate_snippet(&answer.abstract_text),
        });
    }

    for topic in answer.related_topics {
        if out.len() >= limit {
            break;
        }
        match topic {
            RelatedTopic::Topic { first_url, text } => {
                out.push(topic_result(query, first_url, text));
            }
            RelatedTopic::Group { topics } => {
                for sub in topics.into_iter().take(PER_GROUP) {
                    if out.len() >= limit {
                        break;
                    }
                    if let RelatedTopic::Topic { first_url, text } = sub {
                        out.push(topic_result(query, first_url, text));
                    }
                }
            }
        }
    }

    out.truncate(limit);
    out
}

#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
}

impl DuckDuckGoProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::DuckDuckGo
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .timeout(config.timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let answer: InstantAnswer = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(collect_results(query, limit, answer))
    }
}
