use serde::{Deserialize, Serialize};

/// Snippets are capped so a handful of results stays small enough to embed
/// in a chat prompt.
pub const SNIPPET_MAX_CHARS: usize = 250;

/// Identifiers for the supported search backends, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    DuckDuckGo,
    Searxng,
    Brave,
    You,
    Google,
    SerpApi,
    Bing,
}

impl ProviderId {
    pub const ALL: [ProviderId; 7] = [
        ProviderId::DuckDuckGo,
        ProviderId::Searxng,
        ProviderId::Brave,
        ProviderId::You,
        ProviderId::Google,
        ProviderId::SerpApi,
        ProviderId::Bing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::DuckDuckGo => "duckduckgo",
            ProviderId::Searxng => "searxng",
            ProviderId::Brave => "brave",
            ProviderId::You => "you",
            ProviderId::Google => "google",
            ProviderId::SerpApi => "serpapi",
            ProviderId::Bing => "bing",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode flags for one search call.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Upper bound on returned results.
    pub max_results: usize,
    /// Restrict to the keyless low-latency providers only.
    pub fast: bool,
    /// Query every enabled provider in parallel. Overrides `fast`.
    pub deep: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            fast: false,
            deep: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub source: ProviderId,
    pub snippet: String,
}

/// Aggregated response returned to the caller. Serializes to the wire
/// contract consumed by the chat pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    /// RFC 3339, stamped when the response was built (not re-stamped on
    /// cache hits).
    pub timestamp: String,
    /// Seconds spent inside the engine for this response.
    pub execution_time: f64,
    pub total_results: usize,
    /// Providers that returned at least one result, in contribution order.
    pub sources_used: Vec<ProviderId>,
    pub results: Vec<SearchResult>,
}

/// Truncate a snippet to [`SNIPPET_MAX_CHARS`] characters.
pub fn truncate_snippet(text: &str) -> String {
    text.chars().take(SNIPPET_MAX_CHARS).collect()
}
