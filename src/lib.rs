//! Multi-provider web search aggregation.
//!
//! [`SearchEngine`] queries heterogeneous search backends (keyless APIs,
//! community-run SearXNG mirrors, keyed paid APIs) under per-provider
//! timeout and quota constraints, merges their responses into one result
//! schema, dedupes across providers by domain, and caches finished
//! responses with mode-dependent TTLs. Provider failures are absorbed:
//! `search` always returns a response, degrading to fewer sources or an
//! empty result list as backends drop out.

pub mod cache;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod providers;
pub mod rotation;
pub mod types;

pub use cache::ResultCache;
pub use config::{Credential, ProviderConfig, ProviderKind, ProviderStats, Quota, QuotaPeriod};
pub use engine::SearchEngine;
pub use error::ProviderError;
pub use providers::SearchProvider;
pub use types::{ProviderId, SearchOptions, SearchResponse, SearchResult};
