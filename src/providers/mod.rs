pub mod bing;
pub mod brave;
pub mod duckduckgo;
pub mod google;
pub mod searxng;
pub mod serpapi;
pub mod you;

use async_trait::async_trait;

use crate::config::{Credential, ProviderConfig};
use crate::error::ProviderError;
use crate::types::{ProviderId, SearchResult};

pub use bing::BingProvider;
pub use brave::BraveProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use google::GoogleProvider;
pub use searxng::SearxngProvider;
pub use serpapi::SerpApiProvider;
pub use you::YouProvider;

/// One search backend. Adapters are stateless beyond the shared HTTP
/// client; credentials and timeouts come from the live [`ProviderConfig`]
/// on every call, so `set_key` takes effect without rebuilding anything.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Issue one request and map the backend's response into the common
    /// result shape. Never returns an empty error: any failure is a
    /// [`ProviderError`] the orchestrator downgrades to zero results.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        config: &ProviderConfig,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}

/// All real adapters in priority order, sharing one HTTP client.
pub fn default_providers(client: &reqwest::Client) -> Vec<Box<dyn SearchProvider>> {
    vec![
        Box::new(DuckDuckGoProvider::new(client.clone())),
        Box::new(SearxngProvider::new(client.clone())),
        Box::new(BraveProvider::new(client.clone())),
        Box::new(YouProvider::new(client.clone())),
        Box::new(GoogleProvider::new(client.clone())),
        Box::new(SerpApiProvider::new(client.clone())),
        Box::new(BingProvider::new(client.clone())),
    ]
}

pub(crate) fn require_key<'a>(
    config: &'a ProviderConfig,
    what: &'static str,
) -> Result<&'a str, ProviderError> {
    match config.credential.as_ref() {
        Some(Credential::Key(key)) => Ok(key),
        Some(Credential::KeyAndCx { key, .. }) => Ok(key),
        None => Err(ProviderError::NotConfigured(what)),
    }
}

pub(crate) fn require_key_and_cx<'a>(
    config: &'a ProviderConfig,
    what: &'static str,
) -> Result<(&'a str, &'a str), ProviderError> {
    match config.credential.as_ref() {
        Some(Credential::KeyAndCx { key, cx }) => Ok((key, cx)),
        _ => Err(ProviderError::NotConfigured(what)),
    }
}

pub(crate) fn check_status(resp: &reqwest::Response) -> Result<(), ProviderError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ProviderError::Status(status))
    }
}
