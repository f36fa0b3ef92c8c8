/// Failure of a single provider call. The orchestrator treats every variant
/// as "zero results from this provider" and keeps going; nothing here is
/// ever surfaced to the caller of [`crate::SearchEngine::search`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Required credential is missing from the provider configuration.
    #[error("missing credential: {0}")]
    NotConfigured(&'static str),

    /// Provider is disabled (explicitly, or because its credential was
    /// absent at startup).
    #[error("provider disabled")]
    Disabled,

    /// Provider has hit its daily/monthly quota; skipped until the window
    /// rolls over.
    #[error("quota exhausted")]
    QuotaExhausted,

    /// Request exceeded the per-provider timeout.
    #[error("request timed out")]
    Timeout,

    /// Non-2xx HTTP response.
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Provider answered but contributed no results. Used by instance
    /// rotation to fall through to the next candidate.
    #[error("empty result set")]
    Empty,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(e)
        }
    }
}

impl ProviderError {
    /// Expected skips (disabled, no key, out of quota) are logged at debug
    /// rather than warn.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderError::NotConfigured(_)
                | ProviderError::Disabled
                | ProviderError::QuotaExhausted
        )
    }
}
