use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ProviderId;

/// Whether a backend is an official API (keyed, quota-limited) or a
/// community-run public instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Official,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPeriod {
    Daily,
    Monthly,
}

impl QuotaPeriod {
    fn next_reset(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            QuotaPeriod::Daily => from + chrono::Duration::days(1),
            QuotaPeriod::Monthly => from + chrono::Duration::days(30),
        }
    }
}

/// Call budget for a keyed provider. `used` counts every attempted call in
/// the current window; the window resets lazily once `resets_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    pub period: QuotaPeriod,
    pub limit: u64,
    pub used: u64,
    pub resets_at: DateTime<Utc>,
}

impl Quota {
    pub fn new(period: QuotaPeriod, limit: u64) -> Self {
        Self {
            period,
            limit,
            used: 0,
            resets_at: period.next_reset(Utc::now()),
        }
    }

    /// Start a fresh window if the current one has elapsed.
    pub fn roll_over_if_elapsed(&mut self, now: DateTime<Utc>) {
        if now >= self.resets_at {
            self.used = 0;
            self.resets_at = self.period.next_reset(now);
        }
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

/// Credential material for a keyed provider.
#[derive(Debug, Clone)]
pub enum Credential {
    Key(String),
    /// Google Custom Search needs both an API key and a search-engine id.
    KeyAndCx { key: String, cx: String },
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub kind: ProviderKind,
    pub credential: Option<Credential>,
    pub timeout: Duration,
    pub quota: Option<Quota>,
}

/// Read-only view of one provider's configuration, for observability.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub enabled: bool,
    pub kind: ProviderKind,
    pub quota: Option<Quota>,
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn keyed(
    kind: ProviderKind,
    credential: Option<Credential>,
    timeout_secs: u64,
    quota: Option<Quota>,
) -> ProviderConfig {
    ProviderConfig {
        // A keyed provider without its credential stays disabled; the
        // orchestrator never attempts a call to it.
        enabled: credential.is_some(),
        kind,
        credential,
        timeout: Duration::from_secs(timeout_secs),
        quota,
    }
}

fn keyless(kind: ProviderKind, timeout_secs: u64) -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        kind,
        credential: None,
        timeout: Duration::from_secs(timeout_secs),
        quota: None,
    }
}

/// Build the startup configuration for every provider, reading credentials
/// from the environment once. Missing keys disable the provider rather
/// than erroring, so the engine stays usable with zero configured keys.
pub fn default_configs() -> HashMap<ProviderId, ProviderConfig> {
    let mut configs = HashMap::new();

    configs.insert(
        ProviderId::DuckDuckGo,
        keyless(ProviderKind::Official, 3),
    );
    configs.insert(ProviderId::Searxng, keyless(ProviderKind::Public, 4));
    configs.insert(
        ProviderId::Brave,
        keyed(
            ProviderKind::Official,
            env_key("BRAVE_API_KEY").map(Credential::Key),
            3,
            Some(Quota::new(QuotaPeriod::Monthly, 2000)),
        ),
    );
    configs.insert(
        ProviderId::You,
        keyed(
            ProviderKind::Official,
            env_key("YOU_API_KEY").map(Credential::Key),
            3,
            None,
        ),
    );
    configs.insert(
        ProviderId::Google,
        keyed(
            ProviderKind::Official,
            match (env_key("GOOGLE_API_KEY"), env_key("GOOGLE_CSE_ID")) {
                (Some(key), Some(cx)) => Some(Credential::KeyAndCx { key, cx }),
                _ => None,
            },
            4,
            Some(Quota::new(QuotaPeriod::Daily, 100)),
        ),
    );
    configs.insert(
        ProviderId::SerpApi,
        keyed(
            ProviderKind::Official,
            env_key("SERPAPI_KEY").map(Credential::Key),
            5,
            Some(Quota::new(QuotaPeriod::Monthly, 100)),
        ),
    );
    configs.insert(
        ProviderId::Bing,
        keyed(
            ProviderKind::Official,
            env_key("BING_API_KEY").map(Credential::Key),
            3,
            Some(Quota::new(QuotaPeriod::Monthly, 1000)),
        ),
    );

    configs
}
