use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::config::{default_configs, Credential, ProviderConfig, ProviderStats};
use crate::dedupe::{dedup_key, dedupe};
use crate::error::ProviderError;
use crate::providers::{default_providers, SearchProvider};
use crate::types::{ProviderId, SearchOptions, SearchResponse, SearchResult};

/// Keyless low-latency providers used when `fast` is set.
const FAST_PROVIDERS: &[ProviderId] = &[ProviderId::DuckDuckGo, ProviderId::Searxng];

/// Providers tried sequentially in default mode, counted from the top of
/// the priority order. Free providers come first so keyed quota is only
/// spent when they fall short.
const DEFAULT_CHAIN_LEN: usize = 4;

/// Deep mode trades latency for coverage, so each provider gets twice its
/// configured timeout.
const DEEP_TIMEOUT_MULTIPLIER: u32 = 2;

/// Multi-provider search orchestrator: provider selection and fallback,
/// cross-provider domain dedup, and TTL caching of finished responses.
///
/// Construct one instance in the host application and share it by
/// reference; every method takes `&self` and internal state is
/// synchronized for concurrent callers.
pub struct SearchEngine {
    /// Adapters in priority order.
    providers: Vec<Box<dyn SearchProvider>>,
    configs: RwLock<HashMap<ProviderId, ProviderConfig>>,
    cache: ResultCache,
}

impl SearchEngine {
    /// Engine with the real adapters, credentials read from the
    /// environment. Providers whose credentials are absent start
    /// disabled; the engine works with zero configured keys via the
    /// keyless providers.
    pub fn new() -> Self {
        let client = reqwest::Client::new();
        Self::with_providers(default_configs(), default_providers(&client))
    }

    /// Engine with injected configuration and adapters.
    pub fn with_providers(
        configs: HashMap<ProviderId, ProviderConfig>,
        providers: Vec<Box<dyn SearchProvider>>,
    ) -> Self {
        Self {
            providers,
            configs: RwLock::new(configs),
            cache: ResultCache::new(),
        }
    }

    /// Replace the response cache, e.g. to tune TTLs.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// Run one aggregated search. Always resolves to a response:
    /// per-provider failures are logged and recovered, and a query that
    /// yields nothing from every provider returns an empty result list.
    pub async fn search(&self, query: &str, opts: SearchOptions) -> SearchResponse {
        let started = Instant::now();
        let key = ResultCache::key(query, opts.max_results, opts.deep);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(query, "cache hit");
            return cached;
        }

        info!(query, deep = opts.deep, fast = opts.fast, "searching");

        let (merged, sources_used) = if opts.deep {
            self.search_parallel(query, opts.max_results).await
        } else {
            let chain: Vec<ProviderId> = if opts.fast {
                FAST_PROVIDERS.to_vec()
            } else {
                self.providers
                    .iter()
                    .take(DEFAULT_CHAIN_LEN)
                    .map(|p| p.id())
                    .collect()
            };
            self.search_sequential(query, opts.max_results, &chain).await
        };

        let mut results = dedupe(merged);
        results.truncate(opts.max_results);

        let response = SearchResponse {
            query: query.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            execution_time: started.elapsed().as_secs_f64(),
            total_results: results.len(),
            sources_used,
            results,
        };

        info!(
            query,
            total = response.total_results,
            sources = response.sources_used.len(),
            "search finished"
        );
        self.cache.put(key, opts.deep, response.clone()).await;
        response
    }

    /// Fan out to every provider at once and wait for all of them. Each
    /// call is bounded by its own (doubled) timeout, so one stuck
    /// provider delays the response but cannot block the others.
    async fn search_parallel(
        &self,
        query: &str,
        max_results: usize,
    ) -> (Vec<SearchResult>, Vec<ProviderId>) {
        let calls = self.providers.iter().map(|provider| async move {
            let outcome = self
                .call_provider(provider.as_ref(), query, max_results, DEEP_TIMEOUT_MULTIPLIER)
                .await;
            (provider.id(), outcome)
        });

        let mut merged = Vec::new();
        let mut sources = Vec::new();
        for (id, outcome) in join_all(calls).await {
            if let Some(results) = Self::usable(id, outcome) {
                sources.push(id);
                merged.extend(results);
            }
        }
        (merged, sources)
    }

    /// Walk the chain one provider at a time, stopping as soon as the
    /// deduplicated tally reaches `max_results`. The early exit is what
    /// keeps keyed providers from being charged when free ones suffice.
    async fn search_sequential(
        &self,
        query: &str,
        max_results: usize,
        chain: &[ProviderId],
    ) -> (Vec<SearchResult>, Vec<ProviderId>) {
        let mut merged = Vec::new();
        let mut sources = Vec::new();
        let mut seen_domains = HashSet::new();
        let mut unique = 0usize;

        for provider in self.providers.iter().filter(|p| chain.contains(&p.id())) {
            let outcome = self
                .call_provider(provider.as_ref(), query, max_results, 1)
                .await;
            if let Some(results) = Self::usable(provider.id(), outcome) {
                sources.push(provider.id());
                for result in &results {
                    if seen_domains.insert(dedup_key(&result.url)) {
                        unique += 1;
                    }
                }
                merged.extend(results);
            }
            if unique >= max_results {
                debug!(query, unique, "enough unique results, skipping remaining providers");
                break;
            }
        }
        (merged, sources)
    }

    /// Downgrade any provider failure to "no contribution".
    fn usable(
        id: ProviderId,
        outcome: Result<Vec<SearchResult>, ProviderError>,
    ) -> Option<Vec<SearchResult>> {
        match outcome {
            Ok(results) if !results.is_empty() => Some(results),
            Ok(_) => None,
            Err(e) if e.is_unavailable() => {
                debug!(provider = %id, reason = %e, "provider skipped");
                None
            }
            Err(e) => {
                warn!(provider = %id, error = %e, "provider failed");
                None
            }
        }
    }

    /// Gate one provider call on its live config: enabled flag, quota
    /// window (checked and charged here), and timeout. The adapter future
    /// is raced against the effective timeout so an unresponsive backend
    /// is actually cancelled, not just abandoned.
    async fn call_provider(
        &self,
        provider: &dyn SearchProvider,
        query: &str,
        limit: usize,
        timeout_multiplier: u32,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let mut config = {
            let mut configs = self.configs.write().await;
            let config = configs
                .get_mut(&provider.id())
                .ok_or(ProviderError::Disabled)?;
            if !config.enabled {
                return Err(ProviderError::Disabled);
            }
            if let Some(quota) = config.quota.as_mut() {
                quota.roll_over_if_elapsed(Utc::now());
                if quota.exhausted() {
                    return Err(ProviderError::QuotaExhausted);
                }
                // Charged per attempt, not per success; a failed call
                // still counted against the backend's quota.
                quota.used += 1;
            }
            config.clone()
        };
        config.timeout *= timeout_multiplier;

        match tokio::time::timeout(config.timeout, provider.search(query, limit, &config)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    pub async fn enable_provider(&self, id: ProviderId) {
        if let Some(config) = self.configs.write().await.get_mut(&id) {
            config.enabled = true;
        }
    }

    pub async fn disable_provider(&self, id: ProviderId) {
        if let Some(config) = self.configs.write().await.get_mut(&id) {
            config.enabled = false;
        }
    }

    /// Install a credential and enable the provider: setting a key is
    /// taken as intent to use it, even if the provider started disabled.
    pub async fn set_key(&self, id: ProviderId, key: &str, cx: Option<&str>) {
        if let Some(config) = self.configs.write().await.get_mut(&id) {
            config.credential = Some(match cx {
                Some(cx) => Credential::KeyAndCx {
                    key: key.to_string(),
                    cx: cx.to_string(),
                },
                None => Credential::Key(key.to_string()),
            });
            config.enabled = true;
        }
    }

    /// Point-in-time snapshot of every provider's enablement and quota.
    pub async fn stats(&self) -> BTreeMap<ProviderId, ProviderStats> {
        self.configs
            .read()
            .await
            .iter()
            .map(|(id, config)| {
                (
                    *id,
                    ProviderStats {
                        enabled: config.enabled,
                        kind: config.kind,
                        quota: config.quota.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderKind, Quota, QuotaPeriod};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct MockProvider {
        id: ProviderId,
        results: Vec<SearchResult>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchProvider for MockProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _config: &ProviderConfig,
        ) -> Result<Vec<SearchResult>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ))
            } else {
                Ok(self.results.clone())
            }
        }
    }

    fn result(id: ProviderId, url: &str) -> SearchResult {
        SearchResult {
            title: url.to_string(),
            url: url.to_string(),
            source: id,
            snippet: "snippet".to_string(),
        }
    }

    fn enabled_config() -> ProviderConfig {
        ProviderConfig {
            enabled: true,
            kind: ProviderKind::Official,
            credential: None,
            timeout: Duration::from_secs(1),
            quota: None,
        }
    }

    struct Rig {
        engine: SearchEngine,
        calls: HashMap<ProviderId, Arc<AtomicUsize>>,
    }

    impl Rig {
        fn calls(&self, id: ProviderId) -> usize {
            self.calls[&id].load(Ordering::SeqCst)
        }
    }

    /// One mock per provider id, every provider enabled unless listed in
    /// `disabled`, failing if listed in `failing`.
    fn rig(
        results: HashMap<ProviderId, Vec<SearchResult>>,
        disabled: &[ProviderId],
        failing: &[ProviderId],
    ) -> Rig {
        let mut configs = HashMap::new();
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
        let mut calls = HashMap::new();

        for id in ProviderId::ALL {
            let mut config = enabled_config();
            config.enabled = !disabled.contains(&id);
            configs.insert(id, config);

            let counter = Arc::new(AtomicUsize::new(0));
            calls.insert(id, counter.clone());
            providers.push(Box::new(MockProvider {
                id,
                results: results.get(&id).cloned().unwrap_or_default(),
                fail: failing.contains(&id),
                calls: counter,
            }));
        }

        Rig {
            engine: SearchEngine::with_providers(configs, providers),
            calls,
        }
    }

    fn distinct_results(id: ProviderId, n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| result(id, &format!("https://{}-{}.example/page", id, i)))
            .collect()
    }

    #[tokio::test]
    async fn fast_mode_only_touches_keyless_providers() {
        let rig = rig(
            HashMap::from([
                (ProviderId::DuckDuckGo, distinct_results(ProviderId::DuckDuckGo, 1)),
                (ProviderId::Searxng, distinct_results(ProviderId::Searxng, 1)),
                (ProviderId::Brave, distinct_results(ProviderId::Brave, 5)),
            ]),
            &[],
            &[],
        );
        let opts = SearchOptions {
            max_results: 10,
            fast: true,
            deep: false,
        };
        let response = rig.engine.search("q", opts).await;

        assert_eq!(rig.calls(ProviderId::DuckDuckGo), 1);
        assert_eq!(rig.calls(ProviderId::Searxng), 1);
        for id in [
            ProviderId::Brave,
            ProviderId::You,
            ProviderId::Google,
            ProviderId::SerpApi,
            ProviderId::Bing,
        ] {
            assert_eq!(rig.calls(id), 0, "{id} must not be invoked in fast mode");
        }
        assert_eq!(response.total_results, 2);
    }

    #[tokio::test]
    async fn deep_mode_invokes_every_enabled_provider_once() {
        let results: HashMap<_, _> = ProviderId::ALL
            .into_iter()
            .map(|id| (id, distinct_results(id, 3)))
            .collect();
        let rig = rig(results, &[ProviderId::Bing], &[]);
        let opts = SearchOptions {
            max_results: 2,
            fast: false,
            deep: true,
        };
        let response = rig.engine.search("q", opts).await;

        // No early exit in deep mode, even with the limit long since met.
        for id in ProviderId::ALL {
            let expected = usize::from(id != ProviderId::Bing);
            assert_eq!(rig.calls(id), expected, "{id}");
        }
        assert_eq!(response.total_results, 2);
        assert_eq!(response.results.len(), 2);
    }

    #[tokio::test]
    async fn default_mode_exits_early_once_limit_is_met() {
        let rig = rig(
            HashMap::from([
                (ProviderId::DuckDuckGo, distinct_results(ProviderId::DuckDuckGo, 5)),
                (ProviderId::Searxng, distinct_results(ProviderId::Searxng, 5)),
            ]),
            &[],
            &[],
        );
        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: false,
        };
        let response = rig.engine.search("q", opts).await;

        assert_eq!(rig.calls(ProviderId::DuckDuckGo), 1);
        assert_eq!(rig.calls(ProviderId::Searxng), 0);
        assert_eq!(rig.calls(ProviderId::Brave), 0);
        assert_eq!(response.sources_used, vec![ProviderId::DuckDuckGo]);
    }

    #[tokio::test]
    async fn default_mode_falls_through_until_enough_unique_domains() {
        // DuckDuckGo: coindesk + coinmarketcap. SearXNG: three results of
        // which one duplicates coindesk. 4 unique < 5, so Brave is tried.
        let rig = rig(
            HashMap::from([
                (
                    ProviderId::DuckDuckGo,
                    vec![
                        result(ProviderId::DuckDuckGo, "https://coindesk.com/price"),
                        result(ProviderId::DuckDuckGo, "https://coinmarketcap.com/btc"),
                    ],
                ),
                (
                    ProviderId::Searxng,
                    vec![
                        result(ProviderId::Searxng, "https://www.coindesk.com/markets"),
                        result(ProviderId::Searxng, "https://blockchain.com/charts"),
                        result(ProviderId::Searxng, "https://binance.com/price"),
                    ],
                ),
            ]),
            &[],
            &[],
        );
        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: false,
        };
        let response = rig.engine.search("bitcoin price today", opts).await;

        assert_eq!(rig.calls(ProviderId::Brave), 1);
        assert_eq!(rig.calls(ProviderId::You), 1);
        assert_eq!(rig.calls(ProviderId::Google), 0, "outside the default chain");
        assert_eq!(
            response.sources_used,
            vec![ProviderId::DuckDuckGo, ProviderId::Searxng]
        );
        assert_eq!(response.total_results, 4);
        let urls: Vec<&str> = response.results.iter().map(|r| r.url.as_str()).collect();
        assert!(!urls.contains(&"https://www.coindesk.com/markets"));
    }

    #[tokio::test]
    async fn all_providers_failing_still_resolves_empty() {
        let rig = rig(HashMap::new(), &[], &ProviderId::ALL);
        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: true,
        };
        let response = rig.engine.search("q", opts).await;

        assert_eq!(response.total_results, 0);
        assert!(response.results.is_empty());
        assert!(response.sources_used.is_empty());
    }

    #[tokio::test]
    async fn disabled_providers_are_never_called_in_deep_mode() {
        let keyed = [
            ProviderId::Brave,
            ProviderId::You,
            ProviderId::Google,
            ProviderId::SerpApi,
            ProviderId::Bing,
        ];
        let rig = rig(HashMap::new(), &keyed, &[]);
        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: true,
        };
        rig.engine.search("q", opts).await;

        for id in keyed {
            assert_eq!(rig.calls(id), 0, "{id}");
        }
        let stats = rig.engine.stats().await;
        for id in keyed {
            assert!(!stats[&id].enabled);
        }
        assert!(stats[&ProviderId::DuckDuckGo].enabled);
    }

    #[tokio::test]
    async fn cache_hit_returns_identical_response_without_provider_calls() {
        let rig = rig(
            HashMap::from([(
                ProviderId::DuckDuckGo,
                distinct_results(ProviderId::DuckDuckGo, 10),
            )]),
            &[],
            &[],
        );
        let opts = SearchOptions::default();
        let first = rig.engine.search("rust async", opts).await;
        let second = rig.engine.search("rust async", opts).await;

        assert_eq!(first, second);
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(rig.calls(ProviderId::DuckDuckGo), 1);
    }

    #[tokio::test]
    async fn cache_expiry_reinvokes_providers() {
        let rig = rig(
            HashMap::from([(
                ProviderId::DuckDuckGo,
                distinct_results(ProviderId::DuckDuckGo, 10),
            )]),
            &[],
            &[],
        );
        let engine = rig.engine.with_cache(ResultCache::with_ttls(
            Duration::from_millis(30),
            Duration::from_millis(30),
        ));

        let opts = SearchOptions::default();
        engine.search("q", opts).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        engine.search("q", opts).await;

        assert_eq!(rig.calls[&ProviderId::DuckDuckGo].load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fast_flag_does_not_partition_the_cache() {
        let rig = rig(
            HashMap::from([
                (
                    ProviderId::DuckDuckGo,
                    distinct_results(ProviderId::DuckDuckGo, 10),
                ),
                (ProviderId::Brave, distinct_results(ProviderId::Brave, 10)),
            ]),
            &[],
            &[],
        );
        let fast = SearchOptions {
            max_results: 10,
            fast: true,
            deep: false,
        };
        let first = rig.engine.search("q", fast).await;
        let second = rig.engine.search("q", SearchOptions::default()).await;

        // Same key, so the fast-mode response is served to the default-mode
        // caller.
        assert_eq!(first, second);
        assert_eq!(rig.calls(ProviderId::Brave), 0);
    }

    #[tokio::test]
    async fn clear_cache_forces_recompute() {
        let rig = rig(
            HashMap::from([(
                ProviderId::DuckDuckGo,
                distinct_results(ProviderId::DuckDuckGo, 10),
            )]),
            &[],
            &[],
        );
        let opts = SearchOptions::default();
        rig.engine.search("q", opts).await;
        rig.engine.clear_cache();
        rig.engine.search("q", opts).await;
        assert_eq!(rig.calls(ProviderId::DuckDuckGo), 2);
    }

    #[tokio::test]
    async fn results_are_bounded_by_max_results() {
        let rig = rig(
            HashMap::from([(
                ProviderId::DuckDuckGo,
                distinct_results(ProviderId::DuckDuckGo, 25),
            )]),
            &[],
            &[],
        );
        let opts = SearchOptions {
            max_results: 3,
            fast: false,
            deep: false,
        };
        let response = rig.engine.search("q", opts).await;
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.total_results, 3);
    }

    #[tokio::test]
    async fn set_key_force_enables_provider() {
        let rig = rig(
            HashMap::from([(ProviderId::Brave, distinct_results(ProviderId::Brave, 2))]),
            &[ProviderId::Brave],
            &[],
        );
        rig.engine.set_key(ProviderId::Brave, "token", None).await;

        let stats = rig.engine.stats().await;
        assert!(stats[&ProviderId::Brave].enabled);

        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: true,
        };
        rig.engine.search("q", opts).await;
        assert_eq!(rig.calls(ProviderId::Brave), 1);
    }

    #[tokio::test]
    async fn enable_disable_round_trip() {
        let rig = rig(HashMap::new(), &[], &[]);
        rig.engine.disable_provider(ProviderId::Searxng).await;
        assert!(!rig.engine.stats().await[&ProviderId::Searxng].enabled);
        rig.engine.enable_provider(ProviderId::Searxng).await;
        assert!(rig.engine.stats().await[&ProviderId::Searxng].enabled);
    }

    #[tokio::test]
    async fn exhausted_quota_skips_provider_and_charges_attempts() {
        let mut configs: HashMap<ProviderId, ProviderConfig> = ProviderId::ALL
            .into_iter()
            .map(|id| (id, enabled_config()))
            .collect();
        configs.get_mut(&ProviderId::Brave).unwrap().quota =
            Some(Quota::new(QuotaPeriod::Monthly, 2));

        let counter = Arc::new(AtomicUsize::new(0));
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
        for id in ProviderId::ALL {
            providers.push(Box::new(MockProvider {
                id,
                results: if id == ProviderId::Brave {
                    distinct_results(id, 2)
                } else {
                    Vec::new()
                },
                fail: false,
                calls: if id == ProviderId::Brave {
                    counter.clone()
                } else {
                    Arc::new(AtomicUsize::new(0))
                },
            }));
        }
        let engine = SearchEngine::with_providers(configs, providers)
            .with_cache(ResultCache::with_ttls(
                Duration::from_millis(1),
                Duration::from_millis(1),
            ));

        let opts = SearchOptions {
            max_results: 5,
            fast: false,
            deep: true,
        };
        for i in 0..3 {
            engine.search(&format!("query {i}"), opts).await;
        }

        // Two budgeted calls went through, the third was skipped.
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        let stats = engine.stats().await;
        let quota = stats[&ProviderId::Brave].quota.as_ref().unwrap();
        assert_eq!(quota.used, 2);
    }

    #[tokio::test]
    async fn hanging_provider_is_cut_off_by_timeout() {
        struct HangingProvider {
            calls: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl SearchProvider for HangingProvider {
            fn id(&self) -> ProviderId {
                ProviderId::DuckDuckGo
            }

            async fn search(
                &self,
                _query: &str,
                _limit: usize,
                _config: &ProviderConfig,
            ) -> Result<Vec<SearchResult>, ProviderError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![])
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let mut configs = HashMap::new();
        let mut config = enabled_config();
        config.timeout = Duration::from_millis(20);
        configs.insert(ProviderId::DuckDuckGo, config);

        let engine = SearchEngine::with_providers(
            configs,
            vec![Box::new(HangingProvider { calls: calls.clone() })],
        );
        let response = engine.search("q", SearchOptions::default()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.total_results, 0);
    }
}
