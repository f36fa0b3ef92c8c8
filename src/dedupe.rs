use std::collections::HashSet;

use url::Url;

use crate::types::SearchResult;

/// Key a result dedupes under: the normalized hostname, or for URLs that
/// fail to parse, the raw string minus any query suffix.
pub(crate) fn dedup_key(raw_url: &str) -> String {
    if let Ok(parsed) = Url::parse(raw_url) {
        if let Some(host) = parsed.host_str() {
            let host = host.strip_prefix("www.").unwrap_or(host);
            return host.to_ascii_lowercase();
        }
    }
    strip_query(raw_url)
}

fn strip_query(raw_url: &str) -> String {
    raw_url.split('?').next().unwrap_or(raw_url).to_string()
}

/// Collapse a merged result list to one result per domain, first
/// occurrence wins. Providers often return several pages from the same
/// site for a broad query; with a small result budget, one per domain
/// buys source diversity.
pub fn dedupe(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(dedup_key(&r.url)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;

    fn result(url: &str) -> SearchResult {
        SearchResult {
            title: "t".to_string(),
            url: url.to_string(),
            source: ProviderId::DuckDuckGo,
            snippet: String::new(),
        }
    }

    #[test]
    fn keeps_first_result_per_domain() {
        let out = dedupe(vec![
            result("https://coindesk.com/price/bitcoin"),
            result("https://www.coindesk.com/markets"),
            result("https://coinmarketcap.com/"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://coindesk.com/price/bitcoin");
        assert_eq!(out[1].url, "https://coinmarketcap.com/");
    }

    #[test]
    fn www_prefix_and_case_are_ignored() {
        assert_eq!(dedup_key("https://www.Example.com/a"), "example.com");
        assert_eq!(dedup_key("https://example.com/b"), "example.com");
    }

    #[test]
    fn malformed_url_falls_back_to_stripped_string() {
        assert_eq!(dedup_key("not a url?utm=1"), "not a url");
        let out = dedupe(vec![
            result("not a url?utm=1"),
            result("not a url?utm=2"),
            result("another bad url"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn idempotent() {
        let input = vec![
            result("https://a.com/1"),
            result("https://a.com/2"),
            result("https://b.com/1"),
            result("bad url?x=1"),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn output_domains_are_unique() {
        let out = dedupe(vec![
            result("https://a.com/1"),
            result("https://www.a.com/2"),
            result("https://b.com"),
            result("https://sub.a.com"),
        ]);
        let keys: HashSet<String> = out.iter().map(|r| dedup_key(&r.url)).collect();
        assert_eq!(keys.len(), out.len());
    }

    #[test]
    fn order_is_preserved() {
        let out = dedupe(vec![
            result("https://z.com"),
            result("https://a.com"),
            result("https://m.com"),
        ]);
        let urls: Vec<&str> = out.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://z.com", "https://a.com", "https://m.com"]);
    }
}
