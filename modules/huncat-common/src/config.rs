use std::env;

use serde::Deserialize;

/// Built-in TMDB key used when no key is configured. Operational fallback
/// carried over from the original deployment, not a recommendation.
pub const DEFAULT_TMDB_API_KEY: &str = "ffe7ef8916c61835264d2df68276ddc2";

/// Process configuration loaded from environment variables. Every value has
/// a default; nothing here panics.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-request timeout for every outbound HTTP call, in milliseconds.
    pub http_timeout_ms: u64,
    /// Enrichment worker pool size.
    pub enrich_concurrency: usize,
    /// Upper bound on records enriched per catalog pass. Enrichment is the
    /// expensive path and must never run unbounded.
    pub enrich_max_items: usize,
    pub tmdb_api_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            http_timeout_ms: env_or("HUNCAT_HTTP_TIMEOUT_MS", 12_000),
            enrich_concurrency: env_or("HUNCAT_ENRICH_CONCURRENCY", 8),
            enrich_max_items: env_or("HUNCAT_ENRICH_MAX", 200),
            tmdb_api_key: env::var("TMDB_API_KEY")
                .or_else(|_| env::var("MAFAB_TMDB_API_KEY"))
                .unwrap_or_else(|_| DEFAULT_TMDB_API_KEY.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_timeout_ms: 12_000,
            enrich_concurrency: 8,
            enrich_max_items: 200,
            tmdb_api_key: DEFAULT_TMDB_API_KEY.to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Per-consumer source selection, decoded upstream from the configuration
/// token (the token codec itself lives outside this crate).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub sources: Sources,
    pub external_links: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub mafab: bool,
    pub porthu: bool,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            mafab: true,
            porthu: false,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sources: Sources::default(),
            external_links: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.http_timeout_ms, 12_000);
        assert_eq!(config.enrich_concurrency, 8);
        assert_eq!(config.enrich_max_items, 200);
    }

    #[test]
    fn source_config_tolerates_partial_input() {
        let config: SourceConfig =
            serde_json::from_str(r#"{"sources":{"porthu":true}}"#).unwrap();
        assert!(config.sources.mafab);
        assert!(config.sources.porthu);
        assert!(config.external_links);
    }
}
