// Secondary lookup services: the per-site title autocomplete endpoint and
// the TMDB search + external-ids cross-reference. Both are cached by
// normalized query key; a failed call caches a negative result so the same
// failing key is not retried within the TTL window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use huncat_common::text::comparison_key;
use huncat_common::types::{MediaType, RawRecord};

use crate::cache::{Clock, TtlCache};
use crate::matching::{self, AutocompleteCandidate, MatchCandidate};

/// What the matching engine could establish about one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub canonical_title: Option<String>,
    pub year: Option<i32>,
    pub canonical_url: Option<String>,
    pub imdb_id: Option<String>,
}

/// Seam for the enrichment pipeline; implemented by [`IdentityResolver`] and
/// by test stubs.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, record: &RawRecord, media_type: MediaType) -> Resolution;
}

// --- Site autocomplete ---

pub struct AutocompleteClient {
    endpoint: String,
    client: reqwest::Client,
    cache: TtlCache<String, Option<Vec<AutocompleteCandidate>>>,
}

impl AutocompleteClient {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            cache: TtlCache::new(ttl, clock),
        }
    }

    /// Query the site's autocomplete with a free-text term. Failures resolve
    /// to None and are cached negatively.
    pub async fn suggest(&self, term: &str) -> Option<Vec<AutocompleteCandidate>> {
        let key = comparison_key(term);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        match self.request(term).await {
            Ok(candidates) => {
                self.cache.insert(key, Some(candidates.clone()));
                Some(candidates)
            }
            Err(error) => {
                warn!(term, error = %error, "Autocomplete lookup failed");
                self.cache.insert(key, None);
                None
            }
        }
    }

    async fn request(&self, term: &str) -> anyhow::Result<Vec<AutocompleteCandidate>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("term", term)])
            .send()
            .await
            .context("Autocomplete request failed")?;

        let candidates: Vec<AutocompleteCandidate> = response
            .json()
            .await
            .context("Autocomplete response was not a JSON array")?;

        info!(term, count = candidates.len(), "Autocomplete lookup complete");
        Ok(candidates)
    }
}

// --- TMDB ---

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
/// How many search candidates get an external-ids cross-reference before we
/// give up on a title.
const MAX_CROSS_REFERENCES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCandidate {
    pub id: i64,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default, alias = "first_air_date")]
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbCandidate>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(default)]
    imdb_id: Option<String>,
}

pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    search_cache: TtlCache<String, Option<Vec<TmdbCandidate>>>,
    ids_cache: TtlCache<String, Option<String>>,
}

impl TmdbClient {
    pub fn new(
        api_key: &str,
        timeout: Duration,
        ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: TMDB_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            search_cache: TtlCache::new(ttl, clock.clone()),
            ids_cache: TtlCache::new(ttl, clock),
        }
    }

    /// Search by title (and year, if known), then cross-reference the
    /// top-scoring candidates until one yields a usable imdb id.
    pub async fn find_imdb_id(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Option<String> {
        let candidates = self.search(title, year, media_type).await?;
        let ranked = rank_candidates(title, year, candidates);

        for candidate in ranked.into_iter().take(MAX_CROSS_REFERENCES) {
            if let Some(imdb_id) = self.external_ids(media_type, candidate.id).await {
                return Some(imdb_id);
            }
        }
        None
    }

    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Option<Vec<TmdbCandidate>> {
        let key = format!("{media_type}:{}:{}", comparison_key(title), year.unwrap_or(0));
        if let Some(cached) = self.search_cache.get(&key) {
            return cached;
        }

        match self.request_search(title, year, media_type).await {
            Ok(results) => {
                self.search_cache.insert(key, Some(results.clone()));
                Some(results)
            }
            Err(error) => {
                warn!(title, %media_type, error = %error, "TMDB search failed");
                self.search_cache.insert(key, None);
                None
            }
        }
    }

    async fn request_search(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> anyhow::Result<Vec<TmdbCandidate>> {
        let (path, year_param) = match media_type {
            MediaType::Movie => ("search/movie", "primary_release_year"),
            MediaType::Series => ("search/tv", "first_air_date_year"),
        };

        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("query", title.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(year) = year {
            query.push((year_param, year.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .query(&query)
            .send()
            .await
            .context("TMDB search request failed")?;

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse TMDB search response")?;

        info!(title, count = parsed.results.len(), "TMDB search complete");
        Ok(parsed.results)
    }

    /// imdb id for one TMDB entry, negatively cached per (type, id).
    async fn external_ids(&self, media_type: MediaType, tmdb_id: i64) -> Option<String> {
        let key = format!("{media_type}:{tmdb_id}");
        if let Some(cached) = self.ids_cache.get(&key) {
            return cached;
        }

        let path = match media_type {
            MediaType::Movie => format!("movie/{tmdb_id}/external_ids"),
            MediaType::Series => format!("tv/{tmdb_id}/external_ids"),
        };

        let result: anyhow::Result<ExternalIds> = async {
            let response = self
                .client
                .get(format!("{}/{path}", self.base_url))
                .query(&[("api_key", self.api_key.as_str())])
                .send()
                .await
                .context("TMDB external-ids request failed")?;
            response
                .json()
                .await
                .context("Failed to parse TMDB external-ids response")
        }
        .await;

        let imdb_id = match result {
            Ok(ids) => ids.imdb_id.filter(|id| id.starts_with("tt")),
            Err(error) => {
                warn!(tmdb_id, error = %error, "TMDB external-ids lookup failed");
                None
            }
        };

        self.ids_cache.insert(key, imdb_id.clone());
        imdb_id
    }
}

/// Order TMDB candidates by normalized-title equality/containment and year
/// equality, keeping the API's own order among equals.
fn rank_candidates(
    title: &str,
    year: Option<i32>,
    candidates: Vec<TmdbCandidate>,
) -> Vec<TmdbCandidate> {
    let wanted = comparison_key(title);

    let mut scored: Vec<(i32, usize, TmdbCandidate)> = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let mut score = 0;
            if let Some(candidate_title) = candidate.title.as_deref() {
                let key = comparison_key(candidate_title);
                if key == wanted {
                    score += 40;
                } else if !wanted.is_empty() && (key.contains(&wanted) || wanted.contains(&key)) {
                    score += 15;
                }
            }
            if let (Some(wanted_year), Some(date)) = (year, candidate.release_date.as_deref()) {
                if date.get(..4).and_then(|y| y.parse::<i32>().ok()) == Some(wanted_year) {
                    score += 10;
                }
            }
            (score, idx, candidate)
        })
        .filter(|(score, _, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, c)| c).collect()
}

// --- Composite resolver ---

/// Identity resolution for one source: site autocomplete first (strong slug
/// signal), TMDB second when an external id is still missing.
pub struct IdentityResolver {
    autocomplete: AutocompleteClient,
    tmdb: Arc<TmdbClient>,
    /// Base URL the site's autocomplete links resolve against.
    site_base_url: String,
}

impl IdentityResolver {
    pub fn new(autocomplete: AutocompleteClient, tmdb: Arc<TmdbClient>, site_base_url: &str) -> Self {
        Self {
            autocomplete,
            tmdb,
            site_base_url: site_base_url.to_string(),
        }
    }

    fn best_autocomplete_match(
        &self,
        record: &RawRecord,
        media_type: MediaType,
        candidates: &[AutocompleteCandidate],
    ) -> Option<MatchCandidate> {
        matching::pick_best(record, media_type, candidates, &self.site_base_url)
    }
}

#[async_trait]
impl Resolve for IdentityResolver {
    async fn resolve(&self, record: &RawRecord, media_type: MediaType) -> Resolution {
        let mut resolution = Resolution::default();

        let seed = record.lookup_seed();
        if seed.is_empty() {
            return resolution;
        }

        if let Some(candidates) = self.autocomplete.suggest(seed).await {
            if let Some(best) = self.best_autocomplete_match(record, media_type, &candidates) {
                resolution.year = best.year;
                resolution.canonical_url = best.url;
                resolution.canonical_title = Some(best.title);
            }
        }

        if record.imdb_id.is_none() {
            let title = resolution
                .canonical_title
                .clone()
                .unwrap_or_else(|| seed.to_string());
            let year = resolution.year.or(record.year);
            resolution.imdb_id = self.tmdb.find_imdb_id(&title, year, media_type).await;
        }

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, title: &str, date: &str) -> TmdbCandidate {
        TmdbCandidate {
            id,
            title: Some(title.to_string()),
            release_date: Some(date.to_string()),
        }
    }

    #[test]
    fn rank_prefers_exact_title_and_year() {
        let ranked = rank_candidates(
            "A keresztapa",
            Some(1972),
            vec![
                candidate(1, "A keresztapa 2", "1974-12-20"),
                candidate(2, "A keresztapa", "1972-03-24"),
                candidate(3, "A keresztapa", "1990-01-01"),
            ],
        );
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 3);
    }

    #[test]
    fn rank_drops_unrelated_candidates() {
        let ranked = rank_candidates(
            "Marty Supreme",
            None,
            vec![candidate(9, "Teljesen más film", "2020-01-01")],
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn rank_preserves_api_order_between_equals() {
        let ranked = rank_candidates(
            "Dune",
            None,
            vec![candidate(1, "Dune", "1984-12-14"), candidate(2, "Dune", "2021-09-15")],
        );
        assert_eq!(ranked[0].id, 1);
    }

    #[test]
    fn tv_search_parses_name_and_first_air_date_fields() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"results":[{"id":5,"name":"The Bridge","first_air_date":"2011-09-21"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results[0].title.as_deref(), Some("The Bridge"));
        assert_eq!(parsed.results[0].release_date.as_deref(), Some("2011-09-21"));
    }
}
