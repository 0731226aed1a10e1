// mafab.hu adapter. Listing pages only tell us what exists (detail URL plus
// a title); posters and imdb ids come from the identity resolver and the
// cinemeta image service. Every catalog URL uses the www host — the apex
// domain redirect-loops for non-browser clients.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use huncat_common::config::Config;
use huncat_common::text::{extract_year, sanitize, strip_title_noise, title_from_slug};
use huncat_common::types::{
    cinemeta_poster, entity_id, CanonicalEntity, CatalogPage, MediaType, RawRecord, StreamRef,
};

use crate::adapter::{CatalogAdapter, CatalogQuery};
use crate::cache::{entity_ttl, lookup_ttl, page_ttl, Clock, TtlCache};
use crate::fetcher::{FetchPage, PageFetcher};
use crate::lookup::{AutocompleteClient, IdentityResolver, Resolve, TmdbClient};
use crate::pipeline;
use crate::sources::{absolutize, element_text, has_class};

pub const SOURCE_NAME: &str = "mafab.hu";
const BASE_URL: &str = "https://www.mafab.hu";
const AUTOCOMPLETE_URL: &str = "https://www.mafab.hu/includes/jsons/auto_2.php";
/// Window the router asks for; unpaginated internal passes use it too.
const FULL_PASS_LIMIT: usize = 250;

/// Listing URLs for one catalog id. Unknown mafab ids fall back to the mixed
/// set so a stale consumer configuration degrades instead of erroring.
fn catalog_urls(catalog_id: &str) -> Vec<String> {
    let year = Utc::now().year();
    match catalog_id {
        "mafab-movies" => vec![format!("{BASE_URL}/filmek/filmek/")],
        "mafab-series" => vec![format!("{BASE_URL}/sorozatok/sorozatok/")],
        "mafab-streaming" => vec![format!("{BASE_URL}/vod/top-streaming")],
        "mafab-cinema" => vec![format!("{BASE_URL}/cinema/premier/jelenleg-a-mozikban")],
        "mafab-cinema-soon" => vec![format!("{BASE_URL}/cinema/premier/hamarosan-a-mozikban")],
        "mafab-tv" => vec![format!("{BASE_URL}/tv/tv-musor")],
        "mafab-movies-lists" => vec![format!("{BASE_URL}/lists/filmek")],
        "mafab-series-lists" => vec![format!("{BASE_URL}/lists/sorozatok")],
        "mafab-streaming-premieres" => vec![format!("{BASE_URL}/vod/streaming-premierek")],
        "mafab-streaming-netflix" => vec![format!("{BASE_URL}/vod/top-streaming/netflix")],
        "mafab-streaming-hbo" => vec![format!("{BASE_URL}/vod/top-streaming/hbo")],
        "mafab-streaming-telekom-tvgo" => vec![format!("{BASE_URL}/vod/top-streaming/tvgo")],
        "mafab-streaming-cinego" => vec![format!("{BASE_URL}/vod/top-streaming/cinego")],
        "mafab-streaming-filmio" => vec![format!("{BASE_URL}/vod/top-streaming/filmio")],
        "mafab-streaming-amazon" => vec![format!("{BASE_URL}/vod/top-streaming/amazon")],
        "mafab-streaming-apple-tv" => vec![format!("{BASE_URL}/vod/top-streaming/appletv")],
        "mafab-streaming-disney" => vec![format!("{BASE_URL}/vod/top-streaming/disney")],
        "mafab-streaming-skyshowtime" => vec![format!("{BASE_URL}/vod/top-streaming/skyshowtime")],
        "mafab-year-window" => vec![format!(
            "{BASE_URL}/filmek/filmek/?yrf={}&yrt={year}",
            year - 1
        )],
        "mafab-best-current-year" => vec![format!(
            "{BASE_URL}/filmek/filmek/?yrf={year}&yrt={year}&sb=3"
        )],
        "mafab-total-gross" => vec![format!(
            "{BASE_URL}/toplists/box-office?year_from={}&year_to={year}",
            year - 1
        )],
        _ => vec![
            format!("{BASE_URL}/filmek/filmek/"),
            format!("{BASE_URL}/sorozatok/sorozatok/"),
            format!("{BASE_URL}/vod/top-streaming"),
            format!("{BASE_URL}/cinema/premier/jelenleg-a-mozikban"),
        ],
    }
}

// --- Page parsing ---

/// Extract candidate records from one listing page: every anchor pointing at
/// a `/movies/` detail path, with titles from the anchor/card and a slug
/// fallback. A record with neither an anchor title nor a letters-bearing
/// slug is dropped entirely.
pub(crate) fn parse_page(html: &str, page_url: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse(r#"a[href*="/movies/"]"#).expect("valid selector");

    let mut records = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(detail_url) = absolutize(page_url, href) else { continue };
        if !detail_url.contains("/movies/") {
            continue;
        }

        let root = card_root(&anchor);
        let seed_title = strip_title_noise(&seed_title_for(&anchor, &root));
        let lookup_title = title_from_slug(&detail_url);
        if !usable_title(&seed_title) && !usable_title(&lookup_title) {
            continue;
        }

        let description = card_description(&root);
        let release_info = card_release_info(&root);
        let year = release_info.as_deref().and_then(extract_year);

        records.push(RawRecord {
            detail_url,
            seed_title,
            lookup_title,
            description,
            release_info,
            year,
            poster: extract_poster(&root, page_url),
            imdb_id: extract_imdb_id(&element_text(&root)),
            genres: Vec::new(),
        });
    }
    records
}

/// A usable title has at least two characters and contains letters.
fn usable_title(title: &str) -> bool {
    title.chars().count() >= 2 && title.chars().any(|c| c.is_alphabetic())
}

fn seed_title_for(anchor: &ElementRef<'_>, root: &ElementRef<'_>) -> String {
    for attr in ["title", "aria-label"] {
        if let Some(value) = anchor.value().attr(attr) {
            let value = sanitize(value);
            if !value.is_empty() {
                return value;
            }
        }
    }
    let heading_selector = Selector::parse("h1, h2, h3, h4, .title").expect("valid selector");
    if let Some(heading) = root.select(&heading_selector).next() {
        let text = element_text(&heading);
        if !text.is_empty() {
            return text;
        }
    }
    element_text(anchor)
}

/// Nearest card-like ancestor of an anchor; an enclosing `.item` container
/// wins over anything closer, matching how the site nests its listing grid.
fn card_root<'a>(anchor: &ElementRef<'a>) -> ElementRef<'a> {
    let mut nearest: Option<ElementRef<'a>> = None;
    let mut current = anchor.parent();
    while let Some(node) = current {
        if let Some(el) = ElementRef::wrap(node) {
            if has_class(&el, "item") {
                return el;
            }
            if nearest.is_none() && is_cardish(&el) {
                nearest = Some(el);
            }
        }
        current = node.parent();
    }
    nearest.unwrap_or(*anchor)
}

fn is_cardish(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "article" | "li" | "div")
        || has_class(element, "card")
        || has_class(element, "movie-box")
}

fn card_description(root: &ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("p, .description, .lead").expect("valid selector");
    root.select(&selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

fn card_release_info(root: &ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("time").expect("valid selector");
    let time = root.select(&selector).next()?;
    time.value()
        .attr("datetime")
        .map(sanitize)
        .filter(|t| !t.is_empty())
        .or_else(|| Some(element_text(&time)).filter(|t| !t.is_empty()))
}

pub(crate) fn extract_imdb_id(text: &str) -> Option<String> {
    let re = Regex::new(r"(?i)tt[0-9]{5,10}").expect("valid regex");
    re.find(text).map(|m| m.as_str().to_lowercase())
}

// --- Poster extraction ---

/// Gather poster candidates from lazy-load attributes, responsive source
/// sets and inline background styles, keep real image URLs, and prefer the
/// site's own thumb/profile assets. Small thumbs are upscaled to w500.
fn extract_poster(root: &ElementRef<'_>, page_url: &str) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();

    let img_selector = Selector::parse("img").expect("valid selector");
    for img in root.select(&img_selector) {
        let value = img.value();
        for attr in ["data-original", "data-src"] {
            if let Some(v) = value.attr(attr) {
                candidates.push(v.to_string());
            }
        }
        for attr in ["data-srcset", "srcset"] {
            if let Some(best) = value.attr(attr).and_then(best_srcset_candidate) {
                candidates.push(best);
            }
        }
        if let Some(v) = value.attr("src") {
            candidates.push(v.to_string());
        }
    }

    let lazy_selector = Selector::parse("[data-src]").expect("valid selector");
    for el in root.select(&lazy_selector) {
        if let Some(v) = el.value().attr("data-src") {
            candidates.push(v.to_string());
        }
    }

    let style_selector = Selector::parse(r#"[style*="background-image"]"#).expect("valid selector");
    for el in root.select(&style_selector) {
        if let Some(v) = el.value().attr("style").and_then(style_background_url) {
            candidates.push(v);
        }
    }

    let image_re = Regex::new(r"(?i)\.(jpe?g|png|webp)(\?|$)").expect("valid regex");
    let noise_re = Regex::new(r"(?i)logo|icon|sprite|ajax-loader").expect("valid regex");

    let mut resolved: Vec<String> = candidates
        .iter()
        .filter_map(|c| absolutize(page_url, c))
        .filter(|u| image_re.is_match(u))
        .filter(|u| !noise_re.is_match(u))
        .collect();

    // Stable: site-hosted assets first, page order otherwise.
    resolved.sort_by_key(|u| -poster_quality_score(u));
    resolved.first().map(|u| upscale_poster(u))
}

/// Highest-resolution candidate from a srcset attribute.
fn best_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|part| {
            let mut it = part.split_whitespace();
            let url = it.next()?;
            let width: u32 = it
                .next()
                .map(|size| size.chars().filter(|c| c.is_ascii_digit()).collect::<String>())
                .and_then(|digits| digits.parse().ok())
                .unwrap_or(0);
            Some((url.to_string(), width))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| url)
}

fn style_background_url(style: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)background-image\s*:\s*url\((['"]?)([^)'"\s]+)\1\)"#)
        .expect("valid regex");
    re.captures(style).map(|c| c[2].to_string())
}

/// Rewrite small `/static/thumb/wNNN/` poster URLs to the w500 rendition.
pub(crate) fn upscale_poster(poster_url: &str) -> String {
    let re = Regex::new(r"(?i)/static/thumb/w(\d+)/").expect("valid regex");
    if let Some(caps) = re.captures(poster_url) {
        if let Ok(width) = caps[1].parse::<u32>() {
            if width > 0 && width < 500 {
                return re.replace(poster_url, "/static/thumb/w500/").to_string();
            }
        }
    }
    poster_url.to_string()
}

pub(crate) fn poster_quality_score(poster_url: &str) -> i32 {
    let mut score = 1;
    let lower = poster_url.to_lowercase();
    if Regex::new(r"(?i)/static/[^?]*\.(jpe?g|png|webp)(\?|$)")
        .expect("valid regex")
        .is_match(poster_url)
    {
        score += 1;
    }
    if lower.contains("/static/thumb/") {
        score -= 1;
    }
    if lower.contains("/static/profiles/") {
        score += 3;
    }
    if Regex::new(r"(?i)/static/thumb/w\d+/[0-9]{4}t/")
        .expect("valid regex")
        .is_match(poster_url)
    {
        score -= 2;
    }
    score
}

// --- Entity mapping ---

fn to_entity(record: &RawRecord, media_type: MediaType) -> Option<CanonicalEntity> {
    let name = strip_title_noise(record.display_name());
    if !usable_title(&name) {
        return None;
    }

    let imdb_id = record.imdb_id.clone();
    let poster = imdb_id
        .as_deref()
        .map(cinemeta_poster)
        .or_else(|| record.poster.clone());

    Some(CanonicalEntity {
        id: entity_id("mafab", &record.detail_url, imdb_id.as_deref()),
        media_type,
        name,
        poster,
        description: record.description.clone(),
        release_info: record
            .release_info
            .clone()
            .or_else(|| record.year.map(|y| y.to_string())),
        imdb_id,
        website: Some(record.detail_url.clone()),
        genres: None,
    })
}

// --- Adapter ---

pub struct MafabAdapter {
    fetcher: Arc<dyn FetchPage>,
    resolver: IdentityResolver,
    page_cache: TtlCache<String, String>,
    entity_cache: TtlCache<String, CanonicalEntity>,
    enrich_concurrency: usize,
    enrich_max_items: usize,
    external_links: bool,
}

impl MafabAdapter {
    pub fn new(
        config: &Config,
        external_links: bool,
        tmdb: Arc<TmdbClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timeout = std::time::Duration::from_millis(config.http_timeout_ms);
        Self::with_fetcher(
            config,
            external_links,
            tmdb,
            clock,
            Arc::new(PageFetcher::new(timeout)),
        )
    }

    /// Assemble the adapter around an explicit page fetcher.
    pub fn with_fetcher(
        config: &Config,
        external_links: bool,
        tmdb: Arc<TmdbClient>,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn FetchPage>,
    ) -> Self {
        let timeout = std::time::Duration::from_millis(config.http_timeout_ms);
        let autocomplete =
            AutocompleteClient::new(AUTOCOMPLETE_URL, timeout, lookup_ttl(), clock.clone());
        Self {
            fetcher,
            resolver: IdentityResolver::new(autocomplete, tmdb, BASE_URL),
            page_cache: TtlCache::new(page_ttl(), clock.clone()),
            entity_cache: TtlCache::new(entity_ttl(), clock),
            enrich_concurrency: config.enrich_concurrency,
            enrich_max_items: config.enrich_max_items,
            external_links,
        }
    }

    async fn fetch_listing(&self, url: &str) -> crate::error::Result<String> {
        if let Some(cached) = self.page_cache.get(&url.to_string()) {
            return Ok(cached);
        }
        let body = self.fetcher.fetch(url).await?;
        self.page_cache.insert(url.to_string(), body.clone());
        Ok(body)
    }

    fn media_type_for(&self, query: &CatalogQuery) -> MediaType {
        if query.catalog_id == "mafab-series" || query.media_type == MediaType::Series {
            MediaType::Series
        } else {
            MediaType::Movie
        }
    }

    async fn resolve_catalog(&self, query: &CatalogQuery) -> CatalogPage {
        let urls = catalog_urls(&query.catalog_id);
        let fetches = urls.iter().map(|url| self.fetch_listing(url));
        let settled = futures::future::join_all(fetches).await;

        // Concatenate in URL declaration order regardless of completion order.
        let mut records = Vec::new();
        let mut warnings = Vec::new();
        for (url, result) in urls.iter().zip(settled) {
            match result {
                Ok(html) => records.extend(parse_page(&html, url)),
                Err(error) => {
                    warn!(url, error = %error, "Listing fetch failed");
                    warnings.push(format!("{url}: {error}"));
                }
            }
        }

        let records = pipeline::merge_records(records);
        let media_type = self.media_type_for(query);
        let records = pipeline::enrich_records(
            records,
            &self.resolver,
            media_type,
            self.enrich_concurrency,
            self.enrich_max_items,
        )
        .await;

        let entities: Vec<CanonicalEntity> = records
            .iter()
            .filter_map(|r| to_entity(r, media_type))
            .collect();
        let entities = pipeline::dedupe_by_name(entities);
        let entities = pipeline::partition_by_poster(entities);
        let entities = match query.genre.as_deref() {
            Some(genre) => pipeline::filter_by_genre(entities, genre),
            None => entities,
        };

        for entity in &entities {
            self.entity_cache.insert(entity.id.clone(), entity.clone());
        }

        info!(
            catalog_id = %query.catalog_id,
            total = entities.len(),
            warnings = warnings.len(),
            "Catalog pass complete"
        );

        let entities = pipeline::paginate(entities, query.skip, query.limit);
        CatalogPage {
            source: SOURCE_NAME.to_string(),
            skip: query.skip,
            limit: query.limit,
            entities,
            warnings,
        }
    }
}

#[async_trait]
impl CatalogAdapter for MafabAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn handles_catalog(&self, catalog_id: &str) -> bool {
        catalog_id.starts_with("mafab-") || catalog_id == "hu-mixed"
    }

    async fn fetch_catalog(&self, query: &CatalogQuery) -> CatalogPage {
        self.resolve_catalog(query).await
    }

    async fn fetch_entity(&self, id: &str) -> Option<CanonicalEntity> {
        if let Some(entity) = self.entity_cache.get(&id.to_string()) {
            return Some(entity);
        }

        // Miss: one full unpaginated pass per media type, movie first.
        for (catalog_id, media_type) in
            [("hu-mixed", MediaType::Movie), ("mafab-series", MediaType::Series)]
        {
            let mut query = CatalogQuery::new(catalog_id, media_type);
            query.limit = FULL_PASS_LIMIT;
            let page = self.resolve_catalog(&query).await;
            if let Some(entity) = page.entities.into_iter().find(|e| e.id == id) {
                return Some(entity);
            }
        }
        None
    }

    async fn fetch_stream_refs(&self, id: &str) -> Vec<StreamRef> {
        if !self.external_links {
            return Vec::new();
        }
        let Some(entity) = self.fetch_entity(id).await else {
            return Vec::new();
        };
        let Some(website) = entity.website else {
            return Vec::new();
        };
        vec![StreamRef {
            name: "Mafab".to_string(),
            title: "Open on Mafab".to_string(),
            external_url: website,
        }]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::cache::SystemClock;
    use crate::error::SourceError;

    use super::*;

    #[test]
    fn catalog_urls_always_use_www_host() {
        for catalog_id in [
            "mafab-movies",
            "mafab-series",
            "mafab-streaming",
            "mafab-cinema",
            "mafab-year-window",
            "hu-mixed",
        ] {
            for url in catalog_urls(catalog_id) {
                assert!(url.starts_with("https://www.mafab.hu/"), "{catalog_id}: {url}");
            }
        }
    }

    #[test]
    fn streaming_provider_splits_are_configured() {
        assert_eq!(
            catalog_urls("mafab-streaming-netflix"),
            vec!["https://www.mafab.hu/vod/top-streaming/netflix".to_string()]
        );
        assert_eq!(
            catalog_urls("mafab-streaming-apple-tv"),
            vec!["https://www.mafab.hu/vod/top-streaming/appletv".to_string()]
        );
    }

    #[test]
    fn year_window_catalogs_carry_year_params() {
        let window = &catalog_urls("mafab-year-window")[0];
        let best = &catalog_urls("mafab-best-current-year")[0];
        let gross = &catalog_urls("mafab-total-gross")[0];

        let window_re = Regex::new(r"yrf=\d{4}&yrt=\d{4}").unwrap();
        assert!(window_re.is_match(window), "{window}");
        assert!(window_re.is_match(best), "{best}");
        assert!(
            Regex::new(r"year_from=\d{4}&year_to=\d{4}").unwrap().is_match(gross),
            "{gross}"
        );
    }

    #[test]
    fn parse_page_extracts_titles_and_detail_url() {
        let html = r#"
            <div class="item">
              <a href="/movies/a-keresztapa-2551.html" title="A keresztapa">A keresztapa</a>
            </div>
        "#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.detail_url, "https://www.mafab.hu/movies/a-keresztapa-2551.html");
        assert_eq!(record.seed_title, "A keresztapa");
        assert_eq!(record.lookup_title, "A Keresztapa");
        assert_eq!(record.description, None);
        assert_eq!(record.year, None);
    }

    #[test]
    fn parse_page_keeps_numeric_slug_when_anchor_title_is_valid() {
        let html = r#"
            <div class="item">
              <a href="/movies/623207.html" title="Nuremberg">Nuremberg</a>
            </div>
        "#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seed_title, "Nuremberg");
        assert_eq!(records[0].lookup_title, "");
    }

    #[test]
    fn parse_page_drops_numeric_slug_without_any_title() {
        let html = r#"<div class="item"><a href="/movies/623207.html"><img src="/x.jpg"></a></div>"#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");
        assert!(records.is_empty());
    }

    #[test]
    fn parse_page_strips_rank_noise_from_anchor_titles() {
        let html = r#"
            <div class="item">
              <a href="/movies/marty-supreme-90210.html">88 Marty Supreme</a>
            </div>
        "#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");
        assert_eq!(records[0].seed_title, "Marty Supreme");
    }

    #[test]
    fn parse_page_picks_highest_resolution_srcset_candidate() {
        let html = r#"
            <div class="item">
              <a href="/movies/dune-12345.html" title="Dűne">Dűne</a>
              <img srcset="/static/thumb/w90/d.jpg 90w, /static/thumb/w342/d.jpg 342w" src="/static/thumb/w90/d.jpg">
            </div>
        "#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");
        // 342w wins over 90w, then the small thumb upscales to w500.
        assert_eq!(
            records[0].poster.as_deref(),
            Some("https://www.mafab.hu/static/thumb/w500/d.jpg")
        );
    }

    #[test]
    fn poster_extraction_ignores_logo_assets() {
        let html = r#"
            <div class="item">
              <a href="/movies/dune-12345.html" title="Dűne">Dűne</a>
              <img src="/static/site-logo.png">
            </div>
        "#;
        let records = parse_page(html, "https://www.mafab.hu/filmek/filmek/");
        assert_eq!(records[0].poster, None);
    }

    #[test]
    fn upscale_leaves_large_renditions_alone() {
        assert_eq!(
            upscale_poster("https://www.mafab.hu/static/thumb/w500/d.jpg"),
            "https://www.mafab.hu/static/thumb/w500/d.jpg"
        );
        assert_eq!(
            upscale_poster("https://img.example.com/d.jpg"),
            "https://img.example.com/d.jpg"
        );
    }

    #[test]
    fn imdb_ids_surface_from_card_text() {
        assert_eq!(extract_imdb_id("see tt0068646 on imdb").as_deref(), Some("tt0068646"));
        assert_eq!(extract_imdb_id("nothing"), None);
    }

    #[test]
    fn to_entity_uses_cinemeta_poster_and_imdb_id() {
        let record = RawRecord {
            detail_url: "https://www.mafab.hu/movies/a-keresztapa-2551.html".into(),
            seed_title: "The Godfather".into(),
            lookup_title: "The Godfather".into(),
            imdb_id: Some("tt0068646".into()),
            ..RawRecord::default()
        };
        let entity = to_entity(&record, MediaType::Movie).unwrap();
        assert_eq!(entity.id, "tt0068646");
        assert_eq!(
            entity.poster.as_deref(),
            Some("https://images.metahub.space/poster/medium/tt0068646/img")
        );
    }

    #[test]
    fn to_entity_falls_back_to_slug_title_and_url_id() {
        let record = RawRecord {
            detail_url: "https://www.mafab.hu/movies/the-roses-81432.html".into(),
            seed_title: String::new(),
            lookup_title: "The Roses".into(),
            ..RawRecord::default()
        };
        let entity = to_entity(&record, MediaType::Movie).unwrap();
        assert_eq!(entity.name, "The Roses");
        assert_eq!(entity.id, "mafab:the-roses-81432");
    }

    struct ScriptedFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl FetchPage for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> crate::error::Result<String> {
            match self.pages.get(url) {
                Some(html) => Ok(html.clone()),
                None => Err(SourceError::Timeout { url: url.to_string() }),
            }
        }
    }

    fn listing_card(title: &str, slug: &str, imdb: &str) -> String {
        format!(
            r#"<div class="item">
                 <a href="/movies/{slug}.html" title="{title}">{title}</a>
                 <span>{imdb}</span>
               </div>"#
        )
    }

    fn test_adapter(pages: HashMap<String, String>) -> MafabAdapter {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tmdb = Arc::new(TmdbClient::new(
            "test-key",
            std::time::Duration::from_millis(250),
            lookup_ttl(),
            clock.clone(),
        ));
        MafabAdapter::with_fetcher(
            &Config::default(),
            true,
            tmdb,
            clock,
            Arc::new(ScriptedFetcher { pages }),
        )
    }

    #[tokio::test]
    async fn failed_listing_degrades_to_partial_results_and_one_warning() {
        // hu-mixed spans four listings; the cinema one is left unscripted and
        // times out. Cards carry imdb ids so no lookups run.
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.mafab.hu/filmek/filmek/".to_string(),
            listing_card("Egy", "egy-1", "tt0000001"),
        );
        pages.insert(
            "https://www.mafab.hu/sorozatok/sorozatok/".to_string(),
            listing_card("Kettő", "ketto-2", "tt0000002"),
        );
        pages.insert(
            "https://www.mafab.hu/vod/top-streaming".to_string(),
            listing_card("Három", "harom-3", "tt0000003"),
        );
        let adapter = test_adapter(pages);

        let page = adapter
            .fetch_catalog(&CatalogQuery::new("hu-mixed", MediaType::Movie))
            .await;

        let ids: Vec<&str> = page.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["tt0000001", "tt0000002", "tt0000003"]);
        assert_eq!(page.warnings.len(), 1);
        assert!(
            page.warnings[0].contains("jelenleg-a-mozikban"),
            "warning names the failed URL: {}",
            page.warnings[0]
        );
    }

    #[tokio::test]
    async fn all_listings_failing_yields_empty_page_with_warnings() {
        let adapter = test_adapter(HashMap::new());

        let page = adapter
            .fetch_catalog(&CatalogQuery::new("mafab-movies", MediaType::Movie))
            .await;

        assert!(page.entities.is_empty());
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn to_entity_supports_series() {
        let record = RawRecord {
            detail_url: "https://www.mafab.hu/movies/sorsugynokseg-1.html".into(),
            seed_title: "Sorsügynökség".into(),
            imdb_id: Some("tt1234567".into()),
            ..RawRecord::default()
        };
        let entity = to_entity(&record, MediaType::Series).unwrap();
        assert_eq!(entity.media_type, MediaType::Series);
    }
}
