// port.hu adapter. The site embeds JSON-LD metadata blocks on its listing
// pages, so structured data is the primary parse strategy and DOM cards are
// the fallback; both passes run and their union goes through dedup. Stricter
// identity policy than mafab: an entity that still has no imdb id after
// enrichment is dropped rather than served under a site-local id.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
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

pub const SOURCE_NAME: &str = "port.hu";
const BASE_URL: &str = "https://port.hu";
const SUGGEST_URL: &str = "https://port.hu/search/suggest";
const FULL_PASS_LIMIT: usize = 250;

/// port.hu detail URLs end in the site id segment (`movie-12345`); the
/// human-readable slug sits one segment earlier, so the id segment is cut
/// before slug-to-title conversion.
fn lookup_title_for(detail_url: &str) -> String {
    let id_re = Regex::new(r"(?i)/(movie|series|tvseries|event)-\d+/?$").expect("valid regex");
    title_from_slug(&id_re.replace(detail_url, ""))
}

/// The homepage carries a featured-titles block for both media types, so it
/// is always the last listing in the set.
fn catalog_urls(catalog_id: &str, media_type: MediaType) -> Vec<String> {
    match (catalog_id, media_type) {
        ("porthu-movies", _) | (_, MediaType::Movie) => vec![
            format!("{BASE_URL}/film"),
            format!("{BASE_URL}/mozi"),
            BASE_URL.to_string(),
        ],
        ("porthu-series", _) | (_, MediaType::Series) => vec![
            format!("{BASE_URL}/tv"),
            format!("{BASE_URL}/sorozat"),
            BASE_URL.to_string(),
        ],
    }
}

// --- JSON-LD parsing ---

/// Records from the page's `application/ld+json` blocks. Accepts bare
/// objects, arrays, `@graph` wrappers and `ItemList` nesting; anything that
/// is not a recognized creative-work node is skipped silently. Unlike the
/// DOM pass, structured-data nodes are kept whatever path their URL uses.
pub(crate) fn parse_json_ld(html: &str, page_url: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector");

    let mut records = Vec::new();
    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => collect_ld_nodes(&value, page_url, &mut records),
            Err(error) => warn!(page_url, error = %error, "Unparseable JSON-LD block"),
        }
    }
    records
}

fn collect_ld_nodes(value: &Value, page_url: &str, out: &mut Vec<RawRecord>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_ld_nodes(item, page_url, out);
            }
        }
        Value::Object(map) => {
            for nested in ["@graph", "itemListElement", "item"] {
                if let Some(inner) = map.get(nested) {
                    collect_ld_nodes(inner, page_url, out);
                }
            }
            if let Some(record) = ld_record(map, page_url) {
                out.push(record);
            }
        }
        _ => {}
    }
}

fn ld_record(map: &serde_json::Map<String, Value>, page_url: &str) -> Option<RawRecord> {
    if !ld_type_matches(map.get("@type")?) {
        return None;
    }
    let url = map.get("url").and_then(Value::as_str)?;
    let detail_url = absolutize(page_url, url)?;

    let seed_title = map
        .get("name")
        .and_then(Value::as_str)
        .map(|name| strip_title_noise(&sanitize(name)))
        .unwrap_or_default();
    let release_info = map
        .get("datePublished")
        .and_then(Value::as_str)
        .map(sanitize)
        .filter(|d| !d.is_empty());

    Some(RawRecord {
        // The structured-data name is authoritative; slugs only fill in for
        // nameless nodes.
        lookup_title: if seed_title.is_empty() {
            lookup_title_for(&detail_url)
        } else {
            String::new()
        },
        description: map
            .get("description")
            .and_then(Value::as_str)
            .map(sanitize)
            .filter(|d| !d.is_empty()),
        year: release_info.as_deref().and_then(extract_year),
        release_info,
        poster: ld_image(map.get("image")).and_then(|img| absolutize(page_url, &img)),
        imdb_id: None,
        genres: ld_genres(map.get("genre")),
        seed_title,
        detail_url,
    })
}

/// `@type` is a string or an array of strings in the wild.
fn ld_type_matches(value: &Value) -> bool {
    let wanted = |t: &str| matches!(t, "Movie" | "TVSeries" | "CreativeWork");
    match value {
        Value::String(t) => wanted(t),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(wanted),
        _ => false,
    }
}

/// `image` is a bare URL string or an ImageObject with a `url` field.
fn ld_image(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.first().and_then(|v| ld_image(Some(v))),
        _ => None,
    }
}

fn ld_genres(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(genre)) => vec![sanitize(genre)],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(sanitize)
            .filter(|g| !g.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

// --- DOM card parsing ---

/// Fallback pass over detail-page anchors for listings that carry no usable
/// structured data.
pub(crate) fn parse_cards(html: &str, page_url: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse(r#"a[href*="/adatlap/"]"#).expect("valid selector");

    let mut records = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(detail_url) = absolutize(page_url, href) else { continue };
        if !detail_url.contains("/adatlap/") {
            continue;
        }

        let root = card_root(&anchor);
        let seed_title = strip_title_noise(&anchor_title(&anchor, &root));
        let lookup_title = if seed_title.is_empty() {
            lookup_title_for(&detail_url)
        } else {
            String::new()
        };
        if seed_title.is_empty() && lookup_title.is_empty() {
            continue;
        }

        let release_info = card_time_hint(&root);
        records.push(RawRecord {
            year: release_info.as_deref().and_then(extract_year),
            release_info,
            description: card_description(&root),
            poster: card_poster(&root, page_url),
            imdb_id: None,
            genres: Vec::new(),
            seed_title,
            lookup_title,
            detail_url,
        });
    }
    records
}

fn card_root<'a>(anchor: &ElementRef<'a>) -> ElementRef<'a> {
    let mut current = anchor.parent();
    while let Some(node) = current {
        if let Some(el) = ElementRef::wrap(node) {
            if matches!(el.value().name(), "article" | "li")
                || has_class(&el, "card")
                || has_class(&el, "item")
            {
                return el;
            }
        }
        current = node.parent();
    }
    *anchor
}

fn anchor_title(anchor: &ElementRef<'_>, root: &ElementRef<'_>) -> String {
    if let Some(title) = anchor.value().attr("title") {
        let title = sanitize(title);
        if !title.is_empty() {
            return title;
        }
    }
    let text = element_text(anchor);
    if !text.is_empty() {
        return text;
    }
    let heading_selector = Selector::parse("h1, h2, h3, .title").expect("valid selector");
    root.select(&heading_selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

fn card_description(root: &ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("p, .description").expect("valid selector");
    root.select(&selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

fn card_time_hint(root: &ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("time, .date").expect("valid selector");
    let hint = root.select(&selector).next()?;
    hint.value()
        .attr("datetime")
        .map(sanitize)
        .filter(|t| !t.is_empty())
        .or_else(|| Some(element_text(&hint)).filter(|t| !t.is_empty()))
}

fn card_poster(root: &ElementRef<'_>, page_url: &str) -> Option<String> {
    let image_re = Regex::new(r"(?i)\.(jpe?g|png|webp)(\?|$)").expect("valid regex");
    let img_selector = Selector::parse("img").expect("valid selector");

    for img in root.select(&img_selector) {
        for attr in ["data-original", "data-src", "src"] {
            let Some(candidate) = img.value().attr(attr) else { continue };
            let Some(url) = absolutize(page_url, candidate) else { continue };
            if image_re.is_match(&url) {
                return Some(url);
            }
        }
    }
    None
}

// --- Entity mapping ---

/// Strict policy: no imdb id after enrichment means the record is dropped.
/// Site ids (`movie-12345` slugs) never surface as canonical ids here.
fn to_entity(record: &RawRecord, media_type: MediaType) -> Option<CanonicalEntity> {
    let imdb_id = record.imdb_id.clone()?;
    let name = strip_title_noise(record.display_name());
    if name.is_empty() {
        return None;
    }

    Some(CanonicalEntity {
        id: entity_id("porthu", &record.detail_url, Some(&imdb_id)),
        media_type,
        name,
        poster: Some(cinemeta_poster(&imdb_id)),
        description: record.description.clone(),
        release_info: record
            .release_info
            .clone()
            .or_else(|| record.year.map(|y| y.to_string())),
        imdb_id: Some(imdb_id),
        website: Some(record.detail_url.clone()),
        genres: if record.genres.is_empty() {
            None
        } else {
            Some(record.genres.clone())
        },
    })
}

// --- Adapter ---

pub struct PorthuAdapter {
    fetcher: Arc<dyn FetchPage>,
    resolver: IdentityResolver,
    page_cache: TtlCache<String, String>,
    entity_cache: TtlCache<String, CanonicalEntity>,
    enrich_concurrency: usize,
    enrich_max_items: usize,
    external_links: bool,
}

impl PorthuAdapter {
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
            AutocompleteClient::new(SUGGEST_URL, timeout, lookup_ttl(), clock.clone());
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
        if query.catalog_id == "porthu-series" || query.media_type == MediaType::Series {
            MediaType::Series
        } else {
            MediaType::Movie
        }
    }

    async fn resolve_catalog(&self, query: &CatalogQuery) -> CatalogPage {
        let media_type = self.media_type_for(query);
        let urls = catalog_urls(&query.catalog_id, media_type);
        let fetches = urls.iter().map(|url| self.fetch_listing(url));
        let settled = futures::future::join_all(fetches).await;

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        for (url, result) in urls.iter().zip(settled) {
            match result {
                Ok(html) => {
                    // Structured data first, DOM cards as the fallback union.
                    records.extend(parse_json_ld(&html, url));
                    records.extend(parse_cards(&html, url));
                }
                Err(error) => {
                    warn!(url, error = %error, "Listing fetch failed");
                    warnings.push(format!("{url}: {error}"));
                }
            }
        }

        let records = pipeline::merge_records(records);
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
impl CatalogAdapter for PorthuAdapter {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn handles_catalog(&self, catalog_id: &str) -> bool {
        catalog_id.starts_with("porthu-")
    }

    async fn fetch_catalog(&self, query: &CatalogQuery) -> CatalogPage {
        self.resolve_catalog(query).await
    }

    async fn fetch_entity(&self, id: &str) -> Option<CanonicalEntity> {
        if let Some(entity) = self.entity_cache.get(&id.to_string()) {
            return Some(entity);
        }

        for (catalog_id, media_type) in
            [("porthu-movies", MediaType::Movie), ("porthu-series", MediaType::Series)]
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
            name: "PORT.hu".to_string(),
            title: "Open on PORT.hu".to_string(),
            external_url: website,
        }]
    }
}
