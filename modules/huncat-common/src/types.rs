use serde::{Deserialize, Serialize};

use crate::hash::short_hash;

// --- Media type ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaType::Movie),
            "series" => Some(MediaType::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Series => write!(f, "series"),
        }
    }
}

// --- Parser output ---

/// One candidate listing extracted from a catalog page. Ephemeral: lives for
/// a single fetch cycle, deduplicated within a source by `detail_url`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Absolute detail-page URL; the within-source dedup key.
    pub detail_url: String,
    /// Title as it appeared on the page (anchor text / title attribute).
    pub seed_title: String,
    /// Title rebuilt from the detail URL slug; `""` for numeric-only slugs.
    pub lookup_title: String,
    pub description: Option<String>,
    pub release_info: Option<String>,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: Vec<String>,
}

impl RawRecord {
    /// Best display name for this record: the slug-derived title reads
    /// cleaner than raw anchor text, so it wins when present.
    pub fn display_name(&self) -> &str {
        if !self.lookup_title.is_empty() {
            &self.lookup_title
        } else {
            &self.seed_title
        }
    }

    /// Best title to seed a lookup query with.
    pub fn lookup_seed(&self) -> &str {
        if !self.seed_title.is_empty() {
            &self.seed_title
        } else {
            &self.lookup_title
        }
    }
}

// --- Canonical entities ---

/// The deduplicated, externally-addressable representation of one title, in
/// the JSON shape the catalog-protocol consumer expects. Never mutated after
/// construction: replace, don't patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "releaseInfo", skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

/// Outbound navigation link served for an entity. External navigation only,
/// never a media URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRef {
    pub name: String,
    pub title: String,
    #[serde(rename = "externalUrl")]
    pub external_url: String,
}

/// One resolved catalog page. Transient result object, not persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogPage {
    pub source: String,
    pub skip: usize,
    pub limit: usize,
    pub entities: Vec<CanonicalEntity>,
    pub warnings: Vec<String>,
}

// --- Identity rules ---

/// Canonical entity id: the imdb id when resolved, otherwise a deterministic
/// source-scoped fallback derived from the detail URL (never from the name).
pub fn entity_id(source: &str, detail_url: &str, imdb_id: Option<&str>) -> String {
    if let Some(imdb) = imdb_id {
        return imdb.to_string();
    }
    if let Some(slug) = url_slug(detail_url) {
        return format!("{source}:{slug}");
    }
    format!("{source}:h-{}", short_hash(&format!("{source}:{detail_url}")))
}

/// Last path segment of a detail URL, lowercased, without the `.html`
/// suffix. None when the URL has no usable segment.
pub fn url_slug(detail_url: &str) -> Option<String> {
    let segment = detail_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .split(['?', '#'])
        .next()?;
    let segment = segment.strip_suffix(".html").unwrap_or(segment);
    if segment.is_empty() || segment.contains(':') || !segment.chars().any(|c| c.is_alphanumeric())
    {
        return None;
    }
    Some(segment.to_lowercase())
}

/// Cinemeta-hosted poster for an imdb id; preferred over any scraped poster.
pub fn cinemeta_poster(imdb_id: &str) -> String {
    format!("https://images.metahub.space/poster/medium/{imdb_id}/img")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uses_imdb_id_when_resolved() {
        let id = entity_id(
            "mafab",
            "https://www.mafab.hu/movies/a-keresztapa-2551.html",
            Some("tt0068646"),
        );
        assert_eq!(id, "tt0068646");
    }

    #[test]
    fn entity_id_falls_back_to_url_slug() {
        let id = entity_id(
            "mafab",
            "https://www.mafab.hu/movies/ismeretlen-film-1.html",
            None,
        );
        assert_eq!(id, "mafab:ismeretlen-film-1");
    }

    #[test]
    fn entity_id_is_deterministic() {
        let first = entity_id("mafab", "https://www.mafab.hu/movies/x.html", None);
        let second = entity_id("mafab", "https://www.mafab.hu/movies/x.html", None);
        assert_eq!(first, second);
    }

    #[test]
    fn entity_id_hashes_slugless_urls_from_the_url_not_the_name() {
        let id = entity_id("porthu", "urn:porthu:", None);
        assert!(id.starts_with("porthu:h-"), "got {id}");
        assert_eq!(id.len(), "porthu:h-".len() + 24);
    }

    #[test]
    fn cinemeta_poster_shape() {
        assert_eq!(
            cinemeta_poster("tt0068646"),
            "https://images.metahub.space/poster/medium/tt0068646/img"
        );
    }

    #[test]
    fn entity_serializes_to_consumer_shape() {
        let entity = CanonicalEntity {
            id: "tt0068646".into(),
            media_type: MediaType::Movie,
            name: "A keresztapa".into(),
            poster: Some(cinemeta_poster("tt0068646")),
            description: None,
            release_info: Some("1972".into()),
            imdb_id: Some("tt0068646".into()),
            website: Some("https://www.mafab.hu/movies/a-keresztapa-2551.html".into()),
            genres: None,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["releaseInfo"], "1972");
        assert!(json.get("description").is_none());
        assert!(json.get("genres").is_none());
    }
}
