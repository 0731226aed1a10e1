// Scoring of secondary-lookup candidates against a scraped record. The
// strongest signal is detail-URL slug equality; everything else is a soft
// signal. Candidates outside the requested media type never beat in-category
// candidates, no matter the raw score.

use serde::Deserialize;
use url::Url;

use huncat_common::text::{comparison_key, extract_year, sanitize, strip_title_noise};
use huncat_common::types::{url_slug, MediaType, RawRecord};

/// One autocomplete entry. The endpoints are loosely typed and drift between
/// sites, so every field is optional and the common spellings are aliased.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutocompleteCandidate {
    #[serde(default, alias = "category", alias = "type")]
    pub cat: Option<String>,
    #[serde(default, alias = "title", alias = "name", alias = "value")]
    pub label: Option<String>,
    #[serde(default, alias = "id", alias = "url", alias = "href")]
    pub link: Option<String>,
}

/// A scored candidate. Transient output of the matching step.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub title: String,
    pub year: Option<i32>,
    pub url: Option<String>,
    pub score: i32,
    pub category_match: bool,
}

const SCORE_SLUG_MATCH: i32 = 100;
const SCORE_EXACT_TITLE: i32 = 40;
const SCORE_CATEGORY: i32 = 25;
const SCORE_SUBSTRING: i32 = 15;
const SCORE_HAS_YEAR: i32 = 5;

/// Split an autocomplete label into clean title text and a year:
/// `"<strong>A keresztapa</strong> (1972) - film"` → `("A keresztapa", 1972)`.
pub fn parse_label(label: &str) -> (String, Option<i32>) {
    let tag_re = regex::Regex::new(r"<[^>]+>").expect("valid regex");
    let mut text = sanitize(&tag_re.replace_all(label, ""));
    if let Some(idx) = text.rfind(" - ") {
        text.truncate(idx);
    }
    let year = extract_year(&text);
    (strip_title_noise(&text), year)
}

/// Score one candidate against a record. None when the candidate carries no
/// usable label.
pub fn score_candidate(
    record: &RawRecord,
    media_type: MediaType,
    candidate: &AutocompleteCandidate,
    base_url: &str,
) -> Option<MatchCandidate> {
    let label = candidate.label.as_deref()?;
    let (title, year) = parse_label(label);
    if title.is_empty() {
        return None;
    }

    let url = candidate
        .link
        .as_deref()
        .and_then(|link| absolutize(base_url, link));

    let mut score = 0;

    let record_slug = url_slug(&record.detail_url);
    let candidate_slug = url.as_deref().and_then(url_slug);
    if record_slug.is_some() && record_slug == candidate_slug {
        score += SCORE_SLUG_MATCH;
    }

    let candidate_key = comparison_key(&title);
    let record_keys: Vec<String> = [record.seed_title.as_str(), record.lookup_title.as_str()]
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| comparison_key(t))
        .collect();
    if record_keys.iter().any(|k| *k == candidate_key) {
        score += SCORE_EXACT_TITLE;
    } else if record_keys
        .iter()
        .any(|k| !k.is_empty() && (k.contains(&candidate_key) || candidate_key.contains(k.as_str())))
    {
        score += SCORE_SUBSTRING;
    }

    let category_match = matches_category(candidate.cat.as_deref(), media_type);
    if category_match {
        score += SCORE_CATEGORY;
    }

    if year.is_some() {
        score += SCORE_HAS_YEAR;
    }

    Some(MatchCandidate {
        title,
        year,
        url,
        score,
        category_match,
    })
}

/// Pick the best-scoring candidate with score > 0. When any candidate matches
/// the requested media type, the final choice is restricted to that subset
/// even if a higher raw score exists outside it.
pub fn pick_best(
    record: &RawRecord,
    media_type: MediaType,
    candidates: &[AutocompleteCandidate],
    base_url: &str,
) -> Option<MatchCandidate> {
    let scored: Vec<MatchCandidate> = candidates
        .iter()
        .filter_map(|c| score_candidate(record, media_type, c, base_url))
        .filter(|c| c.score > 0)
        .collect();

    let pool: Vec<&MatchCandidate> = if scored.iter().any(|c| c.category_match) {
        scored.iter().filter(|c| c.category_match).collect()
    } else {
        scored.iter().collect()
    };

    // First maximum wins: ties resolve to the earlier candidate.
    pool.into_iter()
        .fold(None::<&MatchCandidate>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
        .cloned()
}

fn matches_category(cat: Option<&str>, media_type: MediaType) -> bool {
    let Some(cat) = cat else { return false };
    let cat = cat.to_lowercase();
    match media_type {
        MediaType::Movie => cat.contains("film") || cat.contains("movie"),
        MediaType::Series => {
            cat.contains("sorozat") || cat.contains("series") || cat.contains("tv")
        }
    }
}

fn absolutize(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let mut joined = base.join(href).ok()?;
    joined.set_fragment(None);
    Some(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cat: &str, label: &str, link: &str) -> AutocompleteCandidate {
        AutocompleteCandidate {
            cat: Some(cat.to_string()),
            label: Some(label.to_string()),
            link: Some(link.to_string()),
        }
    }

    fn record(seed: &str, lookup: &str, url: &str) -> RawRecord {
        RawRecord {
            detail_url: url.to_string(),
            seed_title: seed.to_string(),
            lookup_title: lookup.to_string(),
            ..RawRecord::default()
        }
    }

    #[test]
    fn parse_label_extracts_title_and_year() {
        let (title, year) = parse_label("<strong>A keresztapa</strong> (1972) - film");
        assert_eq!(title, "A keresztapa");
        assert_eq!(year, Some(1972));
    }

    #[test]
    fn parse_label_without_year_or_markup() {
        let (title, year) = parse_label("The Roses");
        assert_eq!(title, "The Roses");
        assert_eq!(year, None);
    }

    #[test]
    fn exact_slug_match_beats_title_approximation() {
        let record = record(
            "A keresztapa",
            "A Keresztapa",
            "https://www.mafab.hu/movies/a-keresztapa-2551.html",
        );
        let best = pick_best(
            &record,
            MediaType::Movie,
            &[
                candidate("movie", "A keresztapa 2 (1974)", "/movies/a-keresztapa-2-2597.html"),
                candidate("movie", "A keresztapa (1972)", "/movies/a-keresztapa-2551.html"),
            ],
            "https://www.mafab.hu",
        )
        .unwrap();

        assert_eq!(
            best.url.as_deref(),
            Some("https://www.mafab.hu/movies/a-keresztapa-2551.html")
        );
        assert_eq!(best.year, Some(1972));
    }

    #[test]
    fn in_category_candidates_win_over_higher_raw_scores() {
        let record = record(
            "Dűne",
            "Dune",
            "https://www.mafab.hu/movies/dune-12345.html",
        );
        // The series candidate has the exact slug (score 100+), but results
        // matching the requested movie category restrict the final choice.
        let best = pick_best(
            &record,
            MediaType::Movie,
            &[
                candidate("sorozat", "Dune (2021)", "/movies/dune-12345.html"),
                candidate("film", "Dune (2021)", "/movies/dune-part-one-99.html"),
            ],
            "https://www.mafab.hu",
        )
        .unwrap();

        assert!(best.category_match);
        assert_eq!(
            best.url.as_deref(),
            Some("https://www.mafab.hu/movies/dune-part-one-99.html")
        );
    }

    #[test]
    fn zero_score_candidates_are_never_picked() {
        let record = record(
            "Valami egészen más",
            "",
            "https://www.mafab.hu/movies/valami-1.html",
        );
        let best = pick_best(
            &record,
            MediaType::Movie,
            &[AutocompleteCandidate {
                cat: None,
                label: Some("Teljesen független cím".into()),
                link: Some("/movies/masik-2.html".into()),
            }],
            "https://www.mafab.hu",
        );
        assert!(best.is_none());
    }

    #[test]
    fn tolerates_missing_fields() {
        let parsed: Vec<AutocompleteCandidate> =
            serde_json::from_str(r#"[{"label":"X"},{"cat":"film"},{}]"#).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].label.as_deref(), Some("X"));
        assert!(parsed[2].label.is_none());
    }

    #[test]
    fn accepts_alternate_field_spellings() {
        let parsed: Vec<AutocompleteCandidate> =
            serde_json::from_str(r#"[{"type":"movie","title":"Dune","url":"/film/dune"}]"#)
                .unwrap();
        assert_eq!(parsed[0].cat.as_deref(), Some("movie"));
        assert_eq!(parsed[0].link.as_deref(), Some("/film/dune"));
    }
}
