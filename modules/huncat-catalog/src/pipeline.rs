// Source-agnostic pipeline steps shared by every adapter: record dedup with
// field merging, the bounded enrichment worker pool, entity-level dedup,
// poster partitioning, genre filtering and pagination. All list-shaped steps
// preserve first-seen order so adapter output is deterministic given
// deterministic input.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

use huncat_common::text::comparison_key;
use huncat_common::types::{CanonicalEntity, MediaType, RawRecord};

use crate::lookup::{Resolution, Resolve};

/// Deduplicate by detail URL. Duplicates merge field-wise, first non-empty
/// value wins; order follows first appearance.
pub fn merge_records(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RawRecord> = Vec::new();

    for record in records {
        match by_url.get(&record.detail_url) {
            Some(&idx) => merge_into(&mut merged[idx], record),
            None => {
                by_url.insert(record.detail_url.clone(), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

fn merge_into(existing: &mut RawRecord, incoming: RawRecord) {
    if existing.seed_title.is_empty() {
        existing.seed_title = incoming.seed_title;
    }
    if existing.lookup_title.is_empty() {
        existing.lookup_title = incoming.lookup_title;
    }
    if existing.description.is_none() {
        existing.description = incoming.description;
    }
    if existing.release_info.is_none() {
        existing.release_info = incoming.release_info;
    }
    if existing.year.is_none() {
        existing.year = incoming.year;
    }
    if existing.poster.is_none() {
        existing.poster = incoming.poster;
    }
    if existing.imdb_id.is_none() {
        existing.imdb_id = incoming.imdb_id;
    }
    if existing.genres.is_empty() {
        existing.genres = incoming.genres;
    }
}

/// Should this record go through identity resolution at all?
pub fn needs_enrichment(record: &RawRecord) -> bool {
    record.imdb_id.is_none() || record.seed_title.is_empty()
}

/// Run the resolver over a bounded prefix of the record list through a fixed
/// worker pool. Workers claim the next unprocessed index from a shared
/// cursor, so total enrichment cost is bounded by `max_items` regardless of
/// list size. Completion order is nondeterministic; output order is not
/// affected (results are written back by index).
pub async fn enrich_records(
    mut records: Vec<RawRecord>,
    resolver: &dyn Resolve,
    media_type: MediaType,
    concurrency: usize,
    max_items: usize,
) -> Vec<RawRecord> {
    let limit = records.len().min(max_items);
    if limit == 0 {
        return records;
    }

    let cursor = Arc::new(AtomicUsize::new(0));
    let snapshot = &records;

    let workers = (0..concurrency.max(1)).map(|_| {
        let cursor = cursor.clone();
        async move {
            let mut resolved: Vec<(usize, Resolution)> = Vec::new();
            loop {
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                if idx >= limit {
                    break;
                }
                let record = &snapshot[idx];
                if !needs_enrichment(record) {
                    continue;
                }
                resolved.push((idx, resolver.resolve(record, media_type).await));
            }
            resolved
        }
    });

    let results = futures::future::join_all(workers).await;

    let mut applied = 0usize;
    for (idx, resolution) in results.into_iter().flatten() {
        apply_resolution(&mut records[idx], resolution);
        applied += 1;
    }
    info!(total = records.len(), enriched = applied, "Enrichment pass complete");
    records
}

fn apply_resolution(record: &mut RawRecord, resolution: Resolution) {
    if record.imdb_id.is_none() {
        record.imdb_id = resolution.imdb_id;
    }
    if record.year.is_none() {
        record.year = resolution.year;
    }
    if record.seed_title.is_empty() {
        if let Some(title) = resolution.canonical_title {
            record.seed_title = title;
        }
    }
}

/// Deduplicate entities across one result set by normalized name. On
/// conflict the entity with an external id and/or poster wins; the survivor
/// keeps the first occurrence's position.
pub fn dedupe_by_name(entities: Vec<CanonicalEntity>) -> Vec<CanonicalEntity> {
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<CanonicalEntity> = Vec::new();

    for entity in entities {
        let key = comparison_key(&entity.name);
        match by_name.get(&key) {
            Some(&idx) => {
                if quality(&entity) > quality(&kept[idx]) {
                    kept[idx] = entity;
                }
            }
            None => {
                by_name.insert(key, kept.len());
                kept.push(entity);
            }
        }
    }
    kept
}

fn quality(entity: &CanonicalEntity) -> (bool, bool) {
    (entity.imdb_id.is_some(), entity.poster.is_some())
}

/// Deduplicate by canonical id, first occurrence wins. Idempotent.
pub fn dedupe_by_id(entities: Vec<CanonicalEntity>) -> Vec<CanonicalEntity> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    entities
        .into_iter()
        .filter(|e| seen.insert(e.id.clone(), ()).is_none())
        .collect()
}

/// Stable partition: entities with a poster before those without, relative
/// order preserved within each partition.
pub fn partition_by_poster(entities: Vec<CanonicalEntity>) -> Vec<CanonicalEntity> {
    let (mut with_poster, without): (Vec<_>, Vec<_>) =
        entities.into_iter().partition(|e| e.poster.is_some());
    with_poster.extend(without);
    with_poster
}

/// Case-insensitive substring filter over name, description and genre tags.
pub fn filter_by_genre(entities: Vec<CanonicalEntity>, genre: &str) -> Vec<CanonicalEntity> {
    let needle = genre.to_lowercase();
    entities
        .into_iter()
        .filter(|e| {
            e.name.to_lowercase().contains(&needle)
                || e.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
                || e.genres
                    .as_deref()
                    .is_some_and(|gs| gs.iter().any(|g| g.to_lowercase().contains(&needle)))
        })
        .collect()
}

/// Pagination over the final filtered, ordered list. Always returns
/// `min(limit, max(0, total - skip))` entities.
pub fn paginate(entities: Vec<CanonicalEntity>, skip: usize, limit: usize) -> Vec<CanonicalEntity> {
    entities.into_iter().skip(skip).take(limit).collect()
}
