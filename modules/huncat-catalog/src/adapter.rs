// The per-source adapter contract. One implementation per content origin;
// the router holds the set chosen at configuration time, so no runtime
// string dispatch is needed anywhere.

use async_trait::async_trait;

use huncat_common::types::{CanonicalEntity, CatalogPage, MediaType, StreamRef};

/// One catalog request as the consumer shapes it.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub catalog_id: String,
    pub media_type: MediaType,
    pub genre: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

impl CatalogQuery {
    pub fn new(catalog_id: &str, media_type: MediaType) -> Self {
        Self {
            catalog_id: catalog_id.to_string(),
            media_type,
            genre: None,
            skip: 0,
            limit: 50,
        }
    }
}

/// Uniform catalog / entity-lookup / stream-ref contract every source
/// implements. None of these methods may fail hard: catalog requests degrade
/// to partial results plus warnings, lookups to None / empty.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Does this adapter own the given catalog id namespace?
    fn handles_catalog(&self, catalog_id: &str) -> bool;

    async fn fetch_catalog(&self, query: &CatalogQuery) -> CatalogPage;

    async fn fetch_entity(&self, id: &str) -> Option<CanonicalEntity>;

    async fn fetch_stream_refs(&self, id: &str) -> Vec<StreamRef>;
}
