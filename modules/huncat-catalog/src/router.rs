// Routes consumer requests to the adapter set chosen at configuration time.
// Catalog ids are namespaced, so exactly one adapter serves any given
// catalog; entity and stream lookups fan out sequentially in priority order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use huncat_common::config::{Config, SourceConfig};
use huncat_common::types::{CanonicalEntity, CatalogPage, StreamRef};

use crate::adapter::{CatalogAdapter, CatalogQuery};
use crate::cache::{lookup_ttl, Clock, SystemClock};
use crate::lookup::TmdbClient;
use crate::pipeline;
use crate::sources::{MafabAdapter, PorthuAdapter};

/// How many entities the router asks an adapter for before applying the
/// consumer's own skip/limit window.
const ROUTER_WINDOW: usize = 250;

pub struct SourceRouter {
    adapters: Vec<Box<dyn CatalogAdapter>>,
}

impl SourceRouter {
    /// Build the adapter set from the consumer's source configuration.
    /// Declaration order is priority order: mafab answers shared namespaces
    /// and wins entity-lookup ties.
    pub fn new(config: &Config, sources: &SourceConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tmdb = Arc::new(TmdbClient::new(
            &config.tmdb_api_key,
            Duration::from_millis(config.http_timeout_ms),
            lookup_ttl(),
            clock.clone(),
        ));

        let mut adapters: Vec<Box<dyn CatalogAdapter>> = Vec::new();
        if sources.sources.mafab {
            adapters.push(Box::new(MafabAdapter::new(
                config,
                sources.external_links,
                tmdb.clone(),
                clock.clone(),
            )));
        }
        if sources.sources.porthu {
            adapters.push(Box::new(PorthuAdapter::new(
                config,
                sources.external_links,
                tmdb,
                clock,
            )));
        }

        info!(adapters = adapters.len(), "Source router ready");
        Self { adapters }
    }

    /// Assemble a router from pre-built adapters, in priority order.
    pub fn from_adapters(adapters: Vec<Box<dyn CatalogAdapter>>) -> Self {
        Self { adapters }
    }

    /// Serve one catalog page. The owning adapter is asked for a full window
    /// and the consumer's skip/limit is applied after cross-checking ids, so
    /// pagination stays consistent with dedup. An unrouteable catalog id is
    /// an empty page, never an error.
    pub async fn fetch_catalog(&self, query: &CatalogQuery) -> CatalogPage {
        let Some(adapter) = self
            .adapters
            .iter()
            .find(|a| a.handles_catalog(&query.catalog_id))
        else {
            warn!(catalog_id = %query.catalog_id, "No adapter for catalog");
            return CatalogPage {
                skip: query.skip,
                limit: query.limit,
                ..CatalogPage::default()
            };
        };

        let mut window = query.clone();
        window.skip = 0;
        window.limit = ROUTER_WINDOW;
        let page = adapter.fetch_catalog(&window).await;

        let entities = pipeline::dedupe_by_id(page.entities);
        let entities = pipeline::paginate(entities, query.skip, query.limit);

        info!(
            catalog_id = %query.catalog_id,
            source = adapter.source_name(),
            returned = entities.len(),
            "Catalog request served"
        );

        CatalogPage {
            source: page.source,
            skip: query.skip,
            limit: query.limit,
            entities,
            warnings: page.warnings,
        }
    }

    /// First adapter that knows the id wins.
    pub async fn fetch_entity(&self, id: &str) -> Option<CanonicalEntity> {
        for adapter in &self.adapters {
            if let Some(entity) = adapter.fetch_entity(id).await {
                return Some(entity);
            }
        }
        None
    }

    /// First adapter with any links for the id wins.
    pub async fn fetch_stream_refs(&self, id: &str) -> Vec<StreamRef> {
        for adapter in &self.adapters {
            let refs = adapter.fetch_stream_refs(id).await;
            if !refs.is_empty() {
                return refs;
            }
        }
        Vec::new()
    }
}
