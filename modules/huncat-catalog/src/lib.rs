pub mod adapter;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod lookup;
pub mod matching;
pub mod pipeline;
pub mod router;
pub mod sources;

pub use adapter::{CatalogAdapter, CatalogQuery};
pub use cache::{Clock, SystemClock, TtlCache};
pub use error::{Result, SourceError};
pub use fetcher::{FetchPage, PageFetcher};
pub use huncat_common::config::{Config, SourceConfig};
pub use huncat_common::types::{CanonicalEntity, CatalogPage, MediaType, StreamRef};
pub use lookup::{IdentityResolver, Resolution, Resolve, TmdbClient};
pub use router::SourceRouter;
pub use sources::{MafabAdapter, PorthuAdapter};
