pub mod config;
pub mod hash;
pub mod text;
pub mod types;

pub use config::{Config, SourceConfig};
pub use hash::short_hash;
pub use types::*;
