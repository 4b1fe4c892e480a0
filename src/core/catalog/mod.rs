//! Translation catalogs: parsing, source maps, file naming and caching.
//!
//! ## Module Structure
//!
//! - `json` / `yaml`: format parsers that also record where every entry is written
//! - `source_map`: the lookup contract shared by both formats
//! - `flatten`: nested documents to dotted keys
//! - `pattern`: domain and locale from file names
//! - `loader`: one file to one [`Catalog`](crate::core::data::Catalog)
//! - `cache`: per-file catalogs merged into the unified catalog

pub mod cache;
pub mod flatten;
pub mod json;
pub mod loader;
pub mod pattern;
pub mod source_map;
pub mod yaml;

use thiserror::Error;
use yaml_rust2::scanner::ScanError;

use crate::core::data::Position;

pub use cache::CatalogCache;
pub use flatten::{FlatEntry, flatten};
pub use json::{JsonSourceMap, parse_json};
pub use loader::{CatalogFormat, CatalogOptions, load_catalog_file, parse_catalog_file};
pub use pattern::{FileIdentity, FilenamePattern};
pub use source_map::{CatalogSourceMap, SourceMap, split_key_path};
pub use yaml::{YamlSourceMap, parse_yaml};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] ScanError),
    #[error("{message} at line {}, column {}", .position.line + 1, .position.column + 1)]
    Syntax { message: String, position: Position },
}
