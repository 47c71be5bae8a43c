//! wikisearch - partitioned full-text search for wiki content.
//!
//! wikisearch indexes directories of wiki page files into independent
//! [Tantivy](https://github.com/quickwit-oss/tantivy) index partitions
//! (one per wiki or sub-site) and exposes a search facade that merges
//! per-partition hits into one bounded, score-ordered result set, with
//! degraded-but-available semantics when individual partitions fail.
//! Index rebuilds are guarded by an admin-token access policy.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wikisearch::{DataDir, Registry, TantivyBackend};
//! use wikisearch::facade::{FacadeConfig, SearchFacade, SearchRequest};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let registry = Registry::open(&data_dir.registry_db()).unwrap();
//! let backend = Arc::new(TantivyBackend::open(&registry, &data_dir).unwrap());
//! let facade = SearchFacade::new(backend, FacadeConfig::default());
//!
//! let results = facade.search(&SearchRequest::new("hello world")).unwrap();
//! for hit in &results.hits {
//!     println!("{}:{} (score: {:.3})", hit.partition, hit.path, hit.score);
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod data_dir;
pub mod error;
pub mod facade;
pub mod guard;
pub mod ingestion;
pub mod page_ref;
pub mod partition;
pub mod rebuild;
pub mod registry;
pub mod walker;

pub use backend::{IndexBackend, TantivyBackend};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use facade::{SearchFacade, SearchRequest, SearchResults};
pub use guard::{AccessPolicy, TokenGuard};
pub use page_ref::PageRef;
pub use partition::{Hit, LanguageFilter, PartitionIndex};
pub use rebuild::RebuildStatus;
pub use registry::Registry;
