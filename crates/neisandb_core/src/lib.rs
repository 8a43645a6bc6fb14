//! # NeisanDB Core
//!
//! The NeisanDB storage engine: embedded, file-backed document
//! collections for CLI tools and lightweight services.
//!
//! Each collection owns one page file. Writes append versioned records
//! to an in-memory page tree keyed by `(id, LSN)`; full trees are
//! flushed to fixed-size page slots and rotated out. Reads walk pages
//! newest to oldest, so the latest version of every id wins without any
//! rewriting. Inserts are schema-validated and unique fields are
//! enforced by scan.
//!
//! Concurrency follows a single-process discipline: one writer at a
//! time, up to ten concurrent readers, and a flusher that writers and
//! readers wait out before touching the file. A debounced timer flushes
//! the active page thirty seconds after the last mutation.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod document;
mod error;
mod model;
mod page;
mod schema;

pub use collection::{Collection, CollectionStats, FindOptions, Predicate, Selector};
pub use config::{
    CollectionConfig, DatabaseConfig, IdStart, DEFAULT_FLUSH_DEBOUNCE, DEFAULT_PAGE_SIZE,
    DEFAULT_TREE_CAPACITY, PAGE_HEADER_LEN,
};
pub use database::Database;
pub use document::Document;
pub use error::{CoreError, CoreResult, FieldErrors, Rejection, WriteOutcome};
pub use model::Model;
pub use page::{PageCache, PageFile, PageTree, PageValue, RecordKey};
pub use schema::{FieldSpec, FieldType, Schema};

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
