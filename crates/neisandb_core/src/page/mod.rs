//! Pages: in-memory trees, fixed-size file slots, and the LRU of
//! recently touched pages.

mod cache;
mod file;
mod tree;

pub use cache::{PageCache, DEFAULT_CACHE_CAPACITY};
pub use file::PageFile;
pub use tree::{PageTree, PageValue, RecordKey};
