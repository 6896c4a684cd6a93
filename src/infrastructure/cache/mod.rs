//! On-disk strip cache.

mod disk_cache;
mod title_index;

pub use disk_cache::{DEFAULT_CAPACITY_PER_TITLE, DiskComicCache};
pub use title_index::{INDEX_VERSION, IndexEntry, IndexFile, IndexRecord, TitleIndex};
