mod comic_cache_port;
mod comic_fetcher_port;

pub use comic_cache_port::{CacheError, CacheResult, ComicCachePort, TitleCacheStats};
pub use comic_fetcher_port::{ComicFetcher, FetchError};
