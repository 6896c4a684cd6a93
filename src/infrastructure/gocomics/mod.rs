//! Strip fetching from GoComics-style sites.

mod fetcher;
mod page_parser;
mod retry;

pub use fetcher::GoComicsFetcher;
pub use page_parser::extract_image_url;
pub use retry::RetryPolicy;
