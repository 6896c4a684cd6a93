//! Domain layer with core entities, pure services and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain services.
pub mod services;

pub use entities::{
    ComicImage, Gap, ImageKind, ImageSource, Selection, Ticket, Title, TitleCatalog, TitleId,
};
pub use errors::{CatalogError, ResolveError};
pub use ports::{CacheError, ComicCachePort, ComicFetcher, FetchError};
pub use services::{AvailabilityModel, Direction, FormatSniffer};
