//! Comicstrip - fetch, cache and browse daily comic strips.
//!
//! This crate resolves a (title, date) selection to a strip image through an
//! on-disk LRU cache and a retrying HTTP fetcher, with a ticket-based
//! coordinator that guarantees only the latest selection is ever delivered.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the resolution coordinator and its DTOs.
pub mod application;
/// Domain layer containing entities, errors, ports and pure services.
pub mod domain;
/// Infrastructure layer containing the disk cache, HTTP fetcher and config.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "comicstrip";
