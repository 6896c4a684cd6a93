//! Data transfer objects for the application layer.

mod resolution_dto;

pub use resolution_dto::{CoordinatorSnapshot, Phase, ResolutionEvent, ResolutionOutcome};
