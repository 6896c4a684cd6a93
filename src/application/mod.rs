//! Application layer: coordinating the domain ports into user-facing operations.

/// Data transfer objects.
pub mod dto;
/// Application services.
pub mod services;

pub use dto::{CoordinatorSnapshot, Phase, ResolutionEvent, ResolutionOutcome};
pub use services::{ResolutionCoordinator, ResolutionOptions};
