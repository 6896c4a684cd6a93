pub mod resolution_coordinator;

pub use resolution_coordinator::{ResolutionCoordinator, ResolutionOptions};

#[cfg(test)]
mod resolution_coordinator_test;
