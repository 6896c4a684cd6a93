//! Pure domain services.

mod availability;
mod format_sniffer;

pub use availability::{AvailabilityModel, Direction, MAX_RANDOM_DRAWS, Unavailability};
pub use format_sniffer::FormatSniffer;
