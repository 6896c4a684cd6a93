//! Selection and ticket value objects.

use std::fmt;

use chrono::NaiveDate;

use super::TitleId;

/// The user's current intent: one title on one date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Selected title.
    pub title: TitleId,
    /// Selected date, kept verbatim even when it is not available.
    pub date: NaiveDate,
}

impl Selection {
    /// Creates a new selection.
    #[must_use]
    pub fn new(title: impl Into<TitleId>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.title, self.date)
    }
}

/// Generation number identifying one resolution request.
///
/// Tickets are minted in strictly increasing order by a coordinator;
/// a ticket is current until the next one is minted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Ticket that precedes every minted ticket.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw generation number.
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Returns the raw generation number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
