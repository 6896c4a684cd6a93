//! Resolution events and coordinator state.

use crate::domain::entities::{ComicImage, ImageSource, Selection, Ticket};
use crate::domain::errors::ResolveError;

/// Lifecycle of the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing selected, or the last selection was cancelled.
    #[default]
    Idle,
    /// Waiting on the cache or the network.
    Resolving,
    /// An image was delivered.
    Resolved,
    /// Resolution failed.
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Resolved => write!(f, "resolved"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final result of resolving one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Image is ready.
    ///
    /// `image.date` is the date actually shown, which differs from the
    /// selected date only when the previous-day fallback kicked in.
    Resolved {
        /// Classified image.
        image: ComicImage,
        /// Where the bytes came from.
        source: ImageSource,
    },
    /// No image could be produced.
    Failed(ResolveError),
}

impl ResolutionOutcome {
    /// Phase the coordinator enters when this outcome is delivered.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Resolved { .. } => Phase::Resolved,
            Self::Failed(_) => Phase::Failed,
        }
    }
}

/// Message delivered to the UI.
#[derive(Debug, Clone)]
pub enum ResolutionEvent {
    /// Terminal outcome of a selection.
    Resolution {
        /// Ticket minted by the `select` call.
        ticket: Ticket,
        /// Selection exactly as requested.
        selection: Selection,
        /// Result.
        outcome: ResolutionOutcome,
    },
    /// Strip was delivered but could not be stored.
    CacheWriteFailed {
        /// Ticket the write belonged to.
        ticket: Ticket,
        /// Selection exactly as requested.
        selection: Selection,
        /// Always [`ResolveError::CacheWriteFailure`].
        error: ResolveError,
    },
}

impl ResolutionEvent {
    /// Ticket the event belongs to.
    #[must_use]
    pub const fn ticket(&self) -> Ticket {
        match self {
            Self::Resolution { ticket, .. } | Self::CacheWriteFailed { ticket, .. } => *ticket,
        }
    }

    /// Selection the event belongs to.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        match self {
            Self::Resolution { selection, .. } | Self::CacheWriteFailed { selection, .. } => {
                selection
            }
        }
    }
}

/// Point-in-time view of a coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    /// Most recently minted ticket.
    pub ticket: Ticket,
    /// Most recent selection.
    pub selection: Option<Selection>,
    /// Phase of that selection.
    pub phase: Phase,
}
