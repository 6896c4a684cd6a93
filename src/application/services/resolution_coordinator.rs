//! Turns selections into images, one selection at a time.
//!
//! Every `select` mints a new [`Ticket`] and cancels the work of the previous
//! one. Outcomes are only delivered while their ticket is still current; the
//! check and the send happen under the same lock that mints tickets, so an
//! outcome for ticket N can never be observed after ticket N+1 exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::application::dto::{CoordinatorSnapshot, Phase, ResolutionEvent, ResolutionOutcome};
use crate::domain::entities::{ComicImage, ImageSource, Selection, Ticket, Title, TitleCatalog, TitleId};
use crate::domain::errors::ResolveError;
use crate::domain::ports::{ComicCachePort, ComicFetcher};
use crate::domain::services::{AvailabilityModel, FormatSniffer};

/// Tunables for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionOptions {
    /// Retry with yesterday when today's strip fails to resolve.
    pub fallback_to_previous_day: bool,
    /// Source of "today".
    pub today: fn() -> NaiveDate,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            fallback_to_previous_day: true,
            today: AvailabilityModel::today,
        }
    }
}

struct CoordinatorState {
    ticket: Ticket,
    selection: Option<Selection>,
    phase: Phase,
    cancel: Option<CancellationToken>,
}

struct Inner {
    catalog: Arc<TitleCatalog>,
    cache: Arc<dyn ComicCachePort>,
    fetcher: Arc<dyn ComicFetcher>,
    options: ResolutionOptions,
    event_tx: mpsc::UnboundedSender<ResolutionEvent>,
    state: Mutex<CoordinatorState>,
    current: AtomicU64,
}

/// Single-flight resolver between the UI, the cache and the fetcher.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ResolutionCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResolutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCoordinator")
            .field("options", &self.inner.options)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl ResolutionCoordinator {
    /// Creates a coordinator and the receiver its events are delivered on.
    #[must_use]
    pub fn new(
        catalog: Arc<TitleCatalog>,
        cache: Arc<dyn ComicCachePort>,
        fetcher: Arc<dyn ComicFetcher>,
        options: ResolutionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<ResolutionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            catalog,
            cache,
            fetcher,
            options,
            event_tx,
            state: Mutex::new(CoordinatorState {
                ticket: Ticket::ZERO,
                selection: None,
                phase: Phase::Idle,
                cancel: None,
            }),
            current: AtomicU64::new(Ticket::ZERO.get()),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            event_rx,
        )
    }

    /// Starts resolving `title` on `date` and returns its ticket.
    ///
    /// Never waits on I/O. Must be called within a tokio runtime.
    pub fn select(&self, title: impl Into<TitleId>, date: NaiveDate) -> Ticket {
        let selection = Selection::new(title, date);
        let cancel = CancellationToken::new();
        let ticket = self.inner.mint(Some(selection.clone()), Phase::Resolving, Some(cancel.clone()));
        debug!(ticket = %ticket, selection = %selection, "Selection changed");

        let today = (self.inner.options.today)();
        let Some(title) = self.inner.catalog.get(&selection.title).cloned() else {
            self.inner.deliver_outcome(
                ticket,
                &selection,
                ResolutionOutcome::Failed(ResolveError::not_available(format!(
                    "unknown title {}",
                    selection.title
                ))),
            );
            return ticket;
        };

        if let Some(reason) = AvailabilityModel::unavailability_on(&title, date, today) {
            debug!(ticket = %ticket, reason = %reason, "Date known to be unavailable");
            self.inner.deliver_outcome(
                ticket,
                &selection,
                ResolutionOutcome::Failed(ResolveError::not_available(reason.to_string())),
            );
            return ticket;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.run(ticket, selection, title, today, cancel).await;
        });

        ticket
    }

    /// Re-issues the current selection under a new ticket.
    ///
    /// Returns `None` when nothing has been selected yet.
    pub fn retry(&self) -> Option<Ticket> {
        let selection = self.current_selection()?;
        Some(self.select(selection.title, selection.date))
    }

    /// Abandons the in-flight resolution and returns to [`Phase::Idle`].
    ///
    /// The selection is kept so [`Self::retry`] can pick it up again.
    pub fn cancel(&self) -> Ticket {
        let selection = self.current_selection();
        let ticket = self.inner.mint(selection, Phase::Idle, None);
        debug!(ticket = %ticket, "Resolution cancelled");
        ticket
    }

    /// Current ticket, selection and phase.
    #[must_use]
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let state = self.inner.state.lock();
        CoordinatorSnapshot {
            ticket: state.ticket,
            selection: state.selection.clone(),
            phase: state.phase,
        }
    }

    /// Most recent selection.
    #[must_use]
    pub fn current_selection(&self) -> Option<Selection> {
        self.inner.state.lock().selection.clone()
    }

    /// Returns true if `ticket` is the most recently minted one.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.inner.is_current(ticket)
    }
}

impl Inner {
    fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.get()
    }

    /// Mints the next ticket and cancels the previous in-flight work.
    fn mint(
        &self,
        selection: Option<Selection>,
        phase: Phase,
        cancel: Option<CancellationToken>,
    ) -> Ticket {
        let mut state = self.state.lock();
        let ticket = Ticket::new(state.ticket.get() + 1);
        if let Some(previous) = std::mem::replace(&mut state.cancel, cancel) {
            previous.cancel();
        }
        state.ticket = ticket;
        state.selection = selection;
        state.phase = phase;
        self.current.store(ticket.get(), Ordering::Release);
        ticket
    }

    /// Sends `event` if its ticket is still current. Returns whether it was sent.
    fn deliver(&self, event: ResolutionEvent) -> bool {
        let mut state = self.state.lock();
        if state.ticket != event.ticket() {
            trace!(ticket = %event.ticket(), current = %state.ticket, "Dropping superseded event");
            return false;
        }

        if let ResolutionEvent::Resolution { outcome, .. } = &event {
            state.phase = outcome.phase();
            state.cancel = None;
        }

        self.event_tx.send(event).is_ok()
    }

    fn deliver_outcome(&self, ticket: Ticket, selection: &Selection, outcome: ResolutionOutcome) {
        if let ResolutionOutcome::Failed(error) = &outcome {
            debug!(ticket = %ticket, selection = %selection, error = %error, "Resolution failed");
        }
        self.deliver(ResolutionEvent::Resolution {
            ticket,
            selection: selection.clone(),
            outcome,
        });
    }

    async fn run(
        &self,
        ticket: Ticket,
        selection: Selection,
        title: Arc<Title>,
        today: NaiveDate,
        cancel: CancellationToken,
    ) {
        let mut result = self
            .resolve_date(ticket, &selection, &title, selection.date, &cancel)
            .await;

        let fallback = match &result {
            Err(error)
                if self.options.fallback_to_previous_day
                    && selection.date == today
                    && error.allows_fallback() =>
            {
                debug!(ticket = %ticket, error = %error, "Today's strip failed");
                today
                    .pred_opt()
                    .filter(|d| !AvailabilityModel::is_known_unavailable_on(&title, *d, today))
            }
            _ => None,
        };

        if let Some(yesterday) = fallback {
            info!(
                ticket = %ticket,
                selection = %selection,
                fallback = %yesterday,
                "Today's strip unavailable, trying previous day"
            );
            result = self
                .resolve_date(ticket, &selection, &title, yesterday, &cancel)
                .await;
        }

        let outcome = match result {
            Ok((image, source)) => {
                info!(
                    ticket = %ticket,
                    selection = %selection,
                    date = %image.date,
                    kind = %image.kind,
                    source = %source,
                    "Strip resolved"
                );
                ResolutionOutcome::Resolved { image, source }
            }
            Err(ResolveError::Superseded) => {
                trace!(ticket = %ticket, "Resolution superseded");
                return;
            }
            Err(error) => ResolutionOutcome::Failed(error),
        };

        self.deliver_outcome(ticket, &selection, outcome);
    }

    async fn resolve_date(
        &self,
        ticket: Ticket,
        selection: &Selection,
        title: &Title,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<(ComicImage, ImageSource), ResolveError> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Superseded);
        }

        if let Some((bytes, kind)) = self.cache.get(title.id(), date).await {
            return Ok((ComicImage::new(date, kind, bytes), ImageSource::Cache));
        }
        if cancel.is_cancelled() {
            return Err(ResolveError::Superseded);
        }

        let bytes = self.fetcher.fetch(title, date, cancel).await?;
        let kind = FormatSniffer::classify(&bytes).ok_or_else(|| {
            warn!(title = %title.id(), date = %date, size = bytes.len(), "Downloaded data is not an image");
            ResolveError::UnknownFormat
        })?;

        if let Err(error) = self.cache.put(title.id(), date, bytes.clone(), kind).await {
            warn!(title = %title.id(), date = %date, error = %error, "Failed to cache strip");
            self.deliver(ResolutionEvent::CacheWriteFailed {
                ticket,
                selection: selection.clone(),
                error: error.into(),
            });
        }

        Ok((ComicImage::new(date, kind, bytes), ImageSource::Network))
    }
}
