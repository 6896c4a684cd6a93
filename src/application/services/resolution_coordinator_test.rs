#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use crate::application::dto::{Phase, ResolutionEvent, ResolutionOutcome};
    use crate::application::services::resolution_coordinator::{
        ResolutionCoordinator, ResolutionOptions,
    };
    use crate::domain::entities::{ImageKind, ImageSource, Ticket, Title, TitleCatalog, TitleId};
    use crate::domain::errors::ResolveError;
    use crate::domain::ports::FetchError;
    use crate::domain::ports::mocks::{MockComicCache, MockFetcher};
    use crate::infrastructure::cache::DiskComicCache;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nstrip";
    const GIF: &[u8] = b"GIF89a-strip";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed_today() -> NaiveDate {
        date(2024, 5, 1)
    }

    fn catalog() -> Arc<TitleCatalog> {
        Arc::new(
            TitleCatalog::new(vec![
                Title::new("garfield", "Garfield", "Jim Davis", date(1978, 6, 19), Vec::new())
                    .unwrap(),
                Title::new(
                    "peanuts",
                    "Peanuts",
                    "Charles M. Schulz",
                    date(1950, 10, 16),
                    Vec::new(),
                )
                .unwrap(),
            ])
            .unwrap(),
        )
    }

    fn options() -> ResolutionOptions {
        ResolutionOptions {
            fallback_to_previous_day: true,
            today: fixed_today,
        }
    }

    fn mock_coordinator(
        options: ResolutionOptions,
    ) -> (
        ResolutionCoordinator,
        mpsc::UnboundedReceiver<ResolutionEvent>,
        Arc<MockComicCache>,
        Arc<MockFetcher>,
    ) {
        let cache = Arc::new(MockComicCache::new());
        let fetcher = Arc::new(MockFetcher::new());
        let (coordinator, rx) =
            ResolutionCoordinator::new(catalog(), cache.clone(), fetcher.clone(), options);
        (coordinator, rx, cache, fetcher)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ResolutionEvent>) -> ResolutionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn next_outcome(
        rx: &mut mpsc::UnboundedReceiver<ResolutionEvent>,
    ) -> (Ticket, ResolutionOutcome) {
        loop {
            if let ResolutionEvent::Resolution {
                ticket, outcome, ..
            } = next_event(rx).await
            {
                return (ticket, outcome);
            }
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_disk_cache() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(
            DiskComicCache::new(temp.path().to_path_buf(), 10)
                .await
                .unwrap(),
        );
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond("garfield", date(1978, 6, 19), PNG);
        let (coordinator, mut rx) =
            ResolutionCoordinator::new(catalog(), cache.clone(), fetcher.clone(), options());

        let before = coordinator.select("garfield", date(1978, 6, 18));
        let (ticket, outcome) = next_outcome(&mut rx).await;
        assert_eq!(ticket, before);
        assert!(matches!(
            outcome,
            ResolutionOutcome::Failed(ResolveError::NotAvailable { .. })
        ));
        assert_eq!(fetcher.call_count(), 0);

        let first = coordinator.select("garfield", date(1978, 6, 19));
        let (ticket, outcome) = next_outcome(&mut rx).await;
        assert_eq!(ticket, first);
        match outcome {
            ResolutionOutcome::Resolved { image, source } => {
                assert_eq!(source, ImageSource::Network);
                assert_eq!(image.kind, ImageKind::Png);
                assert_eq!(image.date, date(1978, 6, 19));
                assert_eq!(&image.bytes[..], PNG);
            }
            other => panic!("expected resolved, got {other:?}"),
        }
        assert!(
            temp.path()
                .join("garfield")
                .join("1978-06-19.png")
                .exists()
        );

        coordinator.select("garfield", date(1978, 6, 19));
        let (_, outcome) = next_outcome(&mut rx).await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Resolved {
                source: ImageSource::Cache,
                ..
            }
        ));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(coordinator.snapshot().phase, Phase::Resolved);
    }

    #[tokio::test]
    async fn test_superseded_outcome_is_never_delivered() {
        let (coordinator, mut rx, cache, fetcher) = mock_coordinator(options());
        fetcher.respond("garfield", date(2000, 1, 1), GIF);
        fetcher.respond("peanuts", date(1960, 2, 2), PNG);
        fetcher.set_honor_cancel(false);
        let gate = fetcher.gate("garfield", date(2000, 1, 1));

        let first = coordinator.select("garfield", date(2000, 1, 1));
        fetcher.wait_for_calls(1).await;
        let second = coordinator.select("peanuts", date(1960, 2, 2));
        assert!(!coordinator.is_current(first));
        assert!(coordinator.is_current(second));

        match next_event(&mut rx).await {
            ResolutionEvent::Resolution {
                ticket,
                selection,
                outcome,
            } => {
                assert_eq!(ticket, second);
                assert_eq!(selection.title, TitleId::new("peanuts"));
                assert!(matches!(outcome, ResolutionOutcome::Resolved { .. }));
            }
            other => panic!("unexpected event {other:?}"),
        }

        gate.notify_one();
        for _ in 0..200 {
            if cache.put_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cache.put_count(), 2);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.snapshot().ticket, second);
    }

    #[tokio::test]
    async fn test_new_selection_cancels_in_flight_fetch() {
        let (coordinator, mut rx, _cache, fetcher) = mock_coordinator(options());
        let _gate = fetcher.gate("garfield", date(2000, 1, 1));

        coordinator.select("garfield", date(2000, 1, 1));
        fetcher.wait_for_calls(1).await;
        fetcher.respond("garfield", date(2000, 1, 2), PNG);
        let second = coordinator.select("garfield", date(2000, 1, 2));

        let (ticket, _) = next_outcome(&mut rx).await;
        assert_eq!(ticket, second);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_format_is_not_cached() {
        let (coordinator, mut rx, cache, fetcher) = mock_coordinator(options());
        fetcher.respond("garfield", date(2001, 3, 3), b"<html>not an image</html>");

        coordinator.select("garfield", date(2001, 3, 3));
        let (_, outcome) = next_outcome(&mut rx).await;

        assert_eq!(outcome, ResolutionOutcome::Failed(ResolveError::UnknownFormat));
        assert_eq!(cache.put_count(), 0);
        assert_eq!(coordinator.snapshot().phase, Phase::Failed);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_resolves() {
        let (coordinator, mut rx, cache, fetcher) = mock_coordinator(options());
        cache.set_fail_puts(true);
        fetcher.respond("peanuts", date(1970, 7, 7), GIF);

        let ticket = coordinator.select("peanuts", date(1970, 7, 7));

        let mut saw_write_failure = false;
        loop {
            match next_event(&mut rx).await {
                ResolutionEvent::CacheWriteFailed {
                    ticket: t, error, ..
                } => {
                    assert_eq!(t, ticket);
                    assert!(matches!(error, ResolveError::CacheWriteFailure { .. }));
                    assert!(!error.is_retryable());
                    saw_write_failure = true;
                }
                ResolutionEvent::Resolution { outcome, .. } => {
                    assert!(matches!(
                        outcome,
                        ResolutionOutcome::Resolved {
                            source: ImageSource::Network,
                            ..
                        }
                    ));
                    break;
                }
            }
        }
        assert!(saw_write_failure);
    }

    #[tokio::test]
    async fn test_today_falls_back_to_yesterday() {
        let (coordinator, mut rx, _cache, fetcher) = mock_coordinator(options());
        fetcher.respond("garfield", date(2024, 4, 30), PNG);

        let ticket = coordinator.select("garfield", fixed_today());

        match next_event(&mut rx).await {
            ResolutionEvent::Resolution {
                ticket: t,
                selection,
                outcome: ResolutionOutcome::Resolved { image, .. },
            } => {
                assert_eq!(t, ticket);
                assert_eq!(selection.date, fixed_today());
                assert_eq!(image.date, date(2024, 4, 30));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            fetcher.calls(),
            vec![
                (TitleId::new("garfield"), fixed_today()),
                (TitleId::new("garfield"), date(2024, 4, 30)),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_can_be_disabled() {
        let (coordinator, mut rx, _cache, fetcher) = mock_coordinator(ResolutionOptions {
            fallback_to_previous_day: false,
            ..options()
        });
        fetcher.respond("garfield", date(2024, 4, 30), PNG);

        coordinator.select("garfield", fixed_today());
        let (_, outcome) = next_outcome(&mut rx).await;

        assert!(matches!(
            outcome,
            ResolutionOutcome::Failed(ResolveError::NotAvailable { .. })
        ));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_past_date_does_not_fall_back() {
        let (coordinator, mut rx, _cache, fetcher) = mock_coordinator(options());
        fetcher.fail(
            "garfield",
            date(2010, 1, 2),
            FetchError::network("HTTP 503 Service Unavailable"),
        );

        coordinator.select("garfield", date(2010, 1, 2));
        let (_, outcome) = next_outcome(&mut rx).await;

        match outcome {
            ResolutionOutcome::Failed(error) => {
                assert!(error.is_retryable());
                assert!(!error.suggests_other_date());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_title_and_future_date_fail_without_io() {
        let (coordinator, mut rx, cache, fetcher) = mock_coordinator(options());

        coordinator.select("dilbert", date(2000, 1, 1));
        let (_, outcome) = next_outcome(&mut rx).await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Failed(ResolveError::NotAvailable { .. })
        ));

        coordinator.select("garfield", date(2024, 5, 2));
        let (_, outcome) = next_outcome(&mut rx).await;
        match outcome {
            ResolutionOutcome::Failed(error) => assert!(error.suggests_other_date()),
            other => panic!("unexpected outcome {other:?}"),
        }

        assert_eq!(cache.get_count(), 0);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_cancel_and_retry() {
        let (coordinator, mut rx, cache, fetcher) = mock_coordinator(options());
        assert_eq!(coordinator.snapshot().phase, Phase::Idle);
        assert_eq!(coordinator.snapshot().ticket, Ticket::ZERO);
        assert!(coordinator.retry().is_none());

        let gate = fetcher.gate("garfield", date(1999, 9, 9));
        let first = coordinator.select("garfield", date(1999, 9, 9));
        fetcher.wait_for_calls(1).await;

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.ticket, first);
        assert_eq!(snapshot.phase, Phase::Resolving);

        let cancelled = coordinator.cancel();
        assert!(cancelled > first);
        assert_eq!(coordinator.snapshot().phase, Phase::Idle);
        assert_eq!(
            coordinator.current_selection().map(|s| s.date),
            Some(date(1999, 9, 9))
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());

        cache.insert("garfield", date(1999, 9, 9), GIF, ImageKind::Gif);
        gate.notify_one();
        let retried = coordinator.retry().unwrap();
        assert!(retried > cancelled);

        let (ticket, outcome) = next_outcome(&mut rx).await;
        assert_eq!(ticket, retried);
        assert!(matches!(
            outcome,
            ResolutionOutcome::Resolved {
                source: ImageSource::Cache,
                ..
            }
        ));
    }
}
