//! Calendar availability of titles.
//!
//! Everything here is a pure function of a [`Title`] and a date. The
//! `*_on` variants take "today" explicitly; the plain variants use the
//! local calendar date at the instant of the call.

use chrono::{Days, Local, NaiveDate};
use rand::Rng;

use crate::domain::entities::{Gap, Title};

/// Number of uniform draws attempted before falling back to the nearest open date.
pub const MAX_RANDOM_DRAWS: usize = 16;

/// Direction to step through the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards today.
    Forward,
    /// Towards the earliest date.
    Backward,
}

/// Why a date cannot be shown for a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailability {
    /// Date precedes the title's earliest date.
    BeforeEarliest(NaiveDate),
    /// Date is after today.
    InFuture,
    /// Date falls inside a known gap.
    InGap(Gap),
}

impl std::fmt::Display for Unavailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeEarliest(earliest) => write!(f, "earliest available date is {earliest}"),
            Self::InFuture => write!(f, "date is in the future"),
            Self::InGap(gap) => write!(f, "no strips were published {gap}"),
        }
    }
}

/// Stateless availability queries.
pub struct AvailabilityModel;

impl AvailabilityModel {
    /// Local calendar date right now.
    #[must_use]
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Returns true if `date` is in a gap, before the earliest date, or in the future.
    #[must_use]
    pub fn is_known_unavailable(title: &Title, date: NaiveDate) -> bool {
        Self::is_known_unavailable_on(title, date, Self::today())
    }

    /// [`Self::is_known_unavailable`] against an explicit `today`.
    #[must_use]
    pub fn is_known_unavailable_on(title: &Title, date: NaiveDate, today: NaiveDate) -> bool {
        Self::unavailability_on(title, date, today).is_some()
    }

    /// Explains why `date` is unavailable, or `None` when it is plausibly available.
    #[must_use]
    pub fn unavailability_on(
        title: &Title,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Option<Unavailability> {
        if date < title.earliest() {
            return Some(Unavailability::BeforeEarliest(title.earliest()));
        }
        if date > today {
            return Some(Unavailability::InFuture);
        }
        title.gap_containing(date).copied().map(Unavailability::InGap)
    }

    /// Clamps `date` into `[earliest, today]`.
    #[must_use]
    pub fn clamp_to_valid_range(title: &Title, date: NaiveDate) -> NaiveDate {
        Self::clamp_to_valid_range_on(title, date, Self::today())
    }

    /// [`Self::clamp_to_valid_range`] against an explicit `today`.
    #[must_use]
    pub fn clamp_to_valid_range_on(title: &Title, date: NaiveDate, today: NaiveDate) -> NaiveDate {
        let (lo, hi) = bounds(title, today);
        date.clamp(lo, hi)
    }

    /// Closest open date strictly after (or before) `date`, skipping gaps.
    ///
    /// The result never leaves `[earliest, today]`; when no open date remains
    /// in that direction the boundary is returned.
    #[must_use]
    pub fn next_available(title: &Title, date: NaiveDate, direction: Direction) -> NaiveDate {
        Self::next_available_on(title, date, direction, Self::today())
    }

    /// [`Self::next_available`] against an explicit `today`.
    #[must_use]
    pub fn next_available_on(
        title: &Title,
        date: NaiveDate,
        direction: Direction,
        today: NaiveDate,
    ) -> NaiveDate {
        let (lo, hi) = bounds(title, today);
        let boundary = match direction {
            Direction::Forward => hi,
            Direction::Backward => lo,
        };

        let stepped = match direction {
            Direction::Forward => date.succ_opt(),
            Direction::Backward => date.pred_opt(),
        };
        let Some(stepped) = stepped else {
            return boundary;
        };

        let mut candidate = match direction {
            Direction::Forward if stepped > hi => return hi,
            Direction::Backward if stepped < lo => return lo,
            _ => stepped.clamp(lo, hi),
        };

        while let Some(gap) = title.gap_containing(candidate) {
            let next = match direction {
                Direction::Forward => gap.end.succ_opt().filter(|d| *d <= hi),
                Direction::Backward => gap.start.pred_opt().filter(|d| *d >= lo),
            };
            match next {
                Some(next) => candidate = next,
                None => return boundary,
            }
        }

        candidate
    }

    /// Uniformly random open date in `[earliest, today]`.
    #[must_use]
    pub fn random_available(title: &Title) -> NaiveDate {
        Self::random_available_with(title, Self::today(), &mut rand::rng())
    }

    /// [`Self::random_available`] with an explicit `today` and RNG.
    ///
    /// Draws up to [`MAX_RANDOM_DRAWS`] times; if every draw lands in a gap,
    /// the open date nearest the last draw is returned instead.
    pub fn random_available_with<R: Rng + ?Sized>(
        title: &Title,
        today: NaiveDate,
        rng: &mut R,
    ) -> NaiveDate {
        let (lo, hi) = bounds(title, today);
        let span = u64::try_from((hi - lo).num_days()).unwrap_or(0);

        let mut last = lo;
        for _ in 0..MAX_RANDOM_DRAWS {
            let candidate = lo
                .checked_add_days(Days::new(rng.random_range(0..=span)))
                .unwrap_or(lo);
            if title.gap_containing(candidate).is_none() {
                return candidate;
            }
            last = candidate;
        }

        nearest_open(title, last, lo, hi)
    }

    /// Gaps intersecting `[from, to]`, for calendar decoration.
    #[must_use]
    pub fn unavailable_ranges(title: &Title, from: NaiveDate, to: NaiveDate) -> Vec<Gap> {
        title
            .gaps()
            .iter()
            .filter(|gap| gap.overlaps(from, to))
            .copied()
            .collect()
    }
}

fn bounds(title: &Title, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let lo = title.earliest();
    (lo, today.max(lo))
}

fn nearest_open(title: &Title, date: NaiveDate, lo: NaiveDate, hi: NaiveDate) -> NaiveDate {
    let Some(gap) = title.gap_containing(date) else {
        return date;
    };

    let after = gap.end.succ_opt().filter(|d| *d <= hi);
    let before = gap.start.pred_opt().filter(|d| *d >= lo);

    match (before, after) {
        (Some(b), Some(a)) => {
            if (date - b) <= (a - date) {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => lo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn garfield() -> Title {
        Title::new("garfield", "Garfield", "Jim Davis", date(1978, 6, 19), Vec::new()).unwrap()
    }

    fn gappy() -> Title {
        Title::new(
            "wumo",
            "WuMo",
            "Mikael Wulff and Anders Morgenthaler",
            date(2013, 10, 13),
            vec![
                Gap::new(date(2014, 1, 1), date(2014, 3, 31)).unwrap(),
                Gap::new(date(2016, 7, 1), date(2016, 7, 4)).unwrap(),
            ],
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 5, 1)
    }

    #[test]
    fn test_before_earliest_is_unavailable() {
        let title = garfield();
        assert!(AvailabilityModel::is_known_unavailable_on(
            &title,
            date(1978, 6, 18),
            today()
        ));
        assert!(!AvailabilityModel::is_known_unavailable_on(
            &title,
            date(1978, 6, 19),
            today()
        ));
    }

    #[test]
    fn test_future_is_unavailable() {
        let title = garfield();
        assert_eq!(
            AvailabilityModel::unavailability_on(&title, date(2024, 5, 2), today()),
            Some(Unavailability::InFuture)
        );
    }

    #[test]
    fn test_every_gap_date_is_unavailable_and_forward_skips_gap() {
        let title = gappy();
        for gap in title.gaps() {
            let mut d = gap.start;
            while d <= gap.end {
                assert!(AvailabilityModel::is_known_unavailable_on(&title, d, today()));
                let next = AvailabilityModel::next_available_on(&title, d, Direction::Forward, today());
                assert!(next > gap.end, "{d} -> {next} should pass {gap}");
                d = d.succ_opt().unwrap();
            }
        }
    }

    #[test]
    fn test_backward_skips_gap() {
        let title = gappy();
        let next = AvailabilityModel::next_available_on(
            &title,
            date(2014, 4, 1),
            Direction::Backward,
            today(),
        );
        assert_eq!(next, date(2013, 12, 31));
    }

    #[test]
    fn test_next_available_stops_at_boundaries() {
        let title = garfield();
        assert_eq!(
            AvailabilityModel::next_available_on(&title, today(), Direction::Forward, today()),
            today()
        );
        assert_eq!(
            AvailabilityModel::next_available_on(
                &title,
                date(1978, 6, 19),
                Direction::Backward,
                today()
            ),
            date(1978, 6, 19)
        );
        assert_eq!(
            AvailabilityModel::next_available_on(
                &title,
                date(1900, 1, 1),
                Direction::Forward,
                today()
            ),
            date(1978, 6, 19)
        );
    }

    #[test]
    fn test_gap_touching_today_returns_boundary() {
        let title = Title::new(
            "shoe",
            "Shoe",
            "Gary Brookins",
            date(2001, 4, 8),
            vec![Gap::new(date(2024, 4, 20), date(2024, 5, 1)).unwrap()],
        )
        .unwrap();
        assert_eq!(
            AvailabilityModel::next_available_on(
                &title,
                date(2024, 4, 19),
                Direction::Forward,
                today()
            ),
            today()
        );
    }

    #[test]
    fn test_clamp() {
        let title = garfield();
        assert_eq!(
            AvailabilityModel::clamp_to_valid_range_on(&title, date(1970, 1, 1), today()),
            date(1978, 6, 19)
        );
        assert_eq!(
            AvailabilityModel::clamp_to_valid_range_on(&title, date(2030, 1, 1), today()),
            today()
        );
        assert_eq!(
            AvailabilityModel::clamp_to_valid_range_on(&title, date(2000, 1, 1), today()),
            date(2000, 1, 1)
        );
    }

    #[test]
    fn test_random_available_never_in_gap() {
        let title = gappy();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let d = AvailabilityModel::random_available_with(&title, today(), &mut rng);
            assert!(!AvailabilityModel::is_known_unavailable_on(&title, d, today()));
        }
    }

    #[test]
    fn test_random_available_mostly_covered_range() {
        let title = Title::new(
            "bc",
            "B.C.",
            "Johnny Hart",
            date(2024, 1, 1),
            vec![Gap::new(date(2024, 1, 1), date(2024, 4, 29)).unwrap()],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let d = AvailabilityModel::random_available_with(&title, today(), &mut rng);
            assert!(d == date(2024, 4, 30) || d == today());
        }
    }

    #[test]
    fn test_unavailable_ranges_window() {
        let title = gappy();
        let ranges =
            AvailabilityModel::unavailable_ranges(&title, date(2016, 7, 1), date(2016, 7, 31));
        assert_eq!(ranges, vec![Gap::new(date(2016, 7, 1), date(2016, 7, 4)).unwrap()]);
    }
}
