use chrono::{Days, NaiveDate, NaiveDateTime, TimeDelta};
use rand::Rng;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    span_days: u64,
}

impl DateRange {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        let span = end.signed_duration_since(start).num_days();
        u64::try_from(span)
            .ok()
            .map(|span_days| Self { start, span_days })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        let offset = rng.random_range(0..=self.span_days);
        self.start
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.start)
    }
}

/// Inclusive timestamp range with whole-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRange {
    start: NaiveDateTime,
    span_seconds: i64,
}

impl TimestampRange {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        let span_seconds = end.signed_duration_since(start).num_seconds();
        (span_seconds >= 0).then_some(Self {
            start,
            span_seconds,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDateTime {
        let offset = rng.random_range(0..=self.span_seconds);
        self.start
            .checked_add_signed(TimeDelta::seconds(offset))
            .unwrap_or(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn reversed_ranges_are_rejected() {
        assert!(DateRange::new(date(2024, 1, 2), date(2024, 1, 1)).is_none());
        let start = date(2024, 1, 1).and_hms_opt(0, 0, 1).expect("time");
        let end = date(2024, 1, 1).and_hms_opt(0, 0, 0).expect("time");
        assert!(TimestampRange::new(start, end).is_none());
    }

    #[test]
    fn single_point_ranges_always_hit_the_point() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let day = date(2024, 2, 29);
        let range = DateRange::new(day, day).expect("range");
        assert!((0..50).all(|_| range.sample(&mut rng) == day));
    }

    #[test]
    fn timestamps_cover_both_ends() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let start = date(2024, 1, 1).and_hms_opt(0, 0, 0).expect("time");
        let end = start + TimeDelta::seconds(2);
        let range = TimestampRange::new(start, end).expect("range");
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let value = range.sample(&mut rng);
            assert!(value >= start && value <= end);
            seen.insert(value);
        }
        assert_eq!(seen.len(), 3);
    }
}
