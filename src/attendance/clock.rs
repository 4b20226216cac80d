use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

/// A business day: the half-open interval [start, end) running from local
/// midnight to the next local midnight, keyed by the local calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBucket {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Maps "now" to the current business-day bucket for the configured offset.
pub fn resolve_today(now: DateTime<Utc>, business_tz: FixedOffset) -> DayBucket {
    day_bucket(now.with_timezone(&business_tz).date_naive(), business_tz)
}

/// Bucket for an arbitrary local calendar date.
pub fn day_bucket(date: NaiveDate, business_tz: FixedOffset) -> DayBucket {
    // local wall-clock minus the offset is the same instant in UTC
    let midnight = date.and_time(NaiveTime::MIN);
    let start_naive = midnight - Duration::seconds(i64::from(business_tz.local_minus_utc()));
    let start = DateTime::<Utc>::from_naive_utc_and_offset(start_naive, Utc);
    DayBucket {
        date,
        start,
        end: start + Duration::hours(24),
    }
}

/// Rounds a span to whole minutes, half up, from millisecond resolution.
///
/// Each break duration and the overall elapsed span are rounded independently,
/// so the persisted work total can differ by a minute from raw span arithmetic.
/// That drift is an accepted accounting approximation; keep the two-step
/// rounding as is.
pub fn round_minutes(span: Duration) -> i64 {
    (span.num_milliseconds() + 30_000).div_euclid(60_000)
}
