use chrono::{DateTime, Duration, Utc};

/// Julian day of the unix epoch, 1970-01-01T00:00:00Z.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MICROS_PER_DAY: f64 = 86_400e6;

pub const TWO_DAYS_S: i64 = 2 * 24 * 60 * 60;

/// Add a fractional number of seconds to a timestamp, at microsecond
/// resolution.
pub fn add_seconds(t: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    t + Duration::microseconds((seconds * 1e6).round() as i64)
}

/// Immutable time-system value. Constructed once at startup and passed by
/// reference into every component that converts between UTC timestamps and
/// Julian days; no module-level state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeScale {
    _priv: (),
}

impl TimeScale {
    pub fn new() -> Self {
        TimeScale { _priv: () }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn julian_day(&self, t: DateTime<Utc>) -> f64 {
        t.timestamp_micros() as f64 / MICROS_PER_DAY + UNIX_EPOCH_JD
    }

    /// Inverse of [`julian_day`](Self::julian_day), rounded to the nearest
    /// microsecond. Out-of-range days clamp to the representable extremes.
    pub fn from_julian_day(&self, jd: f64) -> DateTime<Utc> {
        let micros = ((jd - UNIX_EPOCH_JD) * MICROS_PER_DAY).round();
        if micros <= i64::MIN as f64 {
            return DateTime::<Utc>::MIN_UTC;
        }
        if micros >= i64::MAX as f64 {
            return DateTime::<Utc>::MAX_UTC;
        }
        DateTime::<Utc>::from_timestamp_micros(micros as i64)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whole Julian day containing `t`; the unit of cache bucketing.
    pub fn day_bucket(&self, t: DateTime<Utc>) -> i64 {
        self.julian_day(t).floor() as i64
    }

    /// The `[start, end)` UTC span of a whole Julian day.
    pub fn bucket_range(&self, bucket: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.from_julian_day(bucket as f64),
            self.from_julian_day((bucket + 1) as f64),
        )
    }

    pub fn midpoint(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        start + (end - start) / 2
    }

    /// ISO-8601 UTC with six fractional digits, the projection format.
    pub fn iso_micro(&self, t: DateTime<Utc>) -> String {
        t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }

    /// Fill in a missing range with the default propagation window, "now"
    /// until two days from now.
    pub fn default_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = start.unwrap_or_else(|| self.now());
        let end = end.unwrap_or_else(|| start + Duration::seconds(TWO_DAYS_S));
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn julian_day_of_unix_epoch() {
        let ts = TimeScale::new();
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(ts.julian_day(epoch), UNIX_EPOCH_JD);
    }

    #[test]
    fn julian_day_round_trips() {
        let ts = TimeScale::new();
        let t = Utc.with_ymd_and_hms(2018, 5, 23, 1, 2, 3).unwrap();
        let back = ts.from_julian_day(ts.julian_day(t));
        assert!((back - t).num_microseconds().unwrap().abs() <= 1);
    }

    #[test]
    fn bucket_range_spans_one_day() {
        let ts = TimeScale::new();
        let t = Utc.with_ymd_and_hms(2018, 5, 23, 12, 0, 0).unwrap();
        let bucket = ts.day_bucket(t);
        let (start, end) = ts.bucket_range(bucket);
        assert_eq!((end - start).num_seconds(), 86_400);
        assert!(start <= t && t < end);
    }

    #[test]
    fn day_bucket_splits_at_julian_noon() {
        let ts = TimeScale::new();
        // Julian days roll over at 12:00 UTC.
        let morning = Utc.with_ymd_and_hms(2018, 5, 23, 11, 59, 59).unwrap();
        let noon = Utc.with_ymd_and_hms(2018, 5, 23, 12, 0, 0).unwrap();
        assert_eq!(ts.day_bucket(morning) + 1, ts.day_bucket(noon));
    }

    #[test]
    fn iso_micro_has_six_fractional_digits() {
        let ts = TimeScale::new();
        let t = Utc.with_ymd_and_hms(2018, 5, 23, 1, 2, 3).unwrap();
        assert_eq!(ts.iso_micro(t), "2018-05-23T01:02:03.000000Z");
    }

    #[test]
    fn add_seconds_handles_fractions() {
        let t = Utc.with_ymd_and_hms(2018, 5, 23, 1, 2, 3).unwrap();
        let later = add_seconds(t, 0.5);
        assert_eq!((later - t).num_milliseconds(), 500);
        let earlier = add_seconds(t, -90.0);
        assert_eq!((t - earlier).num_seconds(), 90);
    }

    #[test]
    fn midpoint_is_centered() {
        let ts = TimeScale::new();
        let a = Utc.with_ymd_and_hms(2018, 5, 23, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2018, 5, 23, 0, 10, 0).unwrap();
        let mid = ts.midpoint(a, b);
        assert_eq!((mid - a).num_seconds(), 300);
    }
}
