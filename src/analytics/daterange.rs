//! Date-range selectors and bucket granularity
//!
//! Dashboard queries are scoped by a symbolic selector token ("24h", "1w",
//! "1m", "3m", "1y"). A selector resolves to a concrete lookback window that
//! always closes at "now", plus the granularity used to truncate timestamps
//! into chart buckets.

use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc};
use serde::Serialize;

/// Symbolic date-range token chosen by the dashboard user.
///
/// Parsing never fails: anything outside the enumerated set falls back to the
/// first variant. The fallback is a deliberate policy, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateRangeSelector {
    Last24Hours,
    LastWeek,
    LastMonth,
    LastQuarter,
    LastYear,
}

/// Truncation granularity used when grouping page views into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketGranularity {
    Hour,
    Day,
    Month,
}

/// A selector resolved against a concrete instant: the window start and the
/// bucket granularity. The window always closes at the resolution instant.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRange {
    pub start: DateTime<Utc>,
    pub granularity: BucketGranularity,
}

impl DateRangeSelector {
    /// All selectors in display order. The first entry doubles as the
    /// fallback for unknown input.
    pub const ALL: [DateRangeSelector; 5] = [
        DateRangeSelector::Last24Hours,
        DateRangeSelector::LastWeek,
        DateRangeSelector::LastMonth,
        DateRangeSelector::LastQuarter,
        DateRangeSelector::LastYear,
    ];

    /// Parse a selector token, substituting the default for anything
    /// unrecognized. Total over all string input.
    pub fn parse_or_default(token: &str) -> Self {
        match token {
            "24h" => DateRangeSelector::Last24Hours,
            "1w" => DateRangeSelector::LastWeek,
            "1m" => DateRangeSelector::LastMonth,
            "3m" => DateRangeSelector::LastQuarter,
            "1y" => DateRangeSelector::LastYear,
            _ => DateRangeSelector::ALL[0],
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            DateRangeSelector::Last24Hours => "24h",
            DateRangeSelector::LastWeek => "1w",
            DateRangeSelector::LastMonth => "1m",
            DateRangeSelector::LastQuarter => "3m",
            DateRangeSelector::LastYear => "1y",
        }
    }

    /// Resolve the selector into a lookback window ending at `now`.
    ///
    /// "1w" spans seven calendar days including today, hence the six-day
    /// lookback.
    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedRange {
        match self {
            DateRangeSelector::Last24Hours => ResolvedRange {
                start: now - Duration::hours(24),
                granularity: BucketGranularity::Hour,
            },
            DateRangeSelector::LastWeek => ResolvedRange {
                start: now - Duration::days(6),
                granularity: BucketGranularity::Day,
            },
            DateRangeSelector::LastMonth => ResolvedRange {
                start: now - Months::new(1),
                granularity: BucketGranularity::Day,
            },
            DateRangeSelector::LastQuarter => ResolvedRange {
                start: now - Months::new(3),
                granularity: BucketGranularity::Day,
            },
            DateRangeSelector::LastYear => ResolvedRange {
                start: now - Months::new(12),
                granularity: BucketGranularity::Month,
            },
        }
    }
}

impl BucketGranularity {
    /// Human-readable label for a bucket starting at `bucket_start`.
    ///
    /// Labels are for display only; chronological ordering is always done on
    /// the underlying truncated timestamp.
    pub fn label(&self, bucket_start: DateTime<Utc>) -> String {
        match self {
            BucketGranularity::Hour => format!(
                "{}, {}",
                bucket_start.format("%d %b"),
                hour_range_label(bucket_start.hour())
            ),
            BucketGranularity::Day => bucket_start.format("%d %b").to_string(),
            BucketGranularity::Month => format!(
                "{} {}",
                bucket_start.year(),
                bucket_start.format("%b")
            ),
        }
    }
}

/// Render an hour-of-day as a 12-hour "HH - HH AM/PM" span.
///
/// The noon/midnight hours render as "12 - 01" rather than "00 - 01", and the
/// 11 o'clock hours carry the meridiem of the hour they roll into.
fn hour_range_label(hour: u32) -> String {
    match hour {
        0 => "12 - 01 AM".to_string(),
        11 => "11 - 12 PM".to_string(),
        12 => "12 - 01 PM".to_string(),
        23 => "11 - 12 AM".to_string(),
        h => {
            let (start, meridiem) = if h < 12 { (h, "AM") } else { (h - 12, "PM") };
            format!("{:02} - {:02} {}", start, start + 1, meridiem)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_tokens_fall_back_to_default() {
        for token in ["", "7d", "last-year", "24H", "garbage"] {
            assert_eq!(
                DateRangeSelector::parse_or_default(token),
                DateRangeSelector::parse_or_default("24h"),
                "token {:?} should resolve like 24h",
                token
            );
        }
    }

    #[test]
    fn known_tokens_round_trip() {
        for selector in DateRangeSelector::ALL {
            assert_eq!(
                DateRangeSelector::parse_or_default(selector.token()),
                selector
            );
        }
    }

    #[test]
    fn selector_window_and_granularity() {
        let now = Utc.with_ymd_and_hms(2026, 8, 5, 15, 30, 0).unwrap();

        let range = DateRangeSelector::Last24Hours.resolve(now);
        assert_eq!(range.start, now - Duration::hours(24));
        assert_eq!(range.granularity, BucketGranularity::Hour);

        let range = DateRangeSelector::LastWeek.resolve(now);
        assert_eq!(range.start, now - Duration::days(6));
        assert_eq!(range.granularity, BucketGranularity::Day);

        let range = DateRangeSelector::LastMonth.resolve(now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 7, 5, 15, 30, 0).unwrap());
        assert_eq!(range.granularity, BucketGranularity::Day);

        let range = DateRangeSelector::LastQuarter.resolve(now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 5, 5, 15, 30, 0).unwrap());
        assert_eq!(range.granularity, BucketGranularity::Day);

        let range = DateRangeSelector::LastYear.resolve(now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 8, 5, 15, 30, 0).unwrap());
        assert_eq!(range.granularity, BucketGranularity::Month);
    }

    #[test]
    fn hour_labels_use_twelve_hour_spans() {
        assert_eq!(hour_range_label(0), "12 - 01 AM");
        assert_eq!(hour_range_label(1), "01 - 02 AM");
        assert_eq!(hour_range_label(10), "10 - 11 AM");
        assert_eq!(hour_range_label(11), "11 - 12 PM");
        assert_eq!(hour_range_label(12), "12 - 01 PM");
        assert_eq!(hour_range_label(13), "01 - 02 PM");
        assert_eq!(hour_range_label(22), "10 - 11 PM");
        assert_eq!(hour_range_label(23), "11 - 12 AM");
    }

    #[test]
    fn bucket_labels_per_granularity() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 5, 13, 0, 0).unwrap();
        assert_eq!(BucketGranularity::Hour.label(dt), "05 Aug, 01 - 02 PM");
        assert_eq!(BucketGranularity::Day.label(dt), "05 Aug");
        assert_eq!(BucketGranularity::Month.label(dt), "2026 Aug");
    }
}
