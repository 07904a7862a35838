// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Time range validation and encoding for calendar queries.
//!
//! Matching is done by the server over the half-open interval `[start, end)`
//! (RFC 4791 §9.9): an object matches when any of its occurrences overlaps
//! the interval. The client never re-filters what the server returns.

use std::fmt;

use jiff::Timestamp;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;

use crate::error::CalDavError;

/// Format of `time-range` and `expand` attributes (RFC 4791 §9.9).
const CALDAV_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A validated pair of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    /// Creates a time range from already validated instants.
    #[must_use]
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Parses both bounds as ISO 8601 date-times.
    ///
    /// Accepted inputs are instants with an offset (`2021-05-01T00:00:00Z`,
    /// `2021-05-01T08:00:00+08:00`), date-times without an offset and plain
    /// dates, the last two being read as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidTimeRange`] if either bound does not parse.
    pub fn parse(start: &str, end: &str) -> Result<Self, CalDavError> {
        Ok(Self {
            start: parse_instant(start)?,
            end: parse_instant(end)?,
        })
    }

    /// Start of the range (inclusive).
    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    /// End of the range (exclusive).
    #[must_use]
    pub const fn end(&self) -> Timestamp {
        self.end
    }

    /// Start encoded for `time-range`/`expand`, e.g. `20210501T000000Z`.
    #[must_use]
    pub fn caldav_start(&self) -> String {
        self.start.strftime(CALDAV_UTC_FORMAT).to_string()
    }

    /// End encoded for `time-range`/`expand`.
    #[must_use]
    pub fn caldav_end(&self) -> String {
        self.end.strftime(CALDAV_UTC_FORMAT).to_string()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

fn parse_instant(s: &str) -> Result<Timestamp, CalDavError> {
    let s = s.trim();
    // RFC 9557 annotations (`[Asia/Shanghai]`) are not ISO 8601, and jiff
    // ignores them on civil date-times.
    if s.contains('[') {
        tracing::debug!(input = s, "rejecting annotated time range bound");
        return Err(CalDavError::InvalidTimeRange);
    }
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Ok(ts);
    }
    if let Ok(ts) = s
        .parse::<DateTime>()
        .and_then(|dt| dt.to_zoned(TimeZone::UTC))
        .map(|zdt| zdt.timestamp())
    {
        return Ok(ts);
    }
    s.parse::<Date>()
        .and_then(|d| d.to_zoned(TimeZone::UTC))
        .map(|zdt| zdt.timestamp())
        .map_err(|e| {
            tracing::debug!(input = s, error = %e, "rejecting time range bound");
            CalDavError::InvalidTimeRange
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_parse_utc_instants() {
        let range = TimeRange::parse("2021-05-01T00:00:00Z", "2021-05-02T00:00:00.000Z").unwrap();
        assert_eq!(range.caldav_start(), "20210501T000000Z");
        assert_eq!(range.caldav_end(), "20210502T000000Z");
    }

    #[test]
    fn time_range_parse_converts_offsets_to_utc() {
        let range =
            TimeRange::parse("2021-05-01T08:00:00+08:00", "2021-05-01T12:30:00-02:00").unwrap();
        assert_eq!(range.caldav_start(), "20210501T000000Z");
        assert_eq!(range.caldav_end(), "20210501T143000Z");
    }

    #[test]
    fn time_range_parse_floating_and_dates_as_utc() {
        let range = TimeRange::parse("2021-05-01T09:15:00", "2021-05-03").unwrap();
        assert_eq!(range.caldav_start(), "20210501T091500Z");
        assert_eq!(range.caldav_end(), "20210503T000000Z");
    }

    #[test]
    fn time_range_parse_rejects_non_iso8601() {
        let err = TimeRange::parse("Sat May 01 2021 00:00:00 GMT+0800", "2021-05-02T00:00:00Z")
            .unwrap_err();
        assert!(matches!(err, CalDavError::InvalidTimeRange));
        assert_eq!(err.to_string(), "invalid timeRange format, not in ISO8601");

        let err = TimeRange::parse("2021-05-01T00:00:00Z", "tomorrow").unwrap_err();
        assert!(matches!(err, CalDavError::InvalidTimeRange));

        assert!(TimeRange::parse("", "2021-05-02T00:00:00Z").is_err());
    }

    #[test]
    fn time_range_parse_rejects_zone_annotations() {
        for bound in [
            "2021-05-01T08:00:00[Asia/Shanghai]",
            "2021-05-01T00:00:00Z[UTC]",
            "2021-05-01T08:00:00+08:00[Asia/Shanghai]",
            "2021-05-01[Asia/Shanghai]",
        ] {
            let err = TimeRange::parse(bound, "2021-05-02T00:00:00Z").unwrap_err();
            assert!(matches!(err, CalDavError::InvalidTimeRange), "{bound}");
        }
    }

    #[test]
    fn time_range_does_not_enforce_ordering() {
        let range = TimeRange::parse("2021-06-01T00:00:00Z", "2021-05-01T00:00:00Z").unwrap();
        assert!(range.start() > range.end());
    }
}
