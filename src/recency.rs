//! Relative date ranges for the entries listing and charts pages.
//!
//! A recency window such as "the last 3 months" is written as a path segment
//! like `3months`. Month and year arithmetic follows the calendar (variable
//! month lengths, leap years); a target date that does not exist rolls
//! forward to the first day of the following month.

use std::str::FromStr;

use time::{Date, Duration, Month, OffsetDateTime};

use crate::{Error, entry::Entry};

/// The time units accepted by [subtract_timedelta] and recency window path
/// segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Calendar years.
    Years,
    /// Calendar months.
    Months,
    /// Seven-day weeks.
    Weeks,
    /// Twenty-four-hour days.
    Days,
    /// Hours.
    Hours,
    /// Minutes.
    Minutes,
    /// Seconds.
    Seconds,
}

impl TimeUnit {
    /// The unit as it appears in a recency window path segment.
    pub fn as_path_value(self) -> &'static str {
        match self {
            Self::Years => "years",
            Self::Months => "months",
            Self::Weeks => "weeks",
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "years" => Ok(Self::Years),
            "months" => Ok(Self::Months),
            "weeks" => Ok(Self::Weeks),
            "days" => Ok(Self::Days),
            "hours" => Ok(Self::Hours),
            "minutes" => Ok(Self::Minutes),
            "seconds" => Ok(Self::Seconds),
            _ => Err(Error::UnknownTimeUnit(string.to_owned())),
        }
    }
}

/// A recency window parsed from a path segment such as `3months`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    /// How many units the window spans.
    pub amount: i64,
    /// The unit the window is measured in.
    pub unit: TimeUnit,
}

impl RecencyWindow {
    /// Parse a path segment of the form `{amount}{unit}`, e.g. `2weeks`.
    ///
    /// Returns [None] if the segment is not an integer immediately followed
    /// by a recognized unit.
    pub fn parse(segment: &str) -> Option<Self> {
        let (amount, unit) = sscanf::sscanf!(segment, "{i64}{str}")?;
        let unit = unit.parse().ok()?;

        Some(Self { amount, unit })
    }

    /// The window as a path segment, the inverse of [RecencyWindow::parse].
    pub fn as_path_value(self) -> String {
        format!("{}{}", self.amount, self.unit.as_path_value())
    }
}

/// Compute the instant `amount` units before `end`.
///
/// Year and month arithmetic keeps the day-of-month and time-of-day. When
/// the target month is too short for the day (e.g. 31 February), the result
/// rolls forward to the first day of the following month. The remaining
/// units subtract a fixed-length duration.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeTimeDelta] if `amount` is negative,
/// - or [Error::InvalidDateRange] if the result falls outside the
///   representable date range.
pub fn subtract_timedelta(
    end: OffsetDateTime,
    amount: i64,
    unit: TimeUnit,
) -> Result<OffsetDateTime, Error> {
    if amount < 0 {
        return Err(Error::NegativeTimeDelta(amount));
    }

    match unit {
        TimeUnit::Years => {
            let year = i32::try_from(end.year() as i64 - amount).map_err(|_| Error::InvalidDateRange)?;

            replace_date_rolling_forward(end, year, end.month())
        }
        TimeUnit::Months => {
            // Count months from an imaginary month zero so that borrowing
            // whole years from the month number is a floored division.
            let months_since_zero = month_number(end.month()) as i64 - amount - 1;
            let month = month_from_number((months_since_zero.rem_euclid(12) + 1) as u8);
            let year = i32::try_from(end.year() as i64 + months_since_zero.div_euclid(12))
                .map_err(|_| Error::InvalidDateRange)?;

            replace_date_rolling_forward(end, year, month)
        }
        TimeUnit::Weeks => checked_subtract(end, Duration::weeks(amount)),
        TimeUnit::Days => checked_subtract(end, Duration::days(amount)),
        TimeUnit::Hours => checked_subtract(end, Duration::hours(amount)),
        TimeUnit::Minutes => checked_subtract(end, Duration::minutes(amount)),
        TimeUnit::Seconds => checked_subtract(end, Duration::seconds(amount)),
    }
}

/// Restrict `entries` to those within `amount` `unit`s before `end`,
/// preserving their relative order.
///
/// Passing [None] for both `amount` and `unit` returns the collection
/// unfiltered. `end` defaults to the current instant. Both ends of the
/// window are inclusive.
///
/// # Errors
/// This function will return a:
/// - [Error::UnpairedRecencyArguments] if exactly one of `amount` and `unit`
///   is provided,
/// - or [Error::InvalidDateRange] if the window start could not be computed.
pub fn get_recent_entries(
    entries: Vec<Entry>,
    amount: Option<i64>,
    unit: Option<TimeUnit>,
    end: Option<OffsetDateTime>,
) -> Result<Vec<Entry>, Error> {
    let (amount, unit) = match (amount, unit) {
        (None, None) => return Ok(entries),
        (Some(amount), Some(unit)) => (amount, unit),
        _ => return Err(Error::UnpairedRecencyArguments),
    };

    let end = end.unwrap_or_else(OffsetDateTime::now_utc);
    let start = subtract_timedelta(end, amount, unit).map_err(|error| {
        tracing::debug!("could not compute the start of the recency window: {error}");
        Error::InvalidDateRange
    })?;

    Ok(entries
        .into_iter()
        .filter(|entry| start <= entry.date && entry.date <= end)
        .collect())
}

fn checked_subtract(end: OffsetDateTime, duration: Duration) -> Result<OffsetDateTime, Error> {
    end.checked_sub(duration).ok_or(Error::InvalidDateRange)
}

/// Rebuild `end` on the target year and month, keeping its day and
/// time-of-day, rolling forward to the first of the following month when the
/// day does not exist in the target month.
fn replace_date_rolling_forward(
    end: OffsetDateTime,
    year: i32,
    month: Month,
) -> Result<OffsetDateTime, Error> {
    let day = end.day();
    let (year, month, day) = if day > last_day_of_month(year, month) {
        match month {
            Month::December => (year.checked_add(1).ok_or(Error::InvalidDateRange)?, Month::January, 1),
            month => (year, month.next(), 1),
        }
    } else {
        (year, month, day)
    };

    let date =
        Date::from_calendar_date(year, month, day).map_err(|_| Error::InvalidDateRange)?;

    Ok(end.replace_date(date))
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn month_number(month: Month) -> u8 {
    match month {
        Month::January => 1,
        Month::February => 2,
        Month::March => 3,
        Month::April => 4,
        Month::May => 5,
        Month::June => 6,
        Month::July => 7,
        Month::August => 8,
        Month::September => 9,
        Month::October => 10,
        Month::November => 11,
        Month::December => 12,
    }
}

fn month_from_number(month: u8) -> Month {
    match month {
        1 => Month::January,
        2 => Month::February,
        3 => Month::March,
        4 => Month::April,
        5 => Month::May,
        6 => Month::June,
        7 => Month::July,
        8 => Month::August,
        9 => Month::September,
        10 => Month::October,
        11 => Month::November,
        12 => Month::December,
        _ => panic!("invalid month number {month}"),
    }
}
