//! Groups entries into the chart-ready shapes used by the charts page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, Time, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{entry::Entry, tag::TagName};

/// ECMAScript-compatible date-time strings with millisecond precision, e.g.
/// `2000-01-02T00:00:00.000+13:00`. These parse cleanly in the browser's
/// `Date` constructor.
const DAY_KEY_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

/// Sum up the amount spent per category per calendar day.
///
/// Entry dates are converted to `local_offset` before truncating to a day,
/// so days line up with the user's timezone rather than UTC. Day buckets
/// whose amounts sum to zero are dropped, but a category keeps its key even
/// when every bucket drops.
pub fn aggregate_entries(
    entries: &[Entry],
    local_offset: UtcOffset,
) -> HashMap<TagName, HashMap<String, f64>> {
    let mut totals: HashMap<TagName, HashMap<String, f64>> = HashMap::new();

    for entry in entries {
        let day_totals = totals.entry(entry.category.clone()).or_default();

        *day_totals
            .entry(day_key(entry.date, local_offset))
            .or_default() += entry.amount;
    }

    for day_totals in totals.values_mut() {
        day_totals.retain(|_, total| *total != 0.0);
    }

    totals
}

/// A flat view of an [Entry] for the scatter chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableEntry {
    /// The entry's instant as milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// The amount of money spent.
    pub amount: f64,
    /// The category the entry belongs to.
    pub category: TagName,
}

/// Flatten entries to [SerializableEntry] records, preserving input order.
pub fn prepare_entries_for_serialization(entries: &[Entry]) -> Vec<SerializableEntry> {
    entries
        .iter()
        .map(|entry| SerializableEntry {
            timestamp_ms: unix_timestamp_ms(entry.date),
            amount: entry.amount,
            category: entry.category.clone(),
        })
        .collect()
}

fn day_key(date: OffsetDateTime, local_offset: UtcOffset) -> String {
    let day_start = date.to_offset(local_offset).replace_time(Time::MIDNIGHT);

    day_start
        .format(DAY_KEY_FORMAT)
        .unwrap_or_else(|_| day_start.to_string())
}

/// Milliseconds since the Unix epoch, rounded to the nearest integer.
fn unix_timestamp_ms(date: OffsetDateTime) -> i64 {
    (date.unix_timestamp_nanos() + 500_000).div_euclid(1_000_000) as i64
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod aggregate_entries_tests {
    use std::collections::HashMap;

    use time::macros::{datetime, offset};

    use crate::{
        aggregation::aggregate_entries,
        entry::Entry,
        tag::TagName,
    };

    fn create_test_entry(amount: f64, date: time::OffsetDateTime, category: &str) -> Entry {
        Entry {
            id: 0,
            amount,
            date,
            category: TagName::new_unchecked(category),
            tags: Vec::new(),
            comment: String::new(),
        }
    }

    #[test]
    fn no_entries_aggregate_to_an_empty_map() {
        let totals = aggregate_entries(&[], offset!(UTC));

        assert_eq!(totals, HashMap::new());
    }

    #[test]
    fn same_day_entries_sum_into_one_bucket() {
        let entries = [
            create_test_entry(1.5, datetime!(2000-01-02 10:00:00 UTC), "groceries"),
            create_test_entry(2.5, datetime!(2000-01-02 20:00:00 UTC), "groceries"),
        ];

        let totals = aggregate_entries(&entries, offset!(UTC));

        let day_totals = &totals[&TagName::new_unchecked("groceries")];
        assert_eq!(day_totals.len(), 1);
        assert_eq!(day_totals["2000-01-02T00:00:00.000+00:00"], 4.0);
    }

    #[test]
    fn entries_bucket_by_local_day_not_utc_day() {
        let entries = [create_test_entry(
            5.0,
            datetime!(2000-01-01 23:00:00 UTC),
            "groceries",
        )];

        let totals = aggregate_entries(&entries, offset!(+13));

        let day_totals = &totals[&TagName::new_unchecked("groceries")];
        assert_eq!(day_totals["2000-01-02T00:00:00.000+13:00"], 5.0);
    }

    #[test]
    fn categories_aggregate_separately() {
        let date = datetime!(2000-01-02 10:00:00 UTC);
        let entries = [
            create_test_entry(1.0, date, "groceries"),
            create_test_entry(2.0, date, "rent"),
        ];

        let totals = aggregate_entries(&entries, offset!(UTC));

        assert_eq!(totals.len(), 2);
        assert_eq!(
            totals[&TagName::new_unchecked("groceries")]["2000-01-02T00:00:00.000+00:00"],
            1.0
        );
        assert_eq!(
            totals[&TagName::new_unchecked("rent")]["2000-01-02T00:00:00.000+00:00"],
            2.0
        );
    }

    #[test]
    fn zero_sum_days_are_dropped_but_the_category_remains() {
        let entries = [create_test_entry(
            0.0,
            datetime!(2000-01-02 10:00:00 UTC),
            "groceries",
        )];

        let totals = aggregate_entries(&entries, offset!(UTC));

        assert_eq!(totals[&TagName::new_unchecked("groceries")], HashMap::new());
    }

    #[test]
    fn different_days_get_separate_buckets() {
        let entries = [
            create_test_entry(1.0, datetime!(2000-01-02 10:00:00 UTC), "groceries"),
            create_test_entry(2.0, datetime!(2000-01-03 10:00:00 UTC), "groceries"),
        ];

        let totals = aggregate_entries(&entries, offset!(UTC));

        let day_totals = &totals[&TagName::new_unchecked("groceries")];
        assert_eq!(day_totals["2000-01-02T00:00:00.000+00:00"], 1.0);
        assert_eq!(day_totals["2000-01-03T00:00:00.000+00:00"], 2.0);
    }
}
