//! Parsing and validation for entry form fields.
//!
//! These rules are shared by the creation form, the edit form and the bulk
//! update pipeline so that every path into the database accepts the same
//! values.

use serde_json::Value;
use time::{
    Date, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

/// The date-time layouts accepted by the entry forms, tried in order.
const DATE_TIME_FORMATS: &[&[BorrowedFormatItem]] = &[
    format_description!(
        "[year]-[month padding:none]-[day padding:none]T[hour padding:none]:[minute padding:none]:[second padding:none]"
    ),
    format_description!(
        "[year]-[month padding:none]-[day padding:none]T[hour padding:none]:[minute padding:none]"
    ),
    format_description!(
        "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute padding:none]:[second padding:none]"
    ),
    format_description!(
        "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute padding:none]"
    ),
];

/// The date-only layouts accepted by the entry forms, tried in order.
/// Date-only values take midnight.
const DATE_FORMATS: &[&[BorrowedFormatItem]] = &[
    format_description!("[year]-[month padding:none]-[day padding:none]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
    format_description!("[day padding:none] [month repr:long] [year]"),
];

/// Parse a form value as a non-negative amount of money.
///
/// # Errors
/// This function will return an [Error::InvalidAmount] if `text` cannot be
/// parsed as a number or the number is negative.
pub fn parse_amount(text: &str) -> Result<f64, Error> {
    let amount: f64 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(text.to_owned()))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount(text.to_owned()));
    }

    Ok(amount)
}

/// Parse a form value as a date, accepting the layouts people actually type:
/// ISO dates and date-times (`2000-01-23`, `2000-01-23 12:34`), US-style
/// dates (`1/23/2000`) and written-out dates (`23 January 2000`).
///
/// The result carries no UTC offset. Callers decide which timezone the
/// date-time belongs to. A bare number such as a Unix timestamp matches
/// none of the layouts and is rejected as ambiguous.
///
/// # Errors
/// This function will return an [Error::InvalidDate] if `text` matches none
/// of the accepted layouts.
pub fn parse_entry_date(text: &str) -> Result<PrimitiveDateTime, Error> {
    let text = text.trim();

    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = PrimitiveDateTime::parse(text, format) {
            return Ok(date_time);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(text, format) {
            return Ok(date.midnight());
        }
    }

    Err(Error::InvalidDate(text.to_owned()))
}

/// Coerce a JSON value to the string a user would have typed into a form.
///
/// Strings are taken as-is, other values use their JSON text. Returns
/// [None] for null.
pub fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
