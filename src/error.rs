//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, entry::EntryId, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used to create a tag name.
    #[error("Tag name cannot be empty")]
    EmptyTagName,

    /// A negative amount was given for a relative date range.
    ///
    /// Relative ranges count backwards from their end date, so the amount
    /// must be zero or more.
    #[error("time deltas must be non-negative, got {0}")]
    NegativeTimeDelta(i64),

    /// A string could not be parsed as one of the recognized time units.
    #[error("\"{0}\" is not a recognized time unit")]
    UnknownTimeUnit(String),

    /// A recency filter was given an amount without a unit or a unit without
    /// an amount. The two arguments must be provided together or not at all.
    #[error("a recency filter needs both an amount and a unit, or neither")]
    UnpairedRecencyArguments,

    /// A relative date range could not be computed, either because the
    /// amount was negative or the result fell outside the representable
    /// date range.
    #[error("could not compute a valid date range")]
    InvalidDateRange,

    /// The bulk update form data did not contain the key "updates".
    #[error("the form data did not contain the key \"updates\"")]
    MissingUpdates,

    /// The bulk update form data contained more than one value for the key
    /// "updates".
    #[error("the form data contained more than one value for the key \"updates\"")]
    TooManyUpdates,

    /// The bulk update payload could not be parsed as JSON of the expected
    /// shape.
    #[error("could not parse updates: {0}")]
    UnparseableUpdates(String),

    /// A required field was missing, null, or empty in an edit record.
    #[error("the required field \"{0}\" is missing or empty")]
    MissingField(&'static str),

    /// An amount could not be parsed as a number, or was negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A date string did not match any of the accepted formats.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// The tags field was not a flat sequence of names.
    #[error("invalid tags: {0}")]
    InvalidTags(String),

    /// The id of an edit record did not resolve to an existing entry.
    #[error("\"{0}\" does not refer to an entry in the database")]
    UnknownEditId(String),

    /// A deletion id could not be converted to an integer.
    #[error("\"{0}\" is not a valid entry id")]
    InvalidDeletionId(String),

    /// A deletion id referred to an entry that does not exist.
    #[error("there is no entry with the id {0}")]
    MissingEntry(EntryId),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update an entry that does not exist
    #[error("tried to update an entry that is not in the database")]
    UpdateMissingEntry,

    /// Tried to delete an entry that does not exist
    #[error("tried to delete an entry that is not in the database")]
    DeleteMissingEntry,

    /// Tried to delete a tag that does not exist
    #[error("tried to delete a tag that is not in the database")]
    DeleteMissingTag,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// Whether the error describes bad client input rather than a fault in
    /// the application.
    fn is_client_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyTagName
                | Error::NegativeTimeDelta(_)
                | Error::UnknownTimeUnit(_)
                | Error::UnpairedRecencyArguments
                | Error::MissingUpdates
                | Error::TooManyUpdates
                | Error::UnparseableUpdates(_)
                | Error::MissingField(_)
                | Error::InvalidAmount(_)
                | Error::InvalidDate(_)
                | Error::InvalidTags(_)
                | Error::UnknownEditId(_)
                | Error::InvalidDeletionId(_)
                | Error::MissingEntry(_)
        )
    }

    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::EmptyTagName => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid tag name".to_owned(),
                    details: "Tag names must contain at least one non-whitespace character."
                        .to_owned(),
                },
            ),
            Error::InvalidAmount(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details,
                },
            ),
            Error::InvalidDate(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date".to_owned(),
                    details,
                },
            ),
            Error::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Missing field".to_owned(),
                    details: format!("The field \"{field}\" is required and must not be empty."),
                },
            ),
            Error::UpdateMissingEntry => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update entry".to_owned(),
                    details: "The entry could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingEntry => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete entry".to_owned(),
                    details: "The entry could not be found. \
                    Try refreshing the page to see if the entry has already been deleted."
                        .to_owned(),
                },
            ),
            Error::DeleteMissingTag => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete tag".to_owned(),
                    details: "The tag could not be found. \
                    Try refreshing the page to see if the tag has already been deleted."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::InvalidDateRange => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            error if error.is_client_input() => {
                (StatusCode::BAD_REQUEST, error.to_string()).into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
