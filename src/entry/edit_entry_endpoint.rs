//! Defines the endpoint for saving changes to an existing entry.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    tag::get_tag_usage,
    timezone::get_local_offset,
};

use super::{
    Entry, EntryId,
    core::update_entry,
    create_entry_endpoint::{EntryForm, parse_entry_form},
    edit_page::{EditEntryFormContext, edit_entry_form},
    entries_page::tags_by_usage,
    get_entry,
};

/// The state needed to edit an entry.
#[derive(Debug, Clone)]
pub struct EditEntryState {
    /// The database connection for managing entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditEntryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for replacing an entry's fields and tag set.
///
/// Redirects to the entry's detail page on success. Invalid field values
/// re-render the edit form in place with a message.
pub async fn edit_entry_endpoint(
    State(state): State<EditEntryState>,
    Path(entry_id): Path<EntryId>,
    Form(form): Form<EntryForm>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let builder = match parse_entry_form(&form, local_offset) {
        Ok(builder) => builder,
        Err(error) => {
            let entry = match get_entry(entry_id, &connection) {
                Ok(entry) => entry,
                Err(Error::NotFound) => {
                    return Error::UpdateMissingEntry.into_alert_response();
                }
                Err(error) => {
                    tracing::error!("could not get entry {entry_id}: {error}");
                    return error.into_alert_response();
                }
            };
            let tag_usage = match get_tag_usage(&connection) {
                Ok(tag_usage) => tag_usage,
                Err(error) => {
                    tracing::error!("could not get tag usage: {error}");
                    return error.into_alert_response();
                }
            };

            let categories = tags_by_usage(&tag_usage, |usage| usage.category_count);
            let tags = tags_by_usage(&tag_usage, |usage| usage.tag_count);

            return edit_entry_form(&EditEntryFormContext {
                entry: &entry,
                categories: &categories,
                tags: &tags,
                local_offset,
                error_message: Some(&error.to_string()),
            })
            .into_response();
        }
    };

    let entry = Entry {
        id: entry_id,
        amount: builder.amount,
        date: builder.date,
        category: builder.category,
        tags: builder.tags,
        comment: builder.comment,
    };

    if let Err(error) = update_entry(&entry, &connection) {
        tracing::error!("could not update entry {entry_id}: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::format_endpoint(
            endpoints::ENTRY_DETAIL_VIEW,
            entry_id,
        )),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
