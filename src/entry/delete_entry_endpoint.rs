//! Defines the endpoint for deleting an entry.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, alert::Alert, html::format_currency, timezone::get_local_offset,
};

use super::{EntryId, core::delete_entry, get_entry};

/// The state needed to delete an entry.
#[derive(Debug, Clone)]
pub struct DeleteEntryState {
    /// The database connection for managing entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DeleteEntryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    redirect_url: Option<String>,
}

/// A route handler for deleting an entry.
///
/// Responds with a success alert so the table row swap can remove the row, or
/// redirects to `redirect_url` when the caller is leaving the deleted entry's
/// page.
pub async fn delete_entry_endpoint(
    State(state): State<DeleteEntryState>,
    Path(entry_id): Path<EntryId>,
    Query(query_params): Query<QueryParams>,
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

    let entry = match get_entry(entry_id, &connection) {
        Ok(entry) => entry,
        Err(Error::NotFound) => return Error::DeleteMissingEntry.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get entry {entry_id}: {error}");
            return error.into_alert_response();
        }
    };

    if let Err(error) = delete_entry(entry_id, &connection) {
        tracing::error!("could not delete entry {entry_id}: {error}");

        return error.into_alert_response();
    }

    if let Some(redirect_url) = query_params.redirect_url {
        return (HxRedirect(redirect_url), StatusCode::SEE_OTHER).into_response();
    }

    // The status code has to be 200 OK or htmx will not remove the table row.
    Alert::Success {
        message: "Entry deleted successfully".to_owned(),
        details: format!(
            "Removed {} recorded on {}",
            format_currency(entry.amount),
            entry.date.to_offset(local_offset).date()
        ),
    }
    .into_response()
}
