//! Defines the route handler for the page showing a single entry.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_DELETE_STYLE, FORM_LABEL_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TAG_BADGE_STYLE,
        base, format_currency,
    },
    navigation::NavBar,
    timezone::get_local_offset,
};

use super::{Entry, EntryId, get_entry};

/// The state needed to show a single entry.
#[derive(Debug, Clone)]
pub struct EntryDetailState {
    /// The database connection for reading entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EntryDetailState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the page showing one entry's fields with edit and delete controls.
///
/// Shows the not found page when `entry_id` does not refer to an entry.
pub async fn get_entry_detail_page(
    State(state): State<EntryDetailState>,
    Path(entry_id): Path<EntryId>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let entry = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_entry(entry_id, &connection)
            .inspect_err(|error| tracing::debug!("could not get entry {entry_id}: {error}"))?
    };

    Ok(entry_detail_view(&entry, local_offset).into_response())
}

fn entry_detail_view(entry: &Entry, local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::ENTRIES_VIEW).into_html();

    let field = |label: &str, name: &str, value: Markup| {
        html!(
            div class="py-3 flex justify-between gap-4"
            {
                dt class=(FORM_LABEL_STYLE) { (label) }
                dd data-field=(name) class="text-sm text-right" { (value) }
            }
        )
    };

    let category_href = format!("{}/{}", endpoints::ENTRIES_VIEW, entry.category);
    let delete_route = format!(
        "{}?redirect_url={}",
        endpoints::format_endpoint(endpoints::DELETE_ENTRY, entry.id),
        endpoints::ENTRIES_VIEW
    );

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md"
            {
                h1 class="text-xl font-bold" { "Entry " (entry.id) }

                dl class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    (field("Date", "date", html!(
                        (entry.date.to_offset(local_offset).date())
                    )))

                    (field("Amount", "amount", html!(
                        (format_currency(entry.amount))
                    )))

                    (field("Category", "category", html!(
                        a href=(category_href) class=(LINK_STYLE) { (entry.category) }
                    )))

                    (field("Tags", "tags", html!(
                        @if entry.tags.is_empty() {
                            span class="text-gray-400" { "No tags" }
                        } @else {
                            div class="flex flex-wrap gap-1 justify-end"
                            {
                                @for tag in &entry.tags {
                                    span class=(TAG_BADGE_STYLE) { (tag) }
                                }
                            }
                        }
                    )))

                    (field("Comment", "comment", html!(
                        @if entry.comment.is_empty() {
                            span class="text-gray-400" { "No comment" }
                        } @else {
                            (entry.comment)
                        }
                    )))
                }

                div class="flex items-center gap-4 mt-4"
                {
                    a
                        href=(endpoints::format_endpoint(endpoints::EDIT_ENTRY_VIEW, entry.id))
                        class=(LINK_STYLE)
                    {
                        "Edit"
                    }

                    button
                        hx-delete=(delete_route)
                        hx-confirm="Are you sure you want to delete this entry?"
                        hx-swap="none"
                        hx-target-error="#alert-container"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }

                    a href=(endpoints::ENTRIES_VIEW) class=(LINK_STYLE) { "Back to entries" }
                }
            }
        }
    );

    base("Entry", &[], &content)
}
