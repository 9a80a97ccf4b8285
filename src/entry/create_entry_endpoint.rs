//! Defines the endpoint for creating a new entry.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error, endpoints,
    tag::{TagName, get_tag_usage},
    timezone::get_local_offset,
};

use super::{
    EntryBuilder,
    core::{Entry, create_entry},
    entries_page::{EntryFormContext, entry_form, tags_by_usage},
    form::{parse_amount, parse_entry_date},
};

/// The state needed to create an entry.
#[derive(Debug, Clone)]
pub struct CreateEntryState {
    /// The database connection for managing entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateEntryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating an entry.
///
/// Fields arrive as text and are validated here so that a bad value
/// re-renders the form with a message instead of being rejected by the
/// extractor.
#[derive(Debug, Deserialize)]
pub struct EntryForm {
    /// The amount of money spent, in dollars.
    pub amount: String,
    /// When the money was spent.
    pub date: String,
    /// The category the entry belongs to.
    pub category: String,
    /// Extra tags labelling the entry.
    #[serde(default)]
    pub tags: Vec<String>,
    /// A free-form note about the entry.
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    redirect_url: Option<String>,
}

/// A route handler for creating a new entry.
///
/// Redirects to `redirect_url` on success so the listing the form was
/// submitted from keeps its filters. Invalid field values re-render the
/// form in place with a message.
pub async fn create_entry_endpoint(
    State(state): State<CreateEntryState>,
    Query(query_params): Query<QueryParams>,
    Form(form): Form<EntryForm>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let redirect_url = query_params
        .redirect_url
        .unwrap_or(endpoints::ENTRIES_VIEW.to_owned());

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
            let tag_usage = match get_tag_usage(&connection) {
                Ok(tag_usage) => tag_usage,
                Err(error) => {
                    tracing::error!("could not get tag usage: {error}");
                    return error.into_alert_response();
                }
            };

            let categories = tags_by_usage(&tag_usage, |usage| usage.category_count);
            let tags = tags_by_usage(&tag_usage, |usage| usage.tag_count);
            let selected_category = TagName::new(&form.category).ok();

            return entry_form(&EntryFormContext {
                today: OffsetDateTime::now_utc().to_offset(local_offset).date(),
                categories: &categories,
                tags: &tags,
                selected_category: selected_category.as_ref(),
                redirect_url: &redirect_url,
                error_message: Some(&error.to_string()),
            })
            .into_response();
        }
    };

    if let Err(error) = create_entry(builder, &connection) {
        tracing::error!("could not create entry: {error}");

        return error.into_alert_response();
    }

    (HxRedirect(redirect_url), StatusCode::SEE_OTHER).into_response()
}

/// Validate the form fields and assemble the builder for the new entry.
///
/// Shared with the edit endpoint so both paths accept the same values.
pub(super) fn parse_entry_form(
    form: &EntryForm,
    local_offset: UtcOffset,
) -> Result<EntryBuilder, Error> {
    let amount = parse_amount(&form.amount)?;
    let date = parse_entry_date(&form.date)?.assume_offset(local_offset);
    let category = TagName::new(&form.category).map_err(|_| Error::MissingField("category"))?;
    let mut tags = form
        .tags
        .iter()
        .filter(|tag| !tag.trim().is_empty())
        .map(|tag| TagName::new(tag))
        .collect::<Result<Vec<_>, _>>()?;
    tags.sort();
    tags.dedup();

    Ok(Entry::build(amount, date, category)
        .tags(tags)
        .comment(form.comment.trim()))
}
