//! Defines the route handler for the page that edits an existing entry.

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
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner,
    },
    navigation::NavBar,
    tag::{TagName, get_tag_usage},
    timezone::get_local_offset,
};

use super::{
    Entry, EntryId,
    entries_page::tags_by_usage,
    get_entry,
};

/// The state needed for the edit entry page.
#[derive(Debug, Clone)]
pub struct EditEntryPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for reading entries and tags.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditEntryPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page for editing an entry, prefilled with its stored values.
///
/// Shows the not found page when `entry_id` does not refer to an entry.
pub async fn get_edit_entry_page(
    State(state): State<EditEntryPageState>,
    Path(entry_id): Path<EntryId>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (entry, tag_usage) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let entry = get_entry(entry_id, &connection)
            .inspect_err(|error| tracing::debug!("could not get entry {entry_id}: {error}"))?;
        let tag_usage = get_tag_usage(&connection)
            .inspect_err(|error| tracing::error!("could not get tag usage: {error}"))?;

        (entry, tag_usage)
    };

    let categories = tags_by_usage(&tag_usage, |usage| usage.category_count);
    let tags = tags_by_usage(&tag_usage, |usage| usage.tag_count);

    let nav_bar = NavBar::new(endpoints::ENTRIES_VIEW).into_html();
    let form = edit_entry_form(&EditEntryFormContext {
        entry: &entry,
        categories: &categories,
        tags: &tags,
        local_offset,
        error_message: None,
    });

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class=(FORM_CONTAINER_STYLE)
            {
                (form)
            }
        }
    );

    Ok(base("Edit Entry", &[dollar_input_styles()], &content).into_response())
}

/// What the edit entry form needs to render.
pub(crate) struct EditEntryFormContext<'a> {
    /// The entry whose stored values prefill the form.
    pub(crate) entry: &'a Entry,
    /// Category options, most used first.
    pub(crate) categories: &'a [TagName],
    /// Secondary tag options, most used first.
    pub(crate) tags: &'a [TagName],
    /// The timezone offset used to display the entry's date.
    pub(crate) local_offset: UtcOffset,
    /// A validation failure to show inline, when re-rendering the form.
    pub(crate) error_message: Option<&'a str>,
}

/// Renders the edit entry form.
///
/// The edit endpoint re-renders this with an error message when validation
/// fails, swapping the form element in place.
pub(crate) fn edit_entry_form(context: &EditEntryFormContext) -> Markup {
    let entry = context.entry;
    let put_entry_route = endpoints::format_endpoint(endpoints::PUT_ENTRY, entry.id);

    html! {
        form
            id="entry-form"
            hx-put=(put_entry_route)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            h2 class="text-xl font-bold" { "Edit Entry" }

            div
            {
                label
                    for="amount"
                    class=(FORM_LABEL_STYLE)
                {
                    "Amount"
                }

                // w-full needed to ensure input takes the full width when prefilled with a value
                div class="input-wrapper w-full"
                {
                    input
                        name="amount"
                        id="amount"
                        type="number"
                        min="0"
                        step="0.01"
                        required
                        value=(entry.amount)
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label
                    for="date"
                    class=(FORM_LABEL_STYLE)
                {
                    "Date"
                }

                input
                    name="date"
                    id="date"
                    type="date"
                    required
                    value=(entry.date.to_offset(context.local_offset).date())
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label
                    for="category"
                    class=(FORM_LABEL_STYLE)
                {
                    "Category"
                }

                select
                    name="category"
                    id="category"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "Select a category" }

                    @for category in context.categories {
                        option
                            value=(category)
                            selected[*category == entry.category]
                        {
                            (category)
                        }
                    }
                }
            }

            @if !context.tags.is_empty() {
                div
                {
                    label
                        for="tags"
                        class=(FORM_LABEL_STYLE)
                    {
                        "Tags"
                    }

                    select
                        name="tags"
                        id="tags"
                        multiple
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for tag in context.tags {
                            option value=(tag) selected[entry.tags.contains(tag)] { (tag) }
                        }
                    }
                }
            }

            div
            {
                label
                    for="comment"
                    class=(FORM_LABEL_STYLE)
                {
                    "Comment"
                }

                input
                    name="comment"
                    id="comment"
                    type="text"
                    placeholder="Comment"
                    value=(entry.comment)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if let Some(message) = context.error_message {
                p class="text-sm text-red-700 dark:text-red-300" role="alert"
                {
                    (message)
                }
            }

            div class="flex items-center gap-4"
            {
                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " Save Entry"
                }

                a
                    href=(endpoints::format_endpoint(endpoints::ENTRY_DETAIL_VIEW, entry.id))
                    class=(LINK_STYLE)
                {
                    "Cancel"
                }
            }
        }
    }
}

#[cfg(test)]
mod edit_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::Response,
    };
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::macros::datetime;

    use crate::{
        Error,
        db::initialize,
        entry::{
            Entry, create_entry,
            edit_page::{EditEntryPageState, get_edit_entry_page},
        },
        tag::TagName,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn get_test_state(conn: Connection) -> EditEntryPageState {
        EditEntryPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn edit_page_prefills_entry_fields() {
        let conn = get_test_connection();
        create_entry(
            Entry::build(
                12.3,
                datetime!(2025-10-05 09:30:00 UTC),
                TagName::new_unchecked("groceries"),
            )
            .tags(vec![TagName::new_unchecked("food")])
            .comment("farmers market"),
            &conn,
        )
        .unwrap();
        create_entry(
            Entry::build(
                1.0,
                datetime!(2025-10-06 09:30:00 UTC),
                TagName::new_unchecked("rent"),
            ),
            &conn,
        )
        .unwrap();

        let response = get_edit_entry_page(State(get_test_state(conn)), Path(1))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html(response).await;

        let form = html
            .select(&Selector::parse("form#entry-form").unwrap())
            .next()
            .expect("No edit form found");
        assert_eq!(form.value().attr("hx-put"), Some("/api/entry/1"));

        assert_eq!(input_value(&html, "amount"), "12.3");
        assert_eq!(input_value(&html, "date"), "2025-10-05");
        assert_eq!(input_value(&html, "comment"), "farmers market");

        let selected_category = html
            .select(&Selector::parse("select[name=category] option[selected]").unwrap())
            .next()
            .expect("No preselected category found");
        assert_eq!(selected_category.value().attr("value"), Some("groceries"));

        let selected_tags: Vec<&str> = html
            .select(&Selector::parse("select[name=tags] option[selected]").unwrap())
            .filter_map(|option| option.value().attr("value"))
            .collect();
        assert_eq!(selected_tags, ["food"]);
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let conn = get_test_connection();

        let result = get_edit_entry_page(State(get_test_state(conn)), Path(999)).await;

        assert_eq!(result.unwrap_err(), Error::NotFound);
    }

    #[track_caller]
    fn input_value(html: &Html, name: &str) -> String {
        let selector = format!("input[name='{name}']");
        html.select(&Selector::parse(&selector).unwrap())
            .next()
            .unwrap_or_else(|| panic!("No input {name} found"))
            .value()
            .attr("value")
            .unwrap_or_default()
            .to_owned()
    }

    async fn parse_html(response: Response) -> Html {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not get response body");
        let text = String::from_utf8_lossy(&body).to_string();

        Html::parse_document(&text)
    }
}
