//! Defines the route handlers for the pages that list entries as a table,
//! narrowed by an optional category and recency window, with an inline
//! creation form.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TAG_BADGE_STYLE, base, dollar_input_styles,
        format_currency, loading_spinner,
    },
    navigation::NavBar,
    pagination::{PaginationConfig, PaginationIndicator, create_pagination_indicators},
    recency::{RecencyWindow, get_recent_entries},
    tag::{TagName, TagUsage, get_tag_usage},
    timezone::get_local_offset,
};

use super::{Entry, EntryOrder, get_entries};

/// The state needed for the entries listing pages.
#[derive(Debug, Clone)]
pub struct EntriesPageState {
    /// The database connection for reading entries and tags.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// Configuration for the pagination controls.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for EntriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Controls paging of the entries table.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    /// The page number to display. Starts from 1.
    pub page: Option<u64>,
    /// The maximum number of entries to display per page.
    pub page_size: Option<u64>,
}

/// The listing filters selected by the request path.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EntryFilters {
    /// Show only entries categorised with this tag.
    pub(crate) category: Option<TagName>,
    /// Show only entries within this recency window.
    pub(crate) window: Option<RecencyWindow>,
}

impl EntryFilters {
    /// The canonical listing path for these filters, without page parameters.
    pub(crate) fn base_path(&self) -> String {
        match (&self.category, self.window) {
            (None, None) => endpoints::ENTRIES_VIEW.to_owned(),
            (None, Some(window)) => {
                format!("{}/{}", endpoints::ENTRIES_VIEW, window.as_path_value())
            }
            (Some(category), None) => format!("{}/{category}", endpoints::ENTRIES_VIEW),
            (Some(category), Some(window)) => format!(
                "{}/{category}/{}",
                endpoints::ENTRIES_VIEW,
                window.as_path_value()
            ),
        }
    }

    fn page_url(&self, page: u64, page_size: u64) -> String {
        format!("{}?page={page}&page_size={page_size}", self.base_path())
    }

    fn heading(&self) -> String {
        match (&self.category, self.window) {
            (None, None) => "All entries".to_owned(),
            (Some(category), None) => format!("Entries in {category}"),
            (None, Some(window)) => format!(
                "Entries from the last {} {}",
                window.amount,
                window.unit.as_path_value()
            ),
            (Some(category), Some(window)) => format!(
                "Entries in {category} from the last {} {}",
                window.amount,
                window.unit.as_path_value()
            ),
        }
    }
}

enum QueryDecision {
    Redirect(String),
    Normalized { page: u64, page_size: u64 },
}

/// Render the newest entries as a paged table with a creation form.
pub async fn get_entries_page(
    State(state): State<EntriesPageState>,
    Query(pagination): Query<Pagination>,
) -> Result<Response, Error> {
    render_entries_page(state, EntryFilters::default(), pagination).await
}

/// Render the entries page narrowed by a path selector.
///
/// The selector is tried as a recency window first and otherwise treated as
/// a category name. A segment that is neither shows the not found page.
pub async fn get_entries_selector_page(
    State(state): State<EntriesPageState>,
    Path(selector): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Response, Error> {
    let filters = match RecencyWindow::parse(&selector) {
        Some(window) => EntryFilters {
            category: None,
            window: Some(window),
        },
        None => EntryFilters {
            category: Some(TagName::new(&selector).map_err(|_| Error::NotFound)?),
            window: None,
        },
    };

    render_entries_page(state, filters, pagination).await
}

/// Render the entries page narrowed to one category and a recency window.
pub async fn get_entries_category_window_page(
    State(state): State<EntriesPageState>,
    Path((category, window)): Path<(String, String)>,
    Query(pagination): Query<Pagination>,
) -> Result<Response, Error> {
    let filters = EntryFilters {
        category: Some(TagName::new(&category).map_err(|_| Error::NotFound)?),
        window: Some(RecencyWindow::parse(&window).ok_or(Error::NotFound)?),
    };

    render_entries_page(state, filters, pagination).await
}

async fn render_entries_page(
    state: EntriesPageState,
    filters: EntryFilters,
    pagination: Pagination,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (entries, tag_usage) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let entries = get_entries(
            filters.category.as_ref(),
            EntryOrder::DateDescending,
            &connection,
        )
        .inspect_err(|error| tracing::error!("could not get entries: {error}"))?;
        let tag_usage = get_tag_usage(&connection)
            .inspect_err(|error| tracing::error!("could not get tag usage: {error}"))?;

        (entries, tag_usage)
    };

    let entries = get_recent_entries(
        entries,
        filters.window.map(|window| window.amount),
        filters.window.map(|window| window.unit),
        None,
    )?;

    let (page, page_size) = match normalize_pagination(
        pagination,
        entries.len(),
        &state.pagination_config,
        &filters,
    ) {
        QueryDecision::Normalized { page, page_size } => (page, page_size),
        QueryDecision::Redirect(canonical_url) => {
            return Ok(Redirect::to(&canonical_url).into_response());
        }
    };

    let page_count = (entries.len() as u64).div_ceil(page_size).max(1);
    let start = ((page - 1) * page_size) as usize;
    let end = (start + page_size as usize).min(entries.len());
    let page_entries = &entries[start..end];

    let indicators =
        create_pagination_indicators(page, page_count, state.pagination_config.max_pages);

    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();
    let categories = tags_by_usage(&tag_usage, |usage| usage.category_count);
    let secondary_tags = tags_by_usage(&tag_usage, |usage| usage.tag_count);
    let redirect_url = filters.base_path();
    let form = entry_form(&EntryFormContext {
        today,
        categories: &categories,
        tags: &secondary_tags,
        selected_category: filters.category.as_ref(),
        redirect_url: &redirect_url,
        error_message: None,
    });

    Ok(
        entries_view(
            &filters,
            page_entries,
            &indicators,
            page_size,
            form,
            local_offset,
        )
        .into_response(),
    )
}

/// Clamp the requested page parameters to the listing, redirecting to the
/// canonical URL when an explicit value is out of range.
fn normalize_pagination(
    requested: Pagination,
    entry_count: usize,
    config: &PaginationConfig,
    filters: &EntryFilters,
) -> QueryDecision {
    let page_size = match requested.page_size {
        Some(0) | None => config.default_page_size,
        Some(page_size) => page_size,
    };
    let page_count = (entry_count as u64).div_ceil(page_size).max(1);
    let page = requested
        .page
        .unwrap_or(config.default_page)
        .clamp(1, page_count);

    let out_of_range = requested
        .page
        .is_some_and(|requested_page| requested_page != page)
        || requested
            .page_size
            .is_some_and(|requested_size| requested_size != page_size);

    if out_of_range {
        QueryDecision::Redirect(filters.page_url(page, page_size))
    } else {
        QueryDecision::Normalized { page, page_size }
    }
}

/// Tag names ordered by a usage count, most used first, skipping the unset
/// fallback tag. Ties keep the alphabetical order of [get_tag_usage].
pub(crate) fn tags_by_usage(
    tag_usage: &[TagUsage],
    count: impl Fn(&TagUsage) -> u64,
) -> Vec<TagName> {
    let mut usage: Vec<&TagUsage> = tag_usage
        .iter()
        .filter(|usage| !usage.name.is_unset())
        .collect();
    usage.sort_by_key(|usage| std::cmp::Reverse(count(usage)));

    usage.into_iter().map(|usage| usage.name.clone()).collect()
}

/// What the entry creation form needs to render.
pub(crate) struct EntryFormContext<'a> {
    /// The date to prefill the date input with.
    pub(crate) today: Date,
    /// Category options, most used first.
    pub(crate) categories: &'a [TagName],
    /// Secondary tag options, most used first.
    pub(crate) tags: &'a [TagName],
    /// The category to preselect, when the listing is filtered by one.
    pub(crate) selected_category: Option<&'a TagName>,
    /// Where the create endpoint should redirect to on success.
    pub(crate) redirect_url: &'a str,
    /// A validation failure to show inline, when re-rendering the form.
    pub(crate) error_message: Option<&'a str>,
}

/// Renders the entry creation form.
///
/// The create endpoint re-renders this with an error message when
/// validation fails, swapping the form element in place. The form is
/// rendered without its container so the swap does not nest a new one.
pub(crate) fn entry_form(context: &EntryFormContext) -> Markup {
    let post_entry_route = match build_redirect_param(context.redirect_url) {
        Some(param) => format!("{}?{param}", endpoints::POST_ENTRY),
        None => endpoints::POST_ENTRY.to_owned(),
    };

    html! {
        form
            id="entry-form"
            hx-post=(post_entry_route)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            h2 class="text-xl font-bold" { "New Entry" }

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
                        placeholder="0.00"
                        required
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
                    value=(context.today)
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
                            selected[Some(category) == context.selected_category]
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
                            option value=(tag) { (tag) }
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
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if let Some(message) = context.error_message {
                p class="text-sm text-red-700 dark:text-red-300" role="alert"
                {
                    (message)
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span
                    id="indicator"
                    class="inline htmx-indicator"
                {
                    (loading_spinner())
                }
                " Create Entry"
            }
        }
    }
}

fn build_redirect_param(redirect_url: &str) -> Option<String> {
    serde_urlencoded::to_string([("redirect_url", &redirect_url)])
        .inspect_err(|error| {
            tracing::error!(
                "Could not set redirect URL {redirect_url} due to encoding error: {error}"
            );
        })
        .ok()
}

fn entries_view(
    filters: &EntryFilters,
    entries: &[Entry],
    indicators: &[PaginationIndicator],
    page_size: u64,
    form: Markup,
    local_offset: UtcOffset,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ENTRIES_VIEW).into_html();

    let table_row = |entry: &Entry| {
        let category_href = EntryFilters {
            category: Some(entry.category.clone()),
            window: None,
        }
        .base_path();

        html!(
            tr class=(TABLE_ROW_STYLE) data-entry-row="true"
            {
                td class=(TABLE_CELL_STYLE)
                {
                    (entry.date.to_offset(local_offset).date())
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_currency(entry.amount))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    a href=(category_href) class=(LINK_STYLE) { (entry.category) }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    @if entry.tags.is_empty() {
                        span class="text-gray-400" { "No tags" }
                    } @else {
                        div class="flex flex-wrap gap-1"
                        {
                            @for tag in &entry.tags {
                                span class=(TAG_BADGE_STYLE) { (tag) }
                            }
                        }
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (entry.comment)
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex items-center gap-3"
                    {
                        a
                            href=(endpoints::format_endpoint(endpoints::ENTRY_DETAIL_VIEW, entry.id))
                            class=(LINK_STYLE)
                        {
                            "Details"
                        }

                        a
                            href=(endpoints::format_endpoint(endpoints::EDIT_ENTRY_VIEW, entry.id))
                            class=(LINK_STYLE)
                        {
                            "Edit"
                        }

                        button
                            hx-delete=(endpoints::format_endpoint(endpoints::DELETE_ENTRY, entry.id))
                            hx-confirm="Are you sure you want to delete this entry?"
                            hx-target="closest tr"
                            hx-target-error="#alert-container"
                            hx-swap="delete"
                            class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete"
                        }
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold" { (filters.heading()) }

            div class=(FORM_CONTAINER_STYLE)
            {
                (form)
            }

            div class="relative overflow-x-auto dark:bg-gray-800 mt-4"
            {
                table class="w-full text-sm text-left rtl:text-right
                    text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Tags" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Comment" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @if entries.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td
                                    colspan="6"
                                    data-empty-state="true"
                                    class="px-6 py-8 text-center"
                                {
                                    "No entries to show"
                                }
                            }
                        }

                        @for entry in entries {
                            (table_row(entry))
                        }
                    }
                }
            }

            @if indicators.len() > 1 {
                (pagination_nav(indicators, filters, page_size))
            }
        }
    );

    base("Entries", &[dollar_input_styles()], &content)
}

fn pagination_nav(
    indicators: &[PaginationIndicator],
    filters: &EntryFilters,
    page_size: u64,
) -> Markup {
    html! {
        nav aria-label="Entries pages" class="flex justify-center mt-4"
        {
            ul class="inline-flex items-center gap-2 text-sm"
            {
                @for indicator in indicators {
                    li
                    {
                        @match indicator {
                            PaginationIndicator::BackButton(page) => {
                                a href=(filters.page_url(*page, page_size)) class=(LINK_STYLE)
                                {
                                    "Previous"
                                }
                            }
                            PaginationIndicator::Page(page) => {
                                a href=(filters.page_url(*page, page_size)) class=(LINK_STYLE)
                                {
                                    (page)
                                }
                            }
                            PaginationIndicator::CurrPage(page) => {
                                span aria-current="page" class="font-bold px-1"
                                {
                                    (page)
                                }
                            }
                            PaginationIndicator::Ellipsis => {
                                span class="px-1 text-gray-500" { "..." }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a href=(filters.page_url(*page, page_size)) class=(LINK_STYLE)
                                {
                                    "Next"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
