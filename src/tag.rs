//! This file defines the tag type used to categorise and label entries, the
//! queries on the tag table, the tags listing page and the API route for
//! deleting a tag.
//!
//! Tags are identified by their name alone and come into existence on demand
//! when entries are submitted. The empty name is reserved for the fallback
//! tag that entries are recategorised to when their category is deleted;
//! pages render it as `<unset>`.

use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TAG_BADGE_STYLE, base,
    },
    navigation::NavBar,
};

/// The name of a tag.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct TagName(String);

impl TagName {
    /// Create a tag name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyTagName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyTagName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a tag name without validation.
    ///
    /// The caller should ensure the string is non-empty unless it refers to
    /// the fallback tag. Violating that gives wrong page output, not memory
    /// unsafety, which is why this is a plain function rather than `unsafe`.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The name of the fallback tag that entries are recategorised to when their category is deleted.
    pub fn unset() -> Self {
        Self(String::new())
    }

    /// Whether this is the fallback tag.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as shown in pages, with the fallback tag rendered as `<unset>`.
    pub fn display_label(&self) -> &str {
        if self.0.is_empty() { "<unset>" } else { &self.0 }
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outcome of checking a tag name against the tag table.
///
/// Tag names on submitted entries are never rejected for being unknown.
/// Validation only records whether each name exists so that creation can
/// happen when the submission is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagResolution {
    /// The tag is already in the database.
    Existing(TagName),
    /// The tag will be created when the submission is applied.
    New(TagName),
}

impl TagResolution {
    /// The tag name, regardless of whether the tag exists yet.
    pub fn name(&self) -> &TagName {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }

    /// Consume the resolution, returning the tag name.
    pub fn into_name(self) -> TagName {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }
}

/// A tag and how many entries reference it, for the tags listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUsage {
    /// The name of the tag.
    pub name: TagName,

    /// How many entries have the tag as their category.
    pub category_count: u64,

    /// How many entries carry the tag as a secondary tag.
    pub tag_count: u64,
}

/// The state needed for the tags listing page.
#[derive(Debug, Clone)]
pub struct TagsPageState {
    /// The app's database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TagsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for deleting a tag.
#[derive(Debug, Clone)]
pub struct DeleteTagEndpointState {
    /// The app's database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTagEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn tags_view(tags: &[TagUsage]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TAGS_VIEW).into_html();

    let table_row = |usage: &TagUsage| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(TAG_BADGE_STYLE)
                    {
                        (usage.name.display_label())
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (usage.category_count)
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (usage.tag_count)
                }

                td class=(TABLE_CELL_STYLE)
                {
                    @if !usage.name.is_unset() {
                        button
                            hx-delete={"/api/tags/" (usage.name)}
                            hx-confirm={
                                "Are you sure you want to delete '"
                                (usage.name) "'? This will reset the category on "
                                (usage.category_count) " entry(s) and untag "
                                (usage.tag_count) " entry(s)."
                            }
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
            div class="relative"
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Tags" }
                }

                div class="dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE)
                                {
                                    "Name"
                                }
                                th scope="col" class=(TABLE_CELL_STYLE)
                                {
                                    "As Category"
                                }
                                th scope="col" class=(TABLE_CELL_STYLE)
                                {
                                    "As Tag"
                                }
                                th scope="col" class=(TABLE_CELL_STYLE)
                                {
                                    "Actions"
                                }
                            }
                        }

                        tbody
                        {
                            @for usage in tags {
                                (table_row(usage))
                            }

                            @if tags.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No tags yet. Tags are created when you "
                                        a href=(endpoints::ENTRIES_VIEW) class=(LINK_STYLE)
                                        {
                                            "record an entry"
                                        }
                                        "."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Tags", &[], &content)
}

/// Route handler for the tags listing page.
pub async fn get_tags_page(State(state): State<TagsPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let usage = get_tag_usage(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve tag usage: {error}"))?;

    Ok(tags_view(&usage).into_response())
}

/// A route handler for deleting a tag.
///
/// Entries categorised with the tag are moved to the fallback tag, and the
/// tag is removed from any entries carrying it as a secondary tag.
pub async fn delete_tag_endpoint(
    Path(tag_name): Path<String>,
    State(state): State<DeleteTagEndpointState>,
) -> Response {
    let name = match TagName::new(&tag_name) {
        Ok(name) => name,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_tag(&name, &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: format!("Deleted tag '{name}'."),
        }
        .into_response(),
        Err(Error::DeleteMissingTag) => Error::DeleteMissingTag.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting tag {name}: {error}");
            error.into_alert_response()
        }
    }
}

/// Create a tag in the database.
///
/// Creating a tag that already exists is a no-op, so tags can be created on
/// demand when entries are submitted.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn create_tag(name: &TagName, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT OR IGNORE INTO tag (name) VALUES (?1);",
        (name.as_ref(),),
    )?;

    Ok(())
}

/// Whether `name` is already in the tag table.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn tag_exists(name: &TagName, connection: &Connection) -> Result<bool, Error> {
    connection
        .prepare("SELECT EXISTS (SELECT 1 FROM tag WHERE name = ?1);")?
        .query_row((name.as_ref(),), |row| row.get(0))
        .map_err(|error| error.into())
}

/// Check `name` against the tag table, recording whether the tag already
/// exists or would be created on apply.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn resolve_tag(name: TagName, connection: &Connection) -> Result<TagResolution, Error> {
    if tag_exists(&name, connection)? {
        Ok(TagResolution::Existing(name))
    } else {
        Ok(TagResolution::New(name))
    }
}

/// Retrieve every tag name, sorted alphabetically.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_tags(connection: &Connection) -> Result<Vec<TagName>, Error> {
    connection
        .prepare("SELECT name FROM tag ORDER BY name ASC;")?
        .query_map([], |row| {
            let raw_name: String = row.get(0)?;

            Ok(TagName::new_unchecked(&raw_name))
        })?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every tag with its usage counts, sorted by name.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_tag_usage(connection: &Connection) -> Result<Vec<TagUsage>, Error> {
    connection
        .prepare(
            "SELECT t.name,
                (SELECT COUNT(1) FROM entry e WHERE e.category = t.name),
                (SELECT COUNT(1) FROM entry_tag et WHERE et.tag_name = t.name)
            FROM tag t
            ORDER BY t.name ASC;",
        )?
        .query_map([], |row| {
            let raw_name: String = row.get(0)?;

            Ok(TagUsage {
                name: TagName::new_unchecked(&raw_name),
                category_count: row.get(1)?,
                tag_count: row.get(2)?,
            })
        })?
        .map(|maybe_usage| maybe_usage.map_err(|error| error.into()))
        .collect()
}

/// Delete a tag from the database.
///
/// Runs in a single transaction: the fallback tag is created if it is
/// missing, entries categorised with the deleted tag are reassigned to it,
/// junction rows are removed by the cascade on the tag table, and finally
/// the tag row itself is deleted.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTag] if the tag doesn't exist (no changes are kept),
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_tag(name: &TagName, connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    transaction.execute("INSERT OR IGNORE INTO tag (name) VALUES ('');", ())?;
    transaction.execute(
        "UPDATE entry SET category = '' WHERE category = ?1;",
        (name.as_ref(),),
    )?;
    transaction.execute(
        "DELETE FROM entry_tag WHERE tag_name = ?1;",
        (name.as_ref(),),
    )?;

    let rows_affected =
        transaction.execute("DELETE FROM tag WHERE name = ?1;", (name.as_ref(),))?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTag);
    }

    transaction.commit()?;

    Ok(())
}

pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS tag (name TEXT PRIMARY KEY NOT NULL);",
        (),
    )?;

    Ok(())
}

#[cfg(test)]
mod tag_name_tests {
    use crate::{Error, tag::TagName};

    #[test]
    fn empty_name_is_rejected() {
        let tag_name = TagName::new("");

        assert_eq!(tag_name, Err(Error::EmptyTagName));
    }

    #[test]
    fn whitespace_only_name_is_rejected() {
        let tag_name = TagName::new("\n\t \r");

        assert_eq!(tag_name, Err(Error::EmptyTagName));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let tag_name = TagName::new("  groceries \n");

        assert_eq!(tag_name, Ok(TagName::new_unchecked("groceries")));
    }

    #[test]
    fn non_empty_name_is_accepted() {
        let tag_name = TagName::new("🔥");

        assert!(tag_name.is_ok())
    }

    #[test]
    fn unset_tag_renders_as_placeholder() {
        assert!(TagName::unset().is_unset());
        assert_eq!(TagName::unset().display_label(), "<unset>");
    }

    #[test]
    fn named_tag_renders_as_its_name() {
        let tag_name = TagName::new_unchecked("groceries");

        assert!(!tag_name.is_unset());
        assert_eq!(tag_name.display_label(), "groceries");
    }
}

#[cfg(test)]
mod tag_query_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        db::initialize,
        entry::{EntryBuilder, create_entry},
        tag::{
            TagName, TagResolution, TagUsage, create_tag, delete_tag, get_all_tags, get_tag_usage,
            resolve_tag, tag_exists,
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not create tables");
        connection
    }

    fn create_test_entry(category: &str, tags: &[&str], connection: &Connection) {
        create_entry(
            EntryBuilder {
                amount: 1.0,
                date: datetime!(2000-01-23 12:00:00 UTC),
                category: TagName::new_unchecked(category),
                tags: tags.iter().map(|tag| TagName::new_unchecked(tag)).collect(),
                comment: String::new(),
            },
            connection,
        )
        .expect("Could not create test entry");
    }

    #[test]
    fn create_tag_succeeds() {
        let connection = get_test_connection();
        let name = TagName::new("coffee").unwrap();

        create_tag(&name, &connection).expect("Could not create tag");

        assert_eq!(tag_exists(&name, &connection), Ok(true));
    }

    #[test]
    fn create_tag_twice_is_a_noop() {
        let connection = get_test_connection();
        let name = TagName::new_unchecked("groceries");

        create_tag(&name, &connection).expect("Could not create tag");
        create_tag(&name, &connection).expect("Creating an existing tag should not fail");

        assert_eq!(get_all_tags(&connection), Ok(vec![name]));
    }

    #[test]
    fn resolve_tag_distinguishes_existing_and_new() {
        let connection = get_test_connection();
        let existing = TagName::new_unchecked("groceries");
        create_tag(&existing, &connection).expect("Could not create tag");
        let new = TagName::new_unchecked("rent");

        assert_eq!(
            resolve_tag(existing.clone(), &connection),
            Ok(TagResolution::Existing(existing))
        );
        assert_eq!(
            resolve_tag(new.clone(), &connection),
            Ok(TagResolution::New(new))
        );
    }

    #[test]
    fn get_all_tags_sorts_by_name() {
        let connection = get_test_connection();
        for name in ["rent", "coffee", "groceries"] {
            create_tag(&TagName::new_unchecked(name), &connection).expect("Could not create tag");
        }

        let tags = get_all_tags(&connection);

        assert_eq!(
            tags,
            Ok(vec![
                TagName::new_unchecked("coffee"),
                TagName::new_unchecked("groceries"),
                TagName::new_unchecked("rent"),
            ])
        );
    }

    #[test]
    fn get_tag_usage_counts_categories_and_tags() {
        let connection = get_test_connection();
        create_test_entry("groceries", &["food"], &connection);
        create_test_entry("groceries", &[], &connection);
        create_test_entry("rent", &["food", "home"], &connection);

        let usage = get_tag_usage(&connection);

        assert_eq!(
            usage,
            Ok(vec![
                TagUsage {
                    name: TagName::new_unchecked("food"),
                    category_count: 0,
                    tag_count: 2
                },
                TagUsage {
                    name: TagName::new_unchecked("groceries"),
                    category_count: 2,
                    tag_count: 0
                },
                TagUsage {
                    name: TagName::new_unchecked("home"),
                    category_count: 0,
                    tag_count: 1
                },
                TagUsage {
                    name: TagName::new_unchecked("rent"),
                    category_count: 1,
                    tag_count: 0
                },
            ])
        );
    }

    #[test]
    fn delete_tag_reassigns_entries_to_the_unset_tag() {
        let connection = get_test_connection();
        create_test_entry("groceries", &["food"], &connection);
        create_test_entry("groceries", &[], &connection);

        delete_tag(&TagName::new_unchecked("groceries"), &connection)
            .expect("Could not delete tag");

        let category: String = connection
            .query_row("SELECT category FROM entry WHERE id = 1;", [], |row| {
                row.get(0)
            })
            .expect("Could not query entry");
        assert_eq!(category, "");
        assert!(
            get_all_tags(&connection)
                .expect("Could not get tags")
                .contains(&TagName::unset())
        );
    }

    #[test]
    fn delete_tag_removes_junction_rows() {
        let connection = get_test_connection();
        create_test_entry("groceries", &["food", "home"], &connection);

        delete_tag(&TagName::new_unchecked("food"), &connection).expect("Could not delete tag");

        let junction_count: i64 = connection
            .query_row("SELECT COUNT(1) FROM entry_tag;", [], |row| row.get(0))
            .expect("Could not count junction rows");
        assert_eq!(junction_count, 1);
    }

    #[test]
    fn delete_missing_tag_returns_error_and_keeps_the_database_unchanged() {
        let connection = get_test_connection();
        create_test_entry("groceries", &[], &connection);

        let result = delete_tag(&TagName::new_unchecked("rent"), &connection);

        assert_eq!(result, Err(Error::DeleteMissingTag));
        // The fallback tag insert must be rolled back along with everything else.
        assert_eq!(
            get_all_tags(&connection),
            Ok(vec![TagName::new_unchecked("groceries")])
        );
    }
}

#[cfg(test)]
mod tags_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::Response};
    use rusqlite::Connection;
    use scraper::Html;
    use time::macros::datetime;

    use crate::{
        db::initialize,
        entry::{EntryBuilder, create_entry},
        tag::{TagName, TagsPageState, get_tags_page},
    };

    fn get_tags_page_state() -> TagsPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not create tables");

        TagsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn render_page_lists_tags_with_delete_buttons() {
        let state = get_tags_page_state();
        create_entry(
            EntryBuilder {
                amount: 1.0,
                date: datetime!(2000-01-23 12:00:00 UTC),
                category: TagName::new_unchecked("groceries"),
                tags: vec![TagName::new_unchecked("food")],
                comment: String::new(),
            },
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test entry");

        let response = get_tags_page(State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .expect("content-type header missing"),
            "text/html; charset=utf-8"
        );

        let html = parse_html(response).await;
        assert_valid_html(&html);

        let buttons: Vec<_> = html
            .select(&scraper::Selector::parse("button[hx-delete]").unwrap())
            .collect();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].value().attr("hx-delete"), Some("/api/tags/food"));
    }

    #[tokio::test]
    async fn render_empty_page_shows_placeholder_row() {
        let state = get_tags_page_state();

        let response = get_tags_page(State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<Vec<_>>().join("");
        assert!(
            text.contains("No tags yet"),
            "want placeholder row, got {text}"
        );
    }

    async fn parse_html(response: Response) -> Html {
        let body = response.into_body();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body).to_string();

        Html::parse_document(&text)
    }

    #[track_caller]
    fn assert_valid_html(html: &Html) {
        assert!(
            html.errors.is_empty(),
            "Got HTML parsing errors: {:?}",
            html.errors
        );
    }
}
