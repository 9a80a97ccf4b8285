//! Defines the core data model and database queries for entries.

use std::collections::HashMap;

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    tag::{TagName, create_tag},
};

// ============================================================================
// MODELS
// ============================================================================

/// The database ID of an entry.
pub type EntryId = i64;

/// A record of money spent at a point in time.
///
/// To create a new `Entry`, use [Entry::build] and [create_entry].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The ID of the entry.
    pub id: EntryId,
    /// The amount of money spent.
    pub amount: f64,
    /// When the money was spent.
    pub date: OffsetDateTime,
    /// The category the entry belongs to.
    pub category: TagName,
    /// Extra tags labelling the entry, sorted by name.
    pub tags: Vec<TagName>,
    /// A free-form note about the entry.
    pub comment: String,
}

impl Entry {
    /// Create a new entry.
    ///
    /// Shortcut for [EntryBuilder] for discoverability.
    pub fn build(amount: f64, date: OffsetDateTime, category: TagName) -> EntryBuilder {
        EntryBuilder {
            amount,
            date,
            category,
            tags: Vec::new(),
            comment: String::new(),
        }
    }
}

/// A builder for creating [Entry] records.
///
/// Optional fields default to empty. Pass the finished builder to
/// [create_entry] to insert the entry and get the stored record back.
#[derive(Debug, PartialEq, Clone)]
pub struct EntryBuilder {
    /// The amount of money spent.
    ///
    /// Amounts are never negative: an entry records an expense, not a
    /// balance change.
    pub amount: f64,

    /// When the money was spent.
    ///
    /// The date is normalised to UTC before being stored so that the
    /// stored text sorts chronologically.
    pub date: OffsetDateTime,

    /// The category the entry belongs to, e.g. "Groceries", "Transport".
    ///
    /// Created on demand if it is not already in the tag table.
    pub category: TagName,

    /// Extra tags labelling the entry.
    ///
    /// Created on demand if they are not already in the tag table.
    /// Duplicates are dropped.
    pub tags: Vec<TagName>,

    /// A free-form note about the entry.
    pub comment: String,
}

impl EntryBuilder {
    /// Set the tags for the entry.
    pub fn tags(mut self, tags: Vec<TagName>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the comment for the entry.
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_owned();
        self
    }
}

/// The row order for entry listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrder {
    /// Oldest entries first.
    DateAscending,
    /// Newest entries first.
    DateDescending,
}

impl EntryOrder {
    fn as_sql(self) -> &'static str {
        match self {
            Self::DateAscending => "ASC",
            Self::DateDescending => "DESC",
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new entry in the database from a builder.
///
/// The entry's category and tags are created on demand if they are not
/// already in the tag table, all within one transaction.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_entry(builder: EntryBuilder, connection: &Connection) -> Result<Entry, Error> {
    let mut tags = builder.tags;
    tags.sort();
    tags.dedup();

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    create_tag(&builder.category, &transaction)?;
    for tag in &tags {
        create_tag(tag, &transaction)?;
    }

    let mut entry = transaction
        .prepare(
            "INSERT INTO entry (amount, date, category, comment)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, amount, date, category, comment",
        )?
        .query_row(
            (
                builder.amount,
                builder.date.to_offset(UtcOffset::UTC),
                builder.category.as_ref(),
                &builder.comment,
            ),
            map_entry_row,
        )?;

    set_entry_tags(entry.id, &tags, &transaction)?;
    transaction.commit()?;

    entry.tags = tags;

    Ok(entry)
}

/// Retrieve an entry from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid entry,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_entry(id: EntryId, connection: &Connection) -> Result<Entry, Error> {
    let mut entry = connection
        .prepare("SELECT id, amount, date, category, comment FROM entry WHERE id = :id")?
        .query_one(&[(":id", &id)], map_entry_row)?;

    entry.tags = get_entry_tags(id, connection)?;

    Ok(entry)
}

/// Check whether an entry with the given `id` exists in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn entry_exists(id: EntryId, connection: &Connection) -> Result<bool, Error> {
    let exists = connection
        .prepare("SELECT EXISTS (SELECT 1 FROM entry WHERE id = ?1);")?
        .query_one((id,), |row| row.get(0))?;

    Ok(exists)
}

/// Retrieve entries from the database with their tags attached, optionally
/// restricted to one category.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_entries(
    category: Option<&TagName>,
    order: EntryOrder,
    connection: &Connection,
) -> Result<Vec<Entry>, Error> {
    let direction = order.as_sql();
    let filter = match category {
        Some(_) => "WHERE category = ?1",
        None => "",
    };
    let query = format!(
        "SELECT id, amount, date, category, comment FROM entry
        {filter}
        ORDER BY date {direction}, id {direction};"
    );

    let mut statement = connection.prepare(&query)?;
    let rows = match category {
        Some(category) => statement.query_map((category.as_ref(),), map_entry_row)?,
        None => statement.query_map([], map_entry_row)?,
    };
    let mut entries: Vec<Entry> = rows
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect::<Result<_, _>>()?;

    let mut tags_by_entry = get_all_entry_tags(connection)?;
    for entry in &mut entries {
        if let Some(tags) = tags_by_entry.remove(&entry.id) {
            entry.tags = tags;
        }
    }

    Ok(entries)
}

/// Update an entry in the database, replacing all of its fields and its tag
/// set, in its own transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingEntry] if `entry.id` does not refer to an entry in the database,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_entry(entry: &Entry, connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    update_entry_in_transaction(entry, &transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Update an entry as part of `transaction`.
///
/// The entry's category and tags are created on demand. Used by the bulk
/// update pipeline, which applies many changes in one transaction;
/// [update_entry] wraps this for standalone use.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingEntry] if `entry.id` does not refer to an entry in the database,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn update_entry_in_transaction(
    entry: &Entry,
    transaction: &Transaction,
) -> Result<(), Error> {
    create_tag(&entry.category, transaction)?;
    for tag in &entry.tags {
        create_tag(tag, transaction)?;
    }

    let rows_affected = transaction.execute(
        "UPDATE entry SET amount = ?1, date = ?2, category = ?3, comment = ?4 WHERE id = ?5;",
        (
            entry.amount,
            entry.date.to_offset(UtcOffset::UTC),
            entry.category.as_ref(),
            &entry.comment,
            entry.id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingEntry);
    }

    set_entry_tags(entry.id, &entry.tags, transaction)?;

    Ok(())
}

/// Delete an entry and its tag junction rows from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingEntry] if `id` does not refer to an entry in the database,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_entry(id: EntryId, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM entry_tag WHERE entry_id = ?1;", (id,))?;
    let rows_affected = connection.execute("DELETE FROM entry WHERE id = ?1;", (id,))?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingEntry);
    }

    Ok(())
}

/// Create the entry and entry tag tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_entry_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS entry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                FOREIGN KEY(category) REFERENCES tag(name)
                )",
        (),
    )?;

    // Seed sqlite_sequence so the first entry gets id 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('entry', 0)",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS entry_tag (
                entry_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                PRIMARY KEY (entry_id, tag_name),
                FOREIGN KEY(entry_id) REFERENCES entry(id) ON DELETE CASCADE,
                FOREIGN KEY(tag_name) REFERENCES tag(name) ON DELETE CASCADE
                )",
        (),
    )?;

    // Indexes used by the listing and charts pages.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_entry_date ON entry(date);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_entry_category ON entry(category);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Entry] with no tags attached.
///
/// Expects the columns id, amount, date, category and comment. Tags live in
/// the entry_tag table and are attached by the caller.
fn map_entry_row(row: &Row) -> Result<Entry, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;
    let raw_category: String = row.get(3)?;
    let comment = row.get(4)?;

    Ok(Entry {
        id,
        amount,
        date,
        category: TagName::new_unchecked(&raw_category),
        tags: Vec::new(),
        comment,
    })
}

fn get_entry_tags(id: EntryId, connection: &Connection) -> Result<Vec<TagName>, Error> {
    connection
        .prepare("SELECT tag_name FROM entry_tag WHERE entry_id = :id ORDER BY tag_name ASC;")?
        .query_map(&[(":id", &id)], |row| {
            let raw_name: String = row.get(0)?;

            Ok(TagName::new_unchecked(&raw_name))
        })?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

fn get_all_entry_tags(connection: &Connection) -> Result<HashMap<EntryId, Vec<TagName>>, Error> {
    let mut tags_by_entry: HashMap<EntryId, Vec<TagName>> = HashMap::new();

    connection
        .prepare("SELECT entry_id, tag_name FROM entry_tag ORDER BY tag_name ASC;")?
        .query_map([], |row| {
            let entry_id: EntryId = row.get(0)?;
            let raw_name: String = row.get(1)?;

            Ok((entry_id, TagName::new_unchecked(&raw_name)))
        })?
        .try_for_each(|maybe_row| {
            let (entry_id, tag_name) = maybe_row?;
            tags_by_entry.entry(entry_id).or_default().push(tag_name);

            Ok::<(), rusqlite::Error>(())
        })?;

    Ok(tags_by_entry)
}

fn set_entry_tags(id: EntryId, tags: &[TagName], connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM entry_tag WHERE entry_id = ?1;", (id,))?;

    for tag in tags {
        connection.execute(
            "INSERT OR IGNORE INTO entry_tag (entry_id, tag_name) VALUES (?1, ?2);",
            (id, tag.as_ref()),
        )?;
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{UtcOffset, macros::datetime};

    use crate::{
        Error,
        db::initialize,
        entry::{
            Entry, EntryOrder, create_entry, delete_entry, entry_exists, get_entries, get_entry,
            update_entry,
        },
        tag::{TagName, tag_exists},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let builder = Entry::build(
            12.3,
            datetime!(2025-10-05 09:30:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![
            TagName::new_unchecked("food"),
            TagName::new_unchecked("weekly"),
        ])
        .comment("farmers market");

        let entry = create_entry(builder, &conn).expect("Could not create entry");

        assert_eq!(entry.id, 1);
        assert_eq!(entry.amount, 12.3);
        assert_eq!(entry.category, TagName::new_unchecked("groceries"));
        assert_eq!(entry.comment, "farmers market");
        assert_eq!(Ok(entry), get_entry(1, &conn));
    }

    #[test]
    fn create_normalises_date_to_utc() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-05 09:30:00 +13);
        let builder = Entry::build(1.0, date, TagName::new_unchecked("groceries"));

        let entry = create_entry(builder, &conn).expect("Could not create entry");

        let got = get_entry(entry.id, &conn).expect("Could not get entry");
        assert_eq!(got.date.offset(), UtcOffset::UTC);
        assert_eq!(got.date, date);
    }

    #[test]
    fn create_creates_tags_on_demand() {
        let conn = get_test_connection();
        let builder = Entry::build(
            1.0,
            datetime!(2025-10-05 09:30:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![TagName::new_unchecked("food")]);

        create_entry(builder, &conn).expect("Could not create entry");

        assert_eq!(
            tag_exists(&TagName::new_unchecked("groceries"), &conn),
            Ok(true)
        );
        assert_eq!(tag_exists(&TagName::new_unchecked("food"), &conn), Ok(true));
    }

    #[test]
    fn create_sorts_and_deduplicates_tags() {
        let conn = get_test_connection();
        let builder = Entry::build(
            1.0,
            datetime!(2025-10-05 09:30:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![
            TagName::new_unchecked("weekly"),
            TagName::new_unchecked("food"),
            TagName::new_unchecked("food"),
        ]);

        let entry = create_entry(builder, &conn).expect("Could not create entry");

        let want_tags = vec![
            TagName::new_unchecked("food"),
            TagName::new_unchecked("weekly"),
        ];
        assert_eq!(entry.tags, want_tags);
        assert_eq!(
            get_entry(entry.id, &conn).expect("Could not get entry").tags,
            want_tags
        );
    }

    #[test]
    fn get_entry_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = get_entry(999, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn entry_exists_distinguishes_known_and_unknown_ids() {
        let conn = get_test_connection();
        let entry = create_entry(
            Entry::build(
                1.0,
                datetime!(2025-10-05 12:00:00 UTC),
                TagName::new_unchecked("groceries"),
            ),
            &conn,
        )
        .expect("Could not create entry");

        assert_eq!(entry_exists(entry.id, &conn), Ok(true));
        assert_eq!(entry_exists(999, &conn), Ok(false));
    }

    #[test]
    fn get_entries_orders_by_date() {
        let conn = get_test_connection();
        let category = TagName::new_unchecked("groceries");
        for day in [5, 3, 4] {
            let date = datetime!(2025-10-01 12:00:00 UTC).replace_day(day).unwrap();
            create_entry(Entry::build(day as f64, date, category.clone()), &conn)
                .expect("Could not create entry");
        }

        let newest_first =
            get_entries(None, EntryOrder::DateDescending, &conn).expect("Could not get entries");
        let oldest_first =
            get_entries(None, EntryOrder::DateAscending, &conn).expect("Could not get entries");

        let newest_first_days: Vec<u8> = newest_first
            .iter()
            .map(|entry| entry.date.day())
            .collect();
        let oldest_first_days: Vec<u8> = oldest_first
            .iter()
            .map(|entry| entry.date.day())
            .collect();
        assert_eq!(newest_first_days, vec![5, 4, 3]);
        assert_eq!(oldest_first_days, vec![3, 4, 5]);
    }

    #[test]
    fn get_entries_filters_by_category() {
        let conn = get_test_connection();
        let date = datetime!(2025-10-05 12:00:00 UTC);
        create_entry(
            Entry::build(1.0, date, TagName::new_unchecked("groceries")),
            &conn,
        )
        .expect("Could not create entry");
        create_entry(
            Entry::build(2.0, date, TagName::new_unchecked("rent")),
            &conn,
        )
        .expect("Could not create entry");
        create_entry(
            Entry::build(3.0, date, TagName::new_unchecked("groceries")),
            &conn,
        )
        .expect("Could not create entry");

        let entries = get_entries(
            Some(&TagName::new_unchecked("groceries")),
            EntryOrder::DateAscending,
            &conn,
        )
        .expect("Could not get entries");

        assert_eq!(entries.len(), 2);
        assert!(
            entries
                .iter()
                .all(|entry| entry.category == TagName::new_unchecked("groceries"))
        );
    }

    #[test]
    fn get_entries_attaches_sorted_tags() {
        let conn = get_test_connection();
        let builder = Entry::build(
            1.0,
            datetime!(2025-10-05 12:00:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![
            TagName::new_unchecked("weekly"),
            TagName::new_unchecked("food"),
        ]);
        create_entry(builder, &conn).expect("Could not create entry");

        let entries = get_entries(None, EntryOrder::DateAscending, &conn)
            .expect("Could not get entries");

        assert_eq!(
            entries[0].tags,
            vec![
                TagName::new_unchecked("food"),
                TagName::new_unchecked("weekly"),
            ]
        );
    }

    #[test]
    fn update_replaces_fields_and_tags() {
        let conn = get_test_connection();
        let builder = Entry::build(
            1.0,
            datetime!(2025-10-05 12:00:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![TagName::new_unchecked("food")]);
        let entry = create_entry(builder, &conn).expect("Could not create entry");

        let updated = Entry {
            amount: 25.0,
            date: datetime!(2025-10-06 08:00:00 UTC),
            category: TagName::new_unchecked("eating out"),
            tags: vec![TagName::new_unchecked("treat")],
            comment: "brunch".to_owned(),
            ..entry
        };
        update_entry(&updated, &conn).expect("Could not update entry");

        assert_eq!(Ok(updated), get_entry(entry.id, &conn));
    }

    #[test]
    fn update_missing_entry_returns_error() {
        let conn = get_test_connection();
        let entry = Entry {
            id: 999,
            amount: 1.0,
            date: datetime!(2025-10-05 12:00:00 UTC),
            category: TagName::new_unchecked("groceries"),
            tags: Vec::new(),
            comment: String::new(),
        };

        let result = update_entry(&entry, &conn);

        assert_eq!(result, Err(Error::UpdateMissingEntry));
    }

    #[test]
    fn delete_succeeds_and_removes_junction_rows() {
        let conn = get_test_connection();
        let builder = Entry::build(
            1.0,
            datetime!(2025-10-05 12:00:00 UTC),
            TagName::new_unchecked("groceries"),
        )
        .tags(vec![TagName::new_unchecked("food")]);
        let entry = create_entry(builder, &conn).expect("Could not create entry");

        delete_entry(entry.id, &conn).expect("Could not delete entry");

        assert_eq!(get_entry(entry.id, &conn), Err(Error::NotFound));
        let junction_count: i64 = conn
            .query_row("SELECT COUNT(1) FROM entry_tag;", [], |row| row.get(0))
            .expect("Could not count junction rows");
        assert_eq!(junction_count, 0);
    }

    #[test]
    fn delete_missing_entry_returns_error() {
        let conn = get_test_connection();

        let result = delete_entry(999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingEntry));
    }
}
