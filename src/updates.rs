//! The bulk update pipeline behind the entries page.
//!
//! The entries page lets the user edit and delete many entries in one form
//! submission. The submitted payload runs through three stages: parse the
//! form data, validate every record against the current database state, then
//! apply everything in a single all-or-nothing transaction. A failure in any
//! stage stops the pipeline and nothing is written.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, RawForm, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error, endpoints,
    entry::{
        Entry, EntryId, coerce_to_string, delete_entry, entry_exists, parse_amount,
        parse_entry_date, update_entry_in_transaction,
    },
    tag::{TagName, TagResolution, create_tag, resolve_tag},
    timezone::get_local_offset,
};

// ============================================================================
// MODELS
// ============================================================================

/// The raw edit and deletion lists from a bulk update submission.
///
/// Element types are not checked at this point, only the outer shape.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ParsedUpdates {
    /// Full-replacement edit records, one JSON object per entry.
    #[serde(default)]
    pub edits: Vec<Value>,
    /// The ids of entries to delete.
    #[serde(default)]
    pub deletions: Vec<Value>,
}

/// An edit that passed validation, carrying cleaned field values ready to
/// apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEdit {
    /// The id of the entry to replace.
    pub id: EntryId,
    /// The new amount.
    pub amount: f64,
    /// The new date, interpreted in the display timezone.
    pub date: OffsetDateTime,
    /// The new category, resolved against the tag table.
    pub category: TagResolution,
    /// The new secondary tags, resolved against the tag table.
    pub tags: Vec<TagResolution>,
    /// The new comment.
    pub comment: String,
}

/// The outcome of validating a [ParsedUpdates] batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpdates {
    /// Edits in submission order, one per entry id.
    pub edits: Vec<ValidatedEdit>,
    /// Entry ids to delete, deduplicated and sorted.
    pub deletions: Vec<EntryId>,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Extract the edit and deletion lists from the submitted form data.
///
/// The form data must contain the key "updates" with at most one value, a
/// JSON document of the shape `{"edits": [...], "deletions": [...]}` where
/// both keys are optional. No value at all means no changes were submitted,
/// which trivially succeeds.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingUpdates] if the key "updates" is absent,
/// - [Error::TooManyUpdates] if the key has more than one value,
/// - or [Error::UnparseableUpdates] if the value is not JSON of the expected
///   shape.
pub fn parse_updates(form_data: &HashMap<String, Vec<String>>) -> Result<ParsedUpdates, Error> {
    let values = form_data.get("updates").ok_or(Error::MissingUpdates)?;

    match values.as_slice() {
        [] => Ok(ParsedUpdates::default()),
        [json] => {
            serde_json::from_str(json).map_err(|error| Error::UnparseableUpdates(error.to_string()))
        }
        _ => Err(Error::TooManyUpdates),
    }
}

/// Check every record in `parsed` against the field rules and the current
/// database state, without writing anything.
///
/// Edits are full replacement records: every field is validated even when a
/// later record for the same entry supersedes it. Duplicate edits collapse
/// to the last record in submission order, keeping the first occurrence's
/// position. Duplicate deletions collapse to one, and the deletion list is
/// sorted. Category and tag names resolve read-only to a [TagResolution],
/// deferring creation to [apply_updates].
///
/// # Errors
/// This function will return the error of the first record that fails a
/// field rule or names an entry that is not in the database.
pub fn validate_updates(
    parsed: ParsedUpdates,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<ValidatedUpdates, Error> {
    let mut edits: Vec<ValidatedEdit> = Vec::new();

    for record in &parsed.edits {
        let edit = validate_edit(record, local_offset, connection)?;

        match edits.iter().position(|existing| existing.id == edit.id) {
            Some(index) => edits[index] = edit,
            None => edits.push(edit),
        }
    }

    let mut deletions = Vec::new();

    for value in &parsed.deletions {
        deletions.push(validate_deletion(value, connection)?);
    }

    deletions.sort_unstable();
    deletions.dedup();

    Ok(ValidatedUpdates { edits, deletions })
}

/// Write a validated batch to the database in one transaction.
///
/// Edits run before deletions so that an id appearing in both lists edits a
/// live row before removing it. If any step fails the transaction rolls
/// back entirely and the database is left exactly as it was.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingEntry] or [Error::DeleteMissingEntry] if an entry
///   vanished between validation and application,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn apply_updates(validated: &ValidatedUpdates, connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Names resolved as new during validation are created first, so every
    // edit applies against a complete tag table.
    for edit in &validated.edits {
        for resolution in std::iter::once(&edit.category).chain(&edit.tags) {
            if let TagResolution::New(name) = resolution {
                create_tag(name, &transaction)?;
            }
        }
    }

    for edit in &validated.edits {
        let entry = Entry {
            id: edit.id,
            amount: edit.amount,
            date: edit.date,
            category: edit.category.name().clone(),
            tags: edit.tags.iter().map(|tag| tag.name().clone()).collect(),
            comment: edit.comment.clone(),
        };

        update_entry_in_transaction(&entry, &transaction)?;
    }

    for id in &validated.deletions {
        delete_entry(*id, &transaction)?;
    }

    transaction.commit()?;

    Ok(())
}

/// Run the full parse, validate, apply pipeline over submitted form data.
///
/// # Errors
/// This function will return the error of the first stage that fails; no
/// stage runs unless the previous one fully succeeded.
pub fn process_updates(
    form_data: &HashMap<String, Vec<String>>,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<(), Error> {
    let parsed = parse_updates(form_data)?;
    let validated = validate_updates(parsed, local_offset, connection)?;

    apply_updates(&validated, connection)
}

fn validate_edit(
    record: &Value,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<ValidatedEdit, Error> {
    let Some(record) = record.as_object() else {
        return Err(Error::UnparseableUpdates(format!(
            "each edit must be an object, got {record}"
        )));
    };

    let raw_id = record.get("id").unwrap_or(&Value::Null);
    let id = resolve_entry_id(raw_id).ok_or_else(|| Error::UnknownEditId(display_value(raw_id)))?;

    if !entry_exists(id, connection)? {
        return Err(Error::UnknownEditId(display_value(raw_id)));
    }

    let amount_text = record
        .get("amount")
        .and_then(coerce_to_string)
        .ok_or_else(|| Error::InvalidAmount("null".to_owned()))?;
    let amount = parse_amount(&amount_text)?;

    let date_text = record
        .get("date")
        .and_then(coerce_to_string)
        .ok_or_else(|| Error::InvalidDate("null".to_owned()))?;
    let date = parse_entry_date(&date_text)?.assume_offset(local_offset);

    let category_text = record
        .get("category")
        .and_then(coerce_to_string)
        .ok_or(Error::MissingField("category"))?;
    let category = resolve_tag(TagName::new(&category_text)?, connection)?;

    let tags = match record.get("tags").unwrap_or(&Value::Null) {
        Value::Null => Vec::new(),
        Value::Array(values) => {
            let mut tags = Vec::new();

            for value in values {
                if value.is_array() || value.is_object() {
                    return Err(Error::InvalidTags(value.to_string()));
                }

                let text =
                    coerce_to_string(value).ok_or_else(|| Error::InvalidTags(display_value(value)))?;

                tags.push(resolve_tag(TagName::new(&text)?, connection)?);
            }

            tags
        }
        other => return Err(Error::InvalidTags(display_value(other))),
    };

    let comment = record
        .get("comment")
        .and_then(coerce_to_string)
        .unwrap_or_default();

    Ok(ValidatedEdit {
        id,
        amount,
        date,
        category,
        tags,
        comment,
    })
}

fn validate_deletion(value: &Value, connection: &Connection) -> Result<EntryId, Error> {
    let id =
        resolve_entry_id(value).ok_or_else(|| Error::InvalidDeletionId(display_value(value)))?;

    if !entry_exists(id, connection)? {
        return Err(Error::MissingEntry(id));
    }

    Ok(id)
}

/// Convert a JSON value to an entry id: an integer, a float (truncated), or
/// a string holding an integer literal. Anything else has no id form.
fn resolve_entry_id(value: &Value) -> Option<EntryId> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    coerce_to_string(value).unwrap_or_else(|| "null".to_owned())
}

// ============================================================================
// ENDPOINT
// ============================================================================

/// The state needed for the bulk updates endpoint.
#[derive(Debug, Clone)]
pub struct UpdatesEndpointState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for UpdatesEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Apply the bulk edits and deletions submitted by the entries page, then
/// redirect back to it.
///
/// The body is read as a raw form so that repeated keys are visible to the
/// pipeline rather than collapsed by the extractor.
///
/// # Errors
/// Pipeline errors from bad client input become 400 responses; entries that
/// vanished mid-flight or storage faults become 500 responses after the
/// transaction rolls back.
pub async fn post_updates_endpoint(
    State(state): State<UpdatesEndpointState>,
    RawForm(body): RawForm,
) -> Result<Response, Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
        .map_err(|error| Error::UnparseableUpdates(error.to_string()))?;

    let mut form_data: HashMap<String, Vec<String>> = HashMap::new();

    for (key, value) in pairs {
        form_data.entry(key).or_default().push(value);
    }

    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    process_updates(&form_data, local_offset, &connection)?;

    Ok(Redirect::to(endpoints::ENTRIES_VIEW).into_response())
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod validate_updates_tests {
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::{datetime, offset};

    use crate::{
        Error,
        db::initialize,
        entry::{Entry, create_entry},
        tag::{TagName, TagResolution},
        updates::{ParsedUpdates, ValidatedEdit, validate_updates},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        // Entries 1 and 2 are "red", entry 3 is "green".
        for (amount, category) in [(1.0, "red"), (2.0, "red"), (3.0, "green")] {
            create_entry(
                Entry::build(
                    amount,
                    datetime!(2001-01-23 12:00:00 UTC),
                    TagName::new_unchecked(category),
                ),
                &conn,
            )
            .expect("Could not create entry");
        }

        conn
    }

    fn edit_record(id: i64, amount: f64) -> Value {
        json!({
            "id": id,
            "amount": amount,
            "date": "2001-01-23",
            "category": "red",
            "tags": [],
            "comment": ""
        })
    }

    fn validate_one_edit(record: Value, conn: &Connection) -> Result<ValidatedEdit, Error> {
        let parsed = ParsedUpdates {
            edits: vec![record],
            deletions: Vec::new(),
        };

        validate_updates(parsed, offset!(UTC), conn).map(|validated| {
            validated
                .edits
                .into_iter()
                .next()
                .expect("validation should produce one edit")
        })
    }

    #[test]
    fn a_full_record_validates() {
        let conn = get_test_connection();
        let record = json!({
            "id": 2,
            "amount": "4.5",
            "date": "23 January 2001",
            "category": "blue",
            "tags": ["list", "of", "tags"],
            "comment": 42
        });

        let edit = validate_one_edit(record, &conn).expect("Could not validate edit");

        assert_eq!(edit.id, 2);
        assert_eq!(edit.amount, 4.5);
        assert_eq!(edit.date, datetime!(2001-01-23 0:00 UTC));
        assert_eq!(
            edit.category,
            TagResolution::New(TagName::new_unchecked("blue"))
        );
        assert_eq!(
            edit.tags,
            vec![
                TagResolution::New(TagName::new_unchecked("list")),
                TagResolution::New(TagName::new_unchecked("of")),
                TagResolution::New(TagName::new_unchecked("tags")),
            ]
        );
        assert_eq!(edit.comment, "42");
    }

    #[test]
    fn known_category_resolves_as_existing() {
        let conn = get_test_connection();

        let edit = validate_one_edit(edit_record(1, 5.0), &conn).expect("Could not validate edit");

        assert_eq!(
            edit.category,
            TagResolution::Existing(TagName::new_unchecked("red"))
        );
    }

    #[test]
    fn dates_are_interpreted_in_the_display_timezone() {
        let conn = get_test_connection();
        let parsed = ParsedUpdates {
            edits: vec![edit_record(1, 5.0)],
            deletions: Vec::new(),
        };

        let validated =
            validate_updates(parsed, offset!(+13), &conn).expect("Could not validate updates");

        assert_eq!(validated.edits[0].date, datetime!(2001-01-23 0:00 +13));
    }

    #[test]
    fn numeric_ids_are_coerced() {
        let conn = get_test_connection();

        let from_float =
            validate_one_edit(json!({"id": 1.1, "amount": 5, "date": "2001-01-23", "category": "red"}), &conn)
                .expect("Could not validate edit");
        let from_string =
            validate_one_edit(json!({"id": "1", "amount": 5, "date": "2001-01-23", "category": "red"}), &conn)
                .expect("Could not validate edit");

        assert_eq!(from_float.id, 1);
        assert_eq!(from_string.id, 1);
    }

    #[test]
    fn unresolvable_ids_are_rejected() {
        let conn = get_test_connection();

        for id in [json!(true), json!("abc"), json!(null)] {
            let record = json!({"id": id, "amount": 5, "date": "2001-01-23", "category": "red"});

            assert!(
                matches!(
                    validate_one_edit(record, &conn),
                    Err(Error::UnknownEditId(_))
                ),
                "id {id} should not resolve"
            );
        }
    }

    #[test]
    fn missing_id_is_rejected() {
        let conn = get_test_connection();
        let record = json!({"amount": 5, "date": "2001-01-23", "category": "red"});

        assert!(matches!(
            validate_one_edit(record, &conn),
            Err(Error::UnknownEditId(_))
        ));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let conn = get_test_connection();

        let result = validate_one_edit(edit_record(999, 5.0), &conn);

        assert_eq!(result, Err(Error::UnknownEditId("999".to_owned())));
    }

    #[test]
    fn bad_amounts_are_rejected() {
        let conn = get_test_connection();

        for amount in [json!("abc"), json!(-1), json!(null)] {
            let record = json!({"id": 1, "amount": amount, "date": "2001-01-23", "category": "red"});

            assert!(
                matches!(
                    validate_one_edit(record, &conn),
                    Err(Error::InvalidAmount(_))
                ),
                "amount {amount} should be rejected"
            );
        }
    }

    #[test]
    fn numeric_string_amounts_are_accepted() {
        let conn = get_test_connection();

        for (amount, want) in [(json!("1"), 1.0), (json!("0.0"), 0.0), (json!(2.5), 2.5)] {
            let record = json!({"id": 1, "amount": amount, "date": "2001-01-23", "category": "red"});

            let edit = validate_one_edit(record, &conn).expect("Could not validate edit");

            assert_eq!(edit.amount, want);
        }
    }

    #[test]
    fn a_bare_timestamp_is_not_a_date() {
        let conn = get_test_connection();
        let record = json!({"id": 1, "amount": 5, "date": "1000000000", "category": "red"});

        let result = validate_one_edit(record, &conn);

        assert_eq!(result, Err(Error::InvalidDate("1000000000".to_owned())));
    }

    #[test]
    fn missing_category_is_rejected() {
        let conn = get_test_connection();
        let record = json!({"id": 1, "amount": 5, "date": "2001-01-23"});

        let result = validate_one_edit(record, &conn);

        assert_eq!(result, Err(Error::MissingField("category")));
    }

    #[test]
    fn blank_category_is_rejected() {
        let conn = get_test_connection();
        let record = json!({"id": 1, "amount": 5, "date": "2001-01-23", "category": "  "});

        let result = validate_one_edit(record, &conn);

        assert_eq!(result, Err(Error::EmptyTagName));
    }

    #[test]
    fn a_bare_string_is_not_a_tag_list() {
        let conn = get_test_connection();
        let record =
            json!({"id": 1, "amount": 5, "date": "2001-01-23", "category": "red", "tags": "one_tag"});

        let result = validate_one_edit(record, &conn);

        assert_eq!(result, Err(Error::InvalidTags("one_tag".to_owned())));
    }

    #[test]
    fn nested_sequences_are_not_tags() {
        let conn = get_test_connection();
        let record =
            json!({"id": 1, "amount": 5, "date": "2001-01-23", "category": "red", "tags": [["a"]]});

        assert!(matches!(
            validate_one_edit(record, &conn),
            Err(Error::InvalidTags(_))
        ));
    }

    #[test]
    fn missing_tags_and_comment_default_to_empty() {
        let conn = get_test_connection();
        let record = json!({"id": 1, "amount": 5, "date": "2001-01-23", "category": "red"});

        let edit = validate_one_edit(record, &conn).expect("Could not validate edit");

        assert_eq!(edit.tags, Vec::new());
        assert_eq!(edit.comment, "");
    }

    #[test]
    fn duplicate_edits_keep_the_last_record_in_the_first_position() {
        let conn = get_test_connection();
        let parsed = ParsedUpdates {
            edits: vec![edit_record(2, 20.0), edit_record(3, 30.0), edit_record(2, 25.0)],
            deletions: Vec::new(),
        };

        let validated =
            validate_updates(parsed, offset!(UTC), &conn).expect("Could not validate updates");

        assert_eq!(validated.edits.len(), 2);
        assert_eq!(validated.edits[0].id, 2);
        assert_eq!(validated.edits[0].amount, 25.0);
        assert_eq!(validated.edits[1].id, 3);
        assert_eq!(validated.edits[1].amount, 30.0);
    }

    #[test]
    fn superseded_records_are_still_validated() {
        let conn = get_test_connection();
        let bad = json!({"id": 2, "amount": "abc", "date": "2001-01-23", "category": "red"});
        let parsed = ParsedUpdates {
            edits: vec![bad, edit_record(2, 25.0)],
            deletions: Vec::new(),
        };

        let result = validate_updates(parsed, offset!(UTC), &conn);

        assert_eq!(result, Err(Error::InvalidAmount("abc".to_owned())));
    }

    #[test]
    fn duplicate_deletions_collapse_to_a_sorted_set() {
        let conn = get_test_connection();
        let parsed = ParsedUpdates {
            edits: Vec::new(),
            deletions: vec![json!(2), json!(1), json!("1")],
        };

        let validated =
            validate_updates(parsed, offset!(UTC), &conn).expect("Could not validate updates");

        assert_eq!(validated.deletions, vec![1, 2]);
    }

    #[test]
    fn float_deletion_ids_truncate() {
        let conn = get_test_connection();
        let parsed = ParsedUpdates {
            edits: Vec::new(),
            deletions: vec![json!(1.9)],
        };

        let validated =
            validate_updates(parsed, offset!(UTC), &conn).expect("Could not validate updates");

        assert_eq!(validated.deletions, vec![1]);
    }

    #[test]
    fn non_numeric_deletion_ids_are_rejected() {
        let conn = get_test_connection();

        for id in [json!(true), json!("abc")] {
            let parsed = ParsedUpdates {
                edits: Vec::new(),
                deletions: vec![id.clone()],
            };

            assert!(
                matches!(
                    validate_updates(parsed, offset!(UTC), &conn),
                    Err(Error::InvalidDeletionId(_))
                ),
                "deletion id {id} should be rejected"
            );
        }
    }

    #[test]
    fn deleting_an_unknown_entry_is_rejected() {
        let conn = get_test_connection();
        let parsed = ParsedUpdates {
            edits: Vec::new(),
            deletions: vec![json!(999)],
        };

        let result = validate_updates(parsed, offset!(UTC), &conn);

        assert_eq!(result, Err(Error::MissingEntry(999)));
    }
}

#[cfg(test)]
mod apply_updates_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        db::initialize,
        entry::{Entry, create_entry, entry_exists, get_entry},
        tag::{TagName, TagResolution, tag_exists},
        updates::{ValidatedEdit, ValidatedUpdates, apply_updates},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for (amount, category) in [(1.0, "red"), (2.0, "red"), (3.0, "green")] {
            create_entry(
                Entry::build(
                    amount,
                    datetime!(2001-01-23 12:00:00 UTC),
                    TagName::new_unchecked(category),
                ),
                &conn,
            )
            .expect("Could not create entry");
        }

        conn
    }

    fn edit(id: i64, amount: f64, category: TagResolution) -> ValidatedEdit {
        ValidatedEdit {
            id,
            amount,
            date: datetime!(2001-01-23 0:00 UTC),
            category,
            tags: Vec::new(),
            comment: String::new(),
        }
    }

    #[test]
    fn applies_edits_and_deletions() {
        let conn = get_test_connection();
        let validated = ValidatedUpdates {
            edits: vec![edit(
                1,
                99.0,
                TagResolution::New(TagName::new_unchecked("blue")),
            )],
            deletions: vec![2],
        };

        apply_updates(&validated, &conn).expect("Could not apply updates");

        let updated = get_entry(1, &conn).expect("Could not get entry");
        assert_eq!(updated.amount, 99.0);
        assert_eq!(updated.category, TagName::new_unchecked("blue"));
        assert_eq!(entry_exists(2, &conn), Ok(false));
        assert_eq!(entry_exists(3, &conn), Ok(true));
        assert_eq!(tag_exists(&TagName::new_unchecked("blue"), &conn), Ok(true));
    }

    #[test]
    fn an_id_in_both_lists_is_edited_then_deleted() {
        let conn = get_test_connection();
        let validated = ValidatedUpdates {
            edits: vec![edit(
                2,
                50.0,
                TagResolution::Existing(TagName::new_unchecked("red")),
            )],
            deletions: vec![2],
        };

        apply_updates(&validated, &conn).expect("Could not apply updates");

        assert_eq!(entry_exists(2, &conn), Ok(false));
    }

    #[test]
    fn a_bad_deletion_rolls_back_the_whole_batch() {
        let conn = get_test_connection();
        let validated = ValidatedUpdates {
            edits: vec![edit(
                1,
                99.0,
                TagResolution::New(TagName::new_unchecked("blue")),
            )],
            deletions: vec![2, 999],
        };

        let result = apply_updates(&validated, &conn);

        assert_eq!(result, Err(Error::DeleteMissingEntry));
        // The edit and the valid deletion must not have taken effect.
        assert_eq!(get_entry(1, &conn).expect("Could not get entry").amount, 1.0);
        assert_eq!(entry_exists(2, &conn), Ok(true));
        // Neither must the tag created for the edit.
        assert_eq!(
            tag_exists(&TagName::new_unchecked("blue"), &conn),
            Ok(false)
        );
    }
}

#[cfg(test)]
mod process_updates_tests {
    use std::collections::HashMap;

    use rusqlite::Connection;
    use time::macros::{datetime, offset};

    use crate::{
        Error,
        db::initialize,
        entry::{Entry, create_entry, entry_exists, get_entry},
        tag::TagName,
        updates::process_updates,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for (amount, category) in [(1.0, "red"), (2.0, "red"), (3.0, "green")] {
            create_entry(
                Entry::build(
                    amount,
                    datetime!(2001-01-23 12:00:00 UTC),
                    TagName::new_unchecked(category),
                ),
                &conn,
            )
            .expect("Could not create entry");
        }

        conn
    }

    #[test]
    fn runs_the_full_pipeline() {
        let conn = get_test_connection();
        let json = r#"{
            "edits": [{"id": 2, "amount": 20, "date": "2001-01-23", "category": "red"}],
            "deletions": [1]
        }"#;
        let form_data = HashMap::from([("updates".to_owned(), vec![json.to_owned()])]);

        process_updates(&form_data, offset!(UTC), &conn).expect("Could not process updates");

        assert_eq!(entry_exists(1, &conn), Ok(false));
        assert_eq!(get_entry(2, &conn).expect("Could not get entry").amount, 20.0);
    }

    #[test]
    fn stops_at_the_first_failing_stage() {
        let conn = get_test_connection();

        let result = process_updates(&HashMap::new(), offset!(UTC), &conn);

        assert_eq!(result, Err(Error::MissingUpdates));
        // Nothing was touched.
        assert_eq!(entry_exists(1, &conn), Ok(true));
    }

    #[test]
    fn validation_failures_leave_the_database_untouched() {
        let conn = get_test_connection();
        let json = r#"{
            "edits": [{"id": 2, "amount": 20, "date": "2001-01-23", "category": "red"}],
            "deletions": [999]
        }"#;
        let form_data = HashMap::from([("updates".to_owned(), vec![json.to_owned()])]);

        let result = process_updates(&form_data, offset!(UTC), &conn);

        assert_eq!(result, Err(Error::MissingEntry(999)));
        assert_eq!(get_entry(2, &conn).expect("Could not get entry").amount, 2.0);
    }
}
