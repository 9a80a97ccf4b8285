//! Sets up the application's database schema.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, entry::create_entry_table, tag::create_tag_table};

/// Create the application's tables if they do not exist.
///
/// Tables are created in dependency order within one exclusive transaction,
/// so a half-initialized database is never left behind.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_tag_table(&transaction)?;
    create_entry_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
