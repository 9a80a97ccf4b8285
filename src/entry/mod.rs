//! Entry management for the spending tracker.
//!
//! This module contains everything related to entries:
//! - The `Entry` model and `EntryBuilder` for creating entries
//! - Database functions for storing, querying, and managing entries
//! - Form field parsing shared by the creation, edit and bulk update forms
//! - View handlers for the entry listing, detail and edit pages
//! - API endpoints for creating, editing and deleting single entries

mod core;
mod create_entry_endpoint;
mod delete_entry_endpoint;
mod detail_page;
mod edit_entry_endpoint;
mod edit_page;
mod entries_page;
mod form;

pub(crate) use core::update_entry_in_transaction;
pub use core::{
    Entry, EntryBuilder, EntryId, EntryOrder, create_entry, create_entry_table, delete_entry,
    entry_exists, get_entries, get_entry, update_entry,
};
pub use create_entry_endpoint::create_entry_endpoint;
pub use delete_entry_endpoint::delete_entry_endpoint;
pub use detail_page::get_entry_detail_page;
pub use edit_entry_endpoint::edit_entry_endpoint;
pub use edit_page::get_edit_entry_page;
pub use entries_page::{
    EntriesPageState, get_entries_category_window_page, get_entries_page,
    get_entries_selector_page,
};
pub use form::{coerce_to_string, parse_amount, parse_entry_date};
