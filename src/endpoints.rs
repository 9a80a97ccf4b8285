//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/entry/{entry_id}', use [format_endpoint].

/// The root route which redirects to the entries page.
pub const ROOT: &str = "/";
/// The page for listing and creating entries.
pub const ENTRIES_VIEW: &str = "/entries";
/// The entries page restricted by a recency window or a category name.
pub const ENTRIES_SELECTOR_VIEW: &str = "/entries/{selector}";
/// The entries page restricted by a category name and a recency window.
pub const ENTRIES_CATEGORY_WINDOW_VIEW: &str = "/entries/{category}/{window}";
/// The page for displaying a single entry.
pub const ENTRY_DETAIL_VIEW: &str = "/entry/{entry_id}";
/// The page for editing an existing entry.
pub const EDIT_ENTRY_VIEW: &str = "/entry/{entry_id}/edit";
/// The page for charting spending over time.
pub const CHARTS_VIEW: &str = "/charts";
/// The charts page restricted by a recency window.
pub const CHARTS_WINDOW_VIEW: &str = "/charts/{window}";
/// The page for listing all tags.
pub const TAGS_VIEW: &str = "/tags";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to create an entry.
pub const POST_ENTRY: &str = "/api/entry";
/// The route to update an entry.
pub const PUT_ENTRY: &str = "/api/entry/{entry_id}";
/// The route to delete an entry.
pub const DELETE_ENTRY: &str = "/api/entry/{entry_id}";
/// The route for bulk edits and deletions from the entries page.
pub const UPDATES_API: &str = "/api/updates";
/// The route to delete a tag.
pub const DELETE_TAG: &str = "/api/tags/{tag_name}";

/// The route for static files such as scripts and stylesheets.
pub const STATIC: &str = "/static";

/// Replace the path parameter in `endpoint_path` with `id`.
///
/// A path parameter is a brace-delimited name such as '{entry_id}' in
/// '/entry/{entry_id}'. Only the first parameter is replaced. A path without
/// a parameter is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = match endpoint_path[param_start..].find('}') {
        Some(offset) => param_start + offset + 1,
        None => endpoint_path.len(),
    };

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
