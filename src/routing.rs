//! Application router configuration.

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    charts::{get_charts_page, get_charts_window_page},
    endpoints,
    entry::{
        create_entry_endpoint, delete_entry_endpoint, edit_entry_endpoint, get_edit_entry_page,
        get_entries_category_window_page, get_entries_page, get_entries_selector_page,
        get_entry_detail_page,
    },
    not_found::get_404_not_found,
    tag::{delete_tag_endpoint, get_tags_page},
    updates::post_updates_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::ENTRIES_VIEW, get(get_entries_page))
        .route(
            endpoints::ENTRIES_SELECTOR_VIEW,
            get(get_entries_selector_page),
        )
        .route(
            endpoints::ENTRIES_CATEGORY_WINDOW_VIEW,
            get(get_entries_category_window_page),
        )
        .route(endpoints::ENTRY_DETAIL_VIEW, get(get_entry_detail_page))
        .route(endpoints::EDIT_ENTRY_VIEW, get(get_edit_entry_page))
        .route(endpoints::CHARTS_VIEW, get(get_charts_page))
        .route(endpoints::CHARTS_WINDOW_VIEW, get(get_charts_window_page))
        .route(endpoints::TAGS_VIEW, get(get_tags_page))
        .route(endpoints::POST_ENTRY, post(create_entry_endpoint))
        .route(endpoints::PUT_ENTRY, put(edit_entry_endpoint))
        .route(endpoints::DELETE_ENTRY, delete(delete_entry_endpoint))
        .route(endpoints::UPDATES_API, post(post_updates_endpoint))
        .route(endpoints::DELETE_TAG, delete(delete_tag_endpoint))
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

/// The root path '/' redirects to the entries page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::ENTRIES_VIEW)
}
