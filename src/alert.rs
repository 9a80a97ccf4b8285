//! Renders status banners that htmx swaps into the base page's alert container.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

const SUCCESS_BANNER_STYLE: &str = "rounded-lg bg-green-100 p-4 text-green-800 shadow-lg \
    dark:bg-green-900 dark:text-green-200";

const ERROR_BANNER_STYLE: &str = "rounded-lg bg-red-100 p-4 text-red-800 shadow-lg \
    dark:bg-red-900 dark:text-red-200";

/// A status banner shown near the bottom of the page.
///
/// The rendered markup carries the `alert-container` id and `hx-swap-oob`, so
/// appending it to any htmx response body replaces the hidden placeholder in
/// the base page rather than the response's normal swap target.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success banner with a second line of details.
    Success { message: String, details: String },
    /// A success banner with a message only.
    SuccessSimple { message: String },
    /// An error banner with a second line of details.
    Error { message: String, details: String },
    /// An error banner with a message only.
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (banner_style, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_BANNER_STYLE, message, details),
            Alert::SuccessSimple { message } => (SUCCESS_BANNER_STYLE, message, String::new()),
            Alert::Error { message, details } => (ERROR_BANNER_STYLE, message, details),
            Alert::ErrorSimple { message } => (ERROR_BANNER_STYLE, message, String::new()),
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(banner_style) role="alert" {
                    p class="text-sm font-medium" { (message) }
                    @if !details.is_empty() {
                        p class="mt-1 text-sm opacity-80" { (details) }
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
