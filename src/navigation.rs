//! The navigation bar shared by every page.

use maud::{Markup, html};

use crate::endpoints;

/// The pages reachable from the navigation bar, in display order.
const NAV_LINKS: [(&str, &str); 3] = [
    (endpoints::ENTRIES_VIEW, "Entries"),
    (endpoints::CHARTS_VIEW, "Charts"),
    (endpoints::TAGS_VIEW, "Tags"),
];

/// The navigation bar with the current page highlighted.
///
/// Renders a top bar on large screens and a fixed bottom bar on small ones.
pub struct NavBar<'a> {
    active_endpoint: &'a str,
}

impl NavBar<'_> {
    /// Get the navigation bar. The link whose URL equals `active_endpoint` is
    /// marked as the current page.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        NavBar { active_endpoint }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href="/"
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Tally"
                        }
                    }

                    div class="hidden w-full lg:block lg:w-auto"
                    {
                        ul
                            class="font-medium flex flex-col p-4 lg:p-0 mt-4
                            border border-gray-100 rounded bg-gray-50
                            lg:flex-row lg:space-x-8 rtl:space-x-reverse lg:mt-0
                            lg:border-0 lg:bg-white dark:bg-gray-800
                            lg:dark:bg-gray-900 dark:border-gray-700"
                        {
                            @for (url, title) in NAV_LINKS {
                                li {
                                    a
                                        href=(url)
                                        class=(desktop_link_class(url == self.active_endpoint))
                                        aria-current=[(url == self.active_endpoint).then_some("page")]
                                    {
                                        (title)
                                    }
                                }
                            }
                        }
                    }
                }
            }

            nav class="fixed inset-x-0 bottom-0 z-40 lg:hidden"
            {
                div class="mx-auto max-w-screen-xl px-4 pb-4"
                {
                    div
                        class="rounded-xl border border-gray-200 bg-white/95
                        shadow-lg backdrop-blur dark:border-gray-700 dark:bg-gray-900/95"
                    {
                        ul
                            class="grid grid-cols-3 gap-2 px-4 py-3 text-xs font-semibold
                            text-gray-600 dark:text-gray-300"
                            aria-label="Primary"
                        {
                            @for (url, title) in NAV_LINKS {
                                li class="min-w-0" {
                                    a
                                        href=(url)
                                        class=(bottom_link_class(url == self.active_endpoint))
                                        aria-current=[(url == self.active_endpoint).then_some("page")]
                                    {
                                        span class="truncate" { (title) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        )
    }
}

fn desktop_link_class(is_current: bool) -> &'static str {
    if is_current {
        "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
    } else {
        "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
    }
}

fn bottom_link_class(is_current: bool) -> &'static str {
    if is_current {
        "flex w-full min-w-0 items-center justify-center rounded-lg \
        bg-blue-50 px-2.5 py-2 text-xs font-semibold leading-tight \
        text-blue-700 shadow-sm sm:px-4 sm:text-sm \
        dark:bg-blue-900/30 dark:text-blue-200"
    } else {
        "flex w-full min-w-0 items-center justify-center rounded-lg \
        px-2.5 py-2 text-xs font-semibold leading-tight text-gray-600 \
        sm:px-4 sm:text-sm \
        hover:bg-blue-50/70 hover:text-blue-700 dark:text-gray-300 \
        dark:hover:bg-blue-900/20 dark:hover:text-blue-200"
    }
}
