//! Defines the route handlers for the charts page.
//!
//! This module creates interactive ECharts visualizations for spending data:
//! - **Daily Totals Chart**: Stacked bar chart of the amount spent per
//!   category per calendar day
//! - **Entries Over Time Chart**: Scatter chart plotting each entry's amount
//!   against its timestamp, one series per category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization
//! code. Both charts can be narrowed to a recency window taken from the URL.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::{Scatter, bar},
};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, Error,
    aggregation::{aggregate_entries, prepare_entries_for_serialization},
    endpoints,
    entry::{Entry, EntryOrder, get_entries},
    html::{HeadElement, PAGE_CONTAINER_STYLE, base, link},
    navigation::NavBar,
    recency::{RecencyWindow, get_recent_entries},
    tag::TagName,
    timezone::get_local_offset,
};

/// The state needed for displaying the charts page.
#[derive(Debug, Clone)]
pub struct ChartsPageState {
    /// The database connection for reading entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ChartsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A chart with its HTML container ID and ECharts configuration.
struct PageChart {
    /// The HTML element ID to use for the chart (kebab-case)
    id: &'static str,
    /// The ECharts configuration as a JSON string
    options: String,
}

/// Display charts over every stored entry.
pub async fn get_charts_page(State(state): State<ChartsPageState>) -> Result<Response, Error> {
    render_charts_page(state, None)
}

/// Display charts over the entries within a recency window.
///
/// A window segment that does not parse, such as `3fortnights`, is treated
/// as an unknown page.
pub async fn get_charts_window_page(
    State(state): State<ChartsPageState>,
    Path(window): Path<String>,
) -> Result<Response, Error> {
    let window = RecencyWindow::parse(&window).ok_or(Error::NotFound)?;

    render_charts_page(state, Some(window))
}

fn render_charts_page(
    state: ChartsPageState,
    window: Option<RecencyWindow>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let entries = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_entries(None, EntryOrder::DateAscending, &connection)
            .inspect_err(|error| tracing::error!("could not get entries: {error}"))?
    };

    let entries = get_recent_entries(
        entries,
        window.map(|window| window.amount),
        window.map(|window| window.unit),
        None,
    )?;

    if entries.is_empty() {
        return Ok(charts_no_data_view(window).into_response());
    }

    let subtext = match window {
        Some(window) => format!("Last {} {}", window.amount, window.unit.as_path_value()),
        None => "All entries".to_owned(),
    };
    let charts = [
        PageChart {
            id: "daily-totals-chart",
            options: daily_totals_chart(&entries, local_offset, &subtext).to_string(),
        },
        PageChart {
            id: "entries-over-time-chart",
            options: entries_over_time_chart(&entries, &subtext).to_string(),
        },
    ];

    Ok(charts_page_view(window, &charts).into_response())
}

fn daily_totals_chart(entries: &[Entry], local_offset: UtcOffset, subtext: &str) -> Chart {
    let totals = aggregate_entries(entries, local_offset);

    // Day keys share one offset, so their string order is chronological.
    let mut days: Vec<String> = totals
        .values()
        .flat_map(|day_totals| day_totals.keys())
        .cloned()
        .collect();
    days.sort();
    days.dedup();

    let labels: Vec<String> = days.iter().map(|day| date_part(day).to_owned()).collect();

    let mut categories: Vec<&TagName> = totals.keys().collect();
    categories.sort();

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Daily Totals")
                .subtext(subtext)
                .left(20)
                .top("1%"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for category in categories {
        let day_totals = &totals[category];
        let data: Vec<Option<f64>> = days.iter().map(|day| day_totals.get(day).copied()).collect();

        chart = chart.series(
            bar::Bar::new()
                .name(category.display_label())
                .stack("Spending")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(data),
        );
    }

    chart
}

fn entries_over_time_chart(entries: &[Entry], subtext: &str) -> Chart {
    let mut points_by_category: BTreeMap<TagName, Vec<Vec<f64>>> = BTreeMap::new();

    for point in prepare_entries_for_serialization(entries) {
        points_by_category
            .entry(point.category)
            .or_default()
            .push(vec![point.timestamp_ms as f64, point.amount]);
    }

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Entries Over Time")
                .subtext(subtext)
                .left(20)
                .top("1%"),
        )
        .tooltip(scatter_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Time))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for (category, data) in points_by_category {
        chart = chart.series(Scatter::new().name(category.display_label()).data(data));
    }

    chart
}

/// The calendar-date prefix of a day key, e.g. `2025-10-05`.
fn date_part(day_key: &str) -> &str {
    day_key.get(..10).unwrap_or(day_key)
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

/// Creates a tooltip that unpacks a scatter point into a date and an amount.
fn scatter_tooltip() -> Tooltip {
    Tooltip::new().trigger(Trigger::Item).formatter(JsFunction::new_with_args(
        "params",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            const [timestamp, amount] = params.value;
            return params.seriesName + ': ' + currencyFormatter.format(amount)
                + ' on ' + new Date(timestamp).toLocaleDateString();",
    ))
}

/// Generates JavaScript initialization code for the page's charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
fn charts_script(charts: &[PageChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

fn page_heading(window: Option<RecencyWindow>) -> String {
    match window {
        Some(window) => format!(
            "Charts for the last {} {}",
            window.amount,
            window.unit.as_path_value()
        ),
        None => "Charts".to_owned(),
    }
}

fn charts_page_view(window: Option<RecencyWindow>, charts: &[PageChart]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CHARTS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold" { (page_heading(window)) }

            section
                id="charts"
                class="w-full mx-auto my-4"
            {
                div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
                {
                    @for chart in charts {
                        div
                            id=(chart.id)
                            class="min-h-[380px] rounded dark:bg-gray-100"
                        {}
                    }
                }
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(charts),
    ];

    base("Charts", &scripts, &content)
}

/// Renders the charts page when no entry falls within the charted range.
fn charts_no_data_view(window: Option<RecencyWindow>) -> Markup {
    let nav_bar = NavBar::new(endpoints::CHARTS_VIEW).into_html();
    let entries_link = link(endpoints::ENTRIES_VIEW, "recording some entries");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                @if window.is_some() {
                    "No entries fall within this window.
                    Try a longer window, or start " (entries_link) "."
                } @else {
                    "Charts will show up here once you start " (entries_link) "."
                }
            }
        }
    );

    base("Charts", &[], &content)
}
