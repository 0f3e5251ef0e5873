//! Chart generation and rendering for the analysis report.
//!
//! This module creates interactive ECharts visualizations of the upload:
//! - **Exchange Rates by Source Currency**: box plots of `cur_rate` per `from_cur`
//! - **Missing Values by Column**: the missing values counts as a bar chart
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use std::collections::HashMap;

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{AxisType, Tooltip, Trigger},
    series::{Bar, Boxplot, Scatter},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    Error,
    csv_import::{Store, TRANSACTIONS_TABLE},
    html::HeadElement,
    table::Table,
};

const RATE_CHART_TITLE: &str = "Exchange Rates by Source Currency";
const MISSING_VALUES_CHART_TITLE: &str = "Missing Values by Column";

/// Whiskers reach the furthest value within this many interquartile ranges of the box.
const WHISKER_IQR_FACTOR: f64 = 1.5;

/// A report chart with its HTML container ID and ECharts configuration.
pub(super) struct ReportChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The heading shown above the chart.
    pub title: &'static str,
    /// The ECharts configuration as a JSON string, or why the chart could not be drawn.
    pub options: Result<String, String>,
}

/// The five number summary drawn as a box plot, plus the values beyond the whiskers.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// The distribution of exchange rates for one source currency.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RateDistribution {
    pub currency: String,
    pub summary: BoxSummary,
}

/// The `q`th quantile of `sorted`, interpolating linearly between the closest ranks.
///
/// `sorted` must be non-empty and in ascending order.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Summarise `values` for a box plot, or `None` if there are no values.
pub(super) fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let reach = WHISKER_IQR_FACTOR * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);

    let within_fences = || {
        sorted
            .iter()
            .copied()
            .filter(move |value| (low_fence..=high_fence).contains(value))
    };

    // The quartiles always lie within the fences, so neither fold sees an empty iterator.
    let lower_whisker = within_fences().fold(f64::INFINITY, f64::min);
    let upper_whisker = within_fences().fold(f64::NEG_INFINITY, f64::max);

    let outliers = sorted
        .iter()
        .copied()
        .filter(|value| !(low_fence..=high_fence).contains(value))
        .collect();

    Some(BoxSummary {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// Group the exchange rates in `store` by source currency.
///
/// Currencies are in the order they first appear in the upload. Rows without
/// a currency or a numeric rate are ignored.
///
/// # Errors
/// Returns an [Error::MissingColumns] if `from_cur` or `cur_rate` is missing,
/// or an [Error::SqlError] if the query fails.
pub(super) fn rate_distributions(store: &Store) -> Result<Vec<RateDistribution>, Error> {
    let required = ["from_cur", "cur_rate"];
    let column_names = store.column_names()?;
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !column_names.iter().any(|name| name == *column))
        .map(|column| (*column).to_owned())
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingColumns {
            rule: RATE_CHART_TITLE,
            columns: missing,
        });
    }

    let table = store.query(
        &format!(
            "SELECT from_cur, cur_rate FROM {TRANSACTIONS_TABLE}
            WHERE from_cur IS NOT NULL AND cur_rate IS NOT NULL
            ORDER BY rowid"
        ),
        [],
    )?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    let rows = table
        .column_values("from_cur")
        .zip(table.column_values("cur_rate"));

    for (currency, rate) in rows {
        let Some(rate) = rate.as_f64() else {
            continue;
        };
        let currency = currency.to_string();

        let position = *positions.entry(currency.clone()).or_insert_with(|| {
            groups.push((currency, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(rate);
    }

    Ok(groups
        .into_iter()
        .filter_map(|(currency, rates)| {
            box_summary(&rates).map(|summary| RateDistribution { currency, summary })
        })
        .collect())
}

/// The labels and values of the missing values bar chart.
///
/// These are the column names and the single row of the missing values result.
pub(super) fn missing_values_series(missing_values: &Table) -> (Vec<String>, Vec<f64>) {
    let values = missing_values
        .rows
        .first()
        .map(|row| {
            row.iter()
                .map(|count| count.as_f64().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    (missing_values.columns.clone(), values)
}

pub(super) fn rate_chart(distributions: &[RateDistribution]) -> Chart {
    let labels: Vec<String> = distributions
        .iter()
        .map(|distribution| distribution.currency.clone())
        .collect();

    let boxes: Vec<Vec<f64>> = distributions
        .iter()
        .map(|distribution| {
            let summary = &distribution.summary;
            vec![
                summary.lower_whisker,
                summary.q1,
                summary.median,
                summary.q3,
                summary.upper_whisker,
            ]
        })
        .collect();

    let outliers: Vec<Vec<f64>> = distributions
        .iter()
        .enumerate()
        .flat_map(|(index, distribution)| {
            distribution
                .summary
                .outliers
                .iter()
                .map(move |rate| vec![index as f64, *rate])
        })
        .collect();

    Chart::new()
        .title(Title::new().text(RATE_CHART_TITLE))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name("Source Currency")
                .data(labels),
        )
        .y_axis(Axis::new().type_(AxisType::Value).name("Exchange Rate"))
        .series(Boxplot::new().name("Exchange Rate").data(boxes))
        .series(Scatter::new().name("Outlier").data(outliers))
}

pub(super) fn missing_values_chart(missing_values: &Table) -> Chart {
    let (labels, values) = missing_values_series(missing_values);

    Chart::new()
        .title(Title::new().text(MISSING_VALUES_CHART_TITLE))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name("Columns")
                .data(labels),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .name("Number of Missing Values"),
        )
        .series(Bar::new().name("Missing Values").data(values))
}

/// Build both report charts.
///
/// `missing_values` is the result of the missing values rule so that the bar
/// chart always shows the same counts as the table above it.
pub(super) fn report_charts(
    store: &Store,
    missing_values: Result<&Table, &Error>,
) -> [ReportChart; 2] {
    let rate_options = rate_distributions(store)
        .inspect_err(|error| tracing::debug!("Skipping exchange rate chart: {error}"))
        .map(|distributions| rate_chart(&distributions).to_string())
        .map_err(|error| error.to_string());

    let missing_options = missing_values
        .map(|table| missing_values_chart(table).to_string())
        .map_err(|error| error.to_string());

    [
        ReportChart {
            id: "exchange-rate-chart",
            title: RATE_CHART_TITLE,
            options: rate_options,
        },
        ReportChart {
            id: "missing-values-chart",
            title: MISSING_VALUES_CHART_TITLE,
            options: missing_options,
        },
    ]
}

/// Renders the HTML containers for report charts.
///
/// Charts that could not be drawn show the reason instead.
pub(super) fn charts_view(charts: &[ReportChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            h2 class="text-2xl font-bold mb-4" { "Visualization" }

            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    @match &chart.options {
                        Ok(_) => {
                            div
                                id=(chart.id)
                                class="min-h-[380px] rounded dark:bg-gray-100"
                            {}
                        }
                        Err(error) => {
                            div
                                id=(chart.id)
                                class="p-4 rounded border border-gray-200 dark:border-gray-700"
                            {
                                h3 class="text-lg font-semibold mb-2" { (chart.title) }
                                p class="text-sm text-red-600 dark:text-red-400" { (error) }
                            }
                        }
                    }
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for report charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing. Charts that could not be drawn are skipped.
pub(super) fn charts_script(charts: &[ReportChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .filter_map(|chart| {
            chart.options.as_ref().ok().map(|options| {
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
                    chart.id, options
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}
