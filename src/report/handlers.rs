//! Analysis page HTTP handler and view rendering.
//!
//! This module contains:
//! - The route handler for displaying the analysis page
//! - HTML view functions for the upload form, the data overview and the rule sections
//! - The state type shared by the report handlers

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    app_state::{AnalysisSession, SessionSlot, lock_session},
    csv_import::{FILE_FIELD, PREVIEW_ROW_COUNT},
    endpoints,
    html::{
        BADGE_OK_STYLE, BADGE_WARNING_STYLE, BUTTON_PRIMARY_STYLE, ECHARTS_URL,
        FORM_FILE_INPUT_STYLE, FORM_LABEL_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base,
        format_count, link, loading_spinner,
    },
    navigation::NavBar,
    quality::{RuleId, RuleOutcome, run_all},
    report::{
        charts::{ReportChart, charts_script, charts_view, report_charts},
        export::EXPORT_FILE_NAME,
        tables::result_table_view,
    },
    table::Table,
};

const LOADED_AT_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

/// The state needed for displaying the analysis page and exporting results.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The current analysis session, if a file has been uploaded.
    pub session: SessionSlot,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
        }
    }
}

/// Holds everything needed to render the analysis of an upload.
struct AnalysisReport<'a> {
    file_name: &'a str,
    loaded_at: OffsetDateTime,
    row_count: usize,
    column_count: usize,
    preview: Table,
    outcomes: Vec<RuleOutcome>,
    charts: [ReportChart; 2],
}

/// Display the upload form and, if a file has been uploaded, its analysis.
///
/// Every rule is run again for each request.
pub async fn get_analysis_page(State(state): State<ReportState>) -> Result<Response, Error> {
    let session = lock_session(&state.session)?;
    let nav_bar = NavBar::new(endpoints::ANALYSIS_VIEW);

    match session.as_ref() {
        Some(session) => {
            let report = build_report(session)?;
            Ok(analysis_view(nav_bar, Some(&report)).into_response())
        }
        None => Ok(analysis_view(nav_bar, None).into_response()),
    }
}

/// Runs the rules and builds the charts for `session`.
///
/// # Errors
/// Returns an [Error::SqlError] if the overview cannot be read from the store.
/// Rule failures are kept in the report instead.
fn build_report(session: &AnalysisSession) -> Result<AnalysisReport<'_>, Error> {
    let store = &session.store;
    let preview = store.preview(PREVIEW_ROW_COUNT)?;
    let row_count = store.row_count()?;
    let outcomes = run_all(store);

    // Outcomes are in the same order as the RuleId variants.
    let missing_values = &outcomes[RuleId::MissingValues as usize];
    let charts = report_charts(store, missing_values.result.as_ref());

    Ok(AnalysisReport {
        file_name: &session.file_name,
        loaded_at: session.loaded_at,
        row_count,
        column_count: preview.columns.len(),
        preview,
        outcomes,
        charts,
    })
}

fn analysis_view(nav_bar: NavBar, report: Option<&AnalysisReport>) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl space-y-8"
            {
                h1 class="text-3xl font-bold" { "Financial Data Analysis Dashboard" }

                (upload_form_view())

                @match report {
                    Some(report) => {
                        (overview_view(report))

                        @for outcome in &report.outcomes {
                            (rule_section_view(outcome))
                        }

                        (charts_view(&report.charts))
                    }
                    None => {
                        p id="upload-prompt" class="text-gray-600 dark:text-gray-400"
                        {
                            "Please upload a CSV file to begin the analysis."
                        }
                    }
                }
            }
        }
    };

    let head_elements = match report {
        Some(report) => vec![
            HeadElement::ScriptLink(ECHARTS_URL.to_owned()),
            charts_script(&report.charts),
        ],
        None => vec![],
    };

    base("Analysis", &head_elements, &content)
}

fn upload_form_view() -> Markup {
    let spinner = loading_spinner();

    html! {
        form
            hx-post=(endpoints::UPLOAD)
            enctype="multipart/form-data"
            hx-disabled-elt="#file, #submit-button"
            hx-indicator="#indicator"
            hx-swap="none"
            hx-target-error="#alert-container"
            class="max-w-md space-y-4"
        {
            div
            {
                label for="file" class=(FORM_LABEL_STYLE)
                {
                    "Choose a CSV file"
                }

                input
                    id="file"
                    type="file"
                    name=(FILE_FIELD)
                    accept=".csv,text/csv"
                    required
                    class=(FORM_FILE_INPUT_STYLE);
            }

            button
                type="submit"
                id="submit-button"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (spinner) }
                " Upload"
            }
        }
    }
}

fn overview_view(report: &AnalysisReport) -> Markup {
    let loaded_at = report
        .loaded_at
        .format(LOADED_AT_FORMAT)
        .unwrap_or_else(|_| report.loaded_at.to_string());

    html! {
        section id="data-overview" class="space-y-4"
        {
            h2 class="text-2xl font-bold" { "Data Overview" }

            p class="text-sm text-gray-600 dark:text-gray-400"
            {
                span class="font-semibold" { (report.file_name) }
                " with " (format_count(report.row_count)) " rows and "
                (report.column_count) " columns, uploaded " (loaded_at) "."
            }

            (result_table_view(&report.preview, "The file has no rows."))
        }
    }
}

fn rule_section_view(outcome: &RuleOutcome) -> Markup {
    let rule = outcome.rule;

    html! {
        section id=(rule.id.html_id()) class="space-y-4"
        {
            div class="flex items-center gap-3"
            {
                h2 class="text-2xl font-bold" { (rule.title) }
                (finding_badge(outcome))
            }

            p class="text-sm text-gray-600 dark:text-gray-400" { (rule.description) }

            @match &outcome.result {
                Ok(table) => {
                    (result_table_view(table, "No problems found."))

                    @if rule.id == RuleId::IncorrectConversions {
                        p class="text-sm"
                        {
                            (link(endpoints::CONVERSION_ISSUES_EXPORT, "Download Currency Conversion Issues"))
                            " (" (EXPORT_FILE_NAME) ")"
                        }
                    }
                }
                Err(error) => {
                    div
                        role="alert"
                        class="p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
                    {
                        p class="font-medium" { "This check could not be run." }
                        p { (error) }
                    }
                }
            }
        }
    }
}

fn finding_badge(outcome: &RuleOutcome) -> Markup {
    match &outcome.result {
        Err(_) => html! {
            span class=(BADGE_WARNING_STYLE) { "Not run" }
        },
        Ok(_) if outcome.found_problems() => html! {
            span class=(BADGE_WARNING_STYLE) { "Problems found" }
        },
        Ok(_) => html! {
            span class=(BADGE_OK_STYLE) { "OK" }
        },
    }
}
