//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    csv_import::upload_csv,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::{download_conversion_issues, get_analysis_page},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.upload_limit_bytes;

    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::ANALYSIS_VIEW, get(get_analysis_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .route(
            endpoints::UPLOAD,
            post(upload_csv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            endpoints::CONVERSION_ISSUES_EXPORT,
            get(download_conversion_issues),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the analysis page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::ANALYSIS_VIEW)
}
