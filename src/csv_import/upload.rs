use std::time::Instant;

use axum::{
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    app_state::{AnalysisSession, SessionSlot, lock_session},
    csv_import::{Store, parse_csv},
    endpoints,
    html::format_count,
};

/// The name of the multipart form field that holds the CSV file.
pub const FILE_FIELD: &str = "file";

/// The state needed for uploading a CSV file.
#[derive(Debug, Clone)]
pub struct UploadState {
    /// The slot that the new analysis session replaces.
    pub session: SessionSlot,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
        }
    }
}

/// Route handler for uploading a CSV file of transactions.
///
/// On success the uploaded table replaces the current analysis session and
/// the client is redirected to the analysis page. On failure an alert is
/// returned and the current session, if any, is left untouched.
pub async fn upload_csv(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let start_time = Instant::now();

    let (file_name, data) = read_file_field(&mut multipart)
        .await
        .map_err(|error| error.into_alert_response())?;

    let table = parse_csv(&data)
        .inspect_err(|error| tracing::debug!("Failed to parse CSV '{file_name}': {error}"))
        .map_err(|error| error.into_alert_response())?;

    let store = Store::with_table(&table)
        .inspect_err(|error| tracing::error!("Failed to load '{file_name}': {error}"))
        .map_err(|error| error.into_alert_response())?;

    let row_count = table.rows.len();
    let column_count = table.columns.len();

    {
        let mut session = lock_session(&state.session).map_err(Error::into_alert_response)?;

        *session = Some(AnalysisSession {
            file_name: file_name.clone(),
            store,
            loaded_at: OffsetDateTime::now_utc(),
        });
    }

    tracing::info!(
        "Loaded '{file_name}' with {} rows and {column_count} columns in {}ms",
        format_count(row_count),
        start_time.elapsed().as_millis()
    );

    Ok((
        StatusCode::SEE_OTHER,
        HxRedirect(endpoints::ANALYSIS_VIEW.to_owned()),
        (),
    )
        .into_response())
}

/// Find the file field and read its name and contents.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), Error> {
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::error!("Could not read multipart form: {error}");
        Error::MultipartError(error.body_text())
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        return read_csv_field(field).await;
    }

    Err(Error::NoFileUploaded)
}

async fn read_csv_field(field: Field<'_>) -> Result<(String, Vec<u8>), Error> {
    let file_name = field.file_name().unwrap_or_default().to_owned();

    if file_name.is_empty() {
        return Err(Error::NoFileUploaded);
    }

    if !is_csv(field.content_type(), &file_name) {
        tracing::debug!(
            "Rejected '{file_name}' with content type {:?}",
            field.content_type()
        );
        return Err(Error::NotCsv);
    }

    let data = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })?;

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    Ok((file_name, data.to_vec()))
}

/// Browsers do not agree on the content type of CSV files, so the extension
/// is accepted as well.
fn is_csv(content_type: Option<&str>, file_name: &str) -> bool {
    content_type == Some("text/csv") || file_name.to_lowercase().ends_with(".csv")
}

#[cfg(test)]
mod upload_csv_tests {
    use axum::{extract::State, http::StatusCode};

    use crate::{
        AppState,
        app_state::lock_session,
        csv_import::upload::{UploadState, is_csv, upload_csv},
        endpoints,
        test_utils::{assert_hx_redirect, must_make_multipart, parse_html_fragment},
    };

    const CSV: &str = "id,from_cur,to_cur,cur_rate\n1,USD,EUR,0.9\n2,EUR,EUR,1.0\n";

    fn must_get_state() -> UploadState {
        UploadState {
            session: AppState::default().session,
        }
    }

    #[tokio::test]
    async fn upload_replaces_session_and_redirects() {
        let state = must_get_state();
        let multipart = must_make_multipart("transactions.csv", "text/csv", CSV).await;

        let response = upload_csv(State(state.clone()), multipart)
            .await
            .expect("Upload failed");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::ANALYSIS_VIEW);

        let session = lock_session(&state.session).unwrap();
        let session = session.as_ref().expect("Session was not set");
        assert_eq!(session.file_name, "transactions.csv");
        assert_eq!(session.store.row_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn second_upload_replaces_first() {
        let state = must_get_state();
        let first = must_make_multipart("first.csv", "text/csv", CSV).await;
        let second = must_make_multipart("second.csv", "text/csv", "id\n1\n").await;

        upload_csv(State(state.clone()), first).await.unwrap();
        upload_csv(State(state.clone()), second).await.unwrap();

        let session = lock_session(&state.session).unwrap();
        let session = session.as_ref().unwrap();
        assert_eq!(session.file_name, "second.csv");
        assert_eq!(session.store.column_names().unwrap(), vec!["id"]);
    }

    #[tokio::test]
    async fn invalid_csv_keeps_previous_session() {
        let state = must_get_state();
        let good = must_make_multipart("good.csv", "text/csv", CSV).await;
        let bad = must_make_multipart("bad.csv", "text/csv", "id,from_cur\n1,USD,EUR\n").await;

        upload_csv(State(state.clone()), good).await.unwrap();
        let response = upload_csv(State(state.clone()), bad)
            .await
            .expect_err("Want error for malformed CSV");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let message = html
            .select(&scraper::Selector::parse("#alert-container p.font-medium").unwrap())
            .next()
            .expect("No alert message");
        assert_eq!(message.text().collect::<String>(), "Failed to parse CSV");

        let session = lock_session(&state.session).unwrap();
        assert_eq!(session.as_ref().unwrap().file_name, "good.csv");
    }

    #[tokio::test]
    async fn rejects_non_csv_files() {
        let state = must_get_state();
        let multipart = must_make_multipart("report.pdf", "application/pdf", "foo").await;

        let response = upload_csv(State(state.clone()), multipart)
            .await
            .expect_err("Want error for PDF upload");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(lock_session(&state.session).unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_form_without_file() {
        let state = must_get_state();
        let multipart = must_make_multipart("", "application/octet-stream", "").await;

        let response = upload_csv(State(state), multipart)
            .await
            .expect_err("Want error for empty file field");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn accepts_csv_by_content_type_or_extension() {
        assert!(is_csv(Some("text/csv"), "data"));
        assert!(is_csv(Some("application/vnd.ms-excel"), "Data.CSV"));
        assert!(!is_csv(Some("text/plain"), "data.txt"));
        assert!(!is_csv(None, "data"));
    }
}
