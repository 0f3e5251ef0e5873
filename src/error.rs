//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{
    alert::Alert, html::error_view, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The uploaded bytes could not be parsed as CSV with a header row.
    ///
    /// The string describes what went wrong and is safe to show to the user.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCsv(String),

    /// The multipart form did not contain a CSV file.
    #[error("File is not a CSV")]
    NotCsv,

    /// The multipart form could not be read.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a file field.
    #[error("no file was uploaded")]
    NoFileUploaded,

    /// A rule needs columns that the uploaded table does not have.
    ///
    /// Only the rule that needed the columns fails, the other rules still run.
    #[error("the rule \"{rule}\" needs the column(s) {} which are missing from the upload", .columns.join(", "))]
    MissingColumns {
        /// The title of the rule that could not run.
        rule: &'static str,
        /// The missing column names, in the order the rule lists them.
        columns: Vec<String>,
    },

    /// SQLite reported a column that does not exist in the uploaded table.
    #[error("no such column: {0}")]
    MissingColumn(String),

    /// An export or analysis was requested before any file was uploaded.
    #[error("no file has been uploaded yet")]
    NoDataLoaded,

    /// A table could not be written as CSV.
    #[error("could not write CSV: {0}")]
    CsvWriteError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The columns of the uploaded table could not be read, so no rule could run.
    ///
    /// Holds the description of the underlying SQL error.
    #[error("could not read the columns of the uploaded table: {0}")]
    SchemaReadError(String),

    /// Could not acquire the lock on the analysis session.
    #[error("could not acquire the session lock")]
    SessionLockError,
}

impl Error {
    /// Whether the error means the uploaded data lacks a column a rule needs.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::MissingColumns { .. } | Error::MissingColumn(_))
    }
}

const NO_SUCH_COLUMN: &str = "no such column: ";

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(_, Some(ref desc))
                if desc.starts_with(NO_SUCH_COLUMN) =>
            {
                Error::MissingColumn(desc.trim_start_matches(NO_SUCH_COLUMN).to_owned())
            }
            // Prepare failures carry the message here instead.
            rusqlite::Error::SqlInputError { ref msg, .. } if msg.starts_with(NO_SUCH_COLUMN) => {
                Error::MissingColumn(msg.trim_start_matches(NO_SUCH_COLUMN).to_owned())
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::InvalidCsv(describe_csv_error(&value))
    }
}

fn describe_csv_error(error: &csv::Error) -> String {
    match error.kind() {
        csv::ErrorKind::Utf8 { pos, .. } => match pos {
            Some(pos) => format!("line {} is not valid UTF-8 text", pos.line()),
            None => "the file is not valid UTF-8 text".to_owned(),
        },
        _ => error.to_string(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NoDataLoaded => NotFoundError.into_response(),
            error if error.is_schema_error() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(
                    error_view(
                        "Missing Columns",
                        "422",
                        "The upload is missing columns",
                        &error.to_string(),
                    )
                    .into_string(),
                ),
            )
                .into_response(),
            Error::SessionLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidCsv(reason) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Failed to parse CSV".to_owned(),
                    details: format!(
                        "{reason}. Check that the file is comma separated text with a header row."
                    ),
                },
            ),
            Error::NotCsv => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "File type must be CSV.".to_owned(),
                },
            ),
            Error::NoFileUploaded => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Choose a CSV file to upload.".to_owned(),
                },
            ),
            Error::MultipartError(reason) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not read the upload".to_owned(),
                    details: reason,
                },
            ),
            Error::NoDataLoaded => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Nothing to export".to_owned(),
                    details: "Upload a CSV file before downloading results.".to_owned(),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
