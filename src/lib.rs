//! FX Audit is a web app for checking the data quality of financial transaction exports.
//!
//! A CSV file of transactions is uploaded and loaded into an in-memory SQLite
//! table. A fixed set of SQL rules then look for missing values, duplicate
//! transactions, mismatched currencies, incorrect currency conversions and
//! implausible exchange rates. The results are served as HTML pages with
//! charts, and the incorrect conversions can be downloaded as a CSV file.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod csv_import;
mod endpoints;
mod error;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod quality;
mod report;
mod routing;
mod table;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, DEFAULT_UPLOAD_LIMIT_BYTES};
pub use csv_import::{Column, ColumnType, UploadedTable, parse_csv, parse_csv_as};
pub use error::Error;
pub use logging::logging_middleware;
pub use report::to_csv;
pub use routing::build_router;
pub use table::{Table, Value};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
