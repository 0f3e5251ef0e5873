//! CSV import
//!
//! Parses an uploaded CSV file into a typed table and loads it into the
//! in-memory store that the quality rules query.

mod csv;
mod store;
mod upload;

pub use csv::{Column, ColumnType, UploadedTable, parse_csv, parse_csv_as};
pub use store::{PREVIEW_ROW_COUNT, Store, TRANSACTIONS_TABLE};
pub use upload::{FILE_FIELD, upload_csv};
