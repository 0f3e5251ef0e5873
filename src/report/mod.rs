//! The analysis page, its charts and the CSV export of rule results.

mod charts;
mod export;
mod handlers;
mod tables;

pub use export::{download_conversion_issues, to_csv};
pub use handlers::get_analysis_page;
