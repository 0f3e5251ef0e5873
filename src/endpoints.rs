//! The API endpoints URIs.

/// The root route which redirects to the analysis page.
pub const ROOT: &str = "/";
/// The page with the upload form and the analysis of the uploaded file.
pub const ANALYSIS_VIEW: &str = "/analysis";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route to upload a CSV file for analysis.
pub const UPLOAD: &str = "/api/upload";
/// The route to download the incorrect currency conversions as CSV.
pub const CONVERSION_ISSUES_EXPORT: &str = "/api/export/currency_conversion_issues.csv";
