//! Data quality rules
//!
//! A fixed, ordered list of SQL checks run against the uploaded transactions.

mod engine;
mod rules;

pub use engine::{RuleOutcome, run_all, run_rule};
pub use rules::{RuleId, rule};
