//! Runs the quality rules against a store.

use rusqlite::ToSql;

use crate::{
    Error,
    csv_import::Store,
    quality::rules::{RULES, Rule, RuleId},
    table::Table,
};

/// The result of running one rule.
#[derive(Debug, PartialEq)]
pub struct RuleOutcome {
    /// The rule that was run.
    pub rule: &'static Rule,
    /// The rows the rule produced, or why the rule could not run.
    pub result: Result<Table, Error>,
}

impl RuleOutcome {
    /// Whether the rule flagged anything.
    ///
    /// The missing values rule always produces one row of counts, so it only
    /// finds problems when a count is non-zero. A rule that failed to run has
    /// not found anything.
    pub fn found_problems(&self) -> bool {
        let Ok(table) = &self.result else {
            return false;
        };

        match self.rule.id {
            RuleId::MissingValues => table
                .rows
                .iter()
                .flatten()
                .any(|count| count.as_f64().is_some_and(|count| count > 0.0)),
            _ => !table.is_empty(),
        }
    }
}

/// Run every rule against `store`, in display order.
///
/// Each rule runs independently: a rule that fails does not stop the others.
/// If the columns of the uploaded table cannot be read, every rule fails with
/// an [Error::SchemaReadError].
pub fn run_all(store: &Store) -> Vec<RuleOutcome> {
    let column_names = store
        .column_names()
        .inspect_err(|error| tracing::error!("Could not read the uploaded columns: {error}"))
        .map_err(|error| error.to_string());

    run_all_with_columns(store, &column_names)
}

/// Run every rule given the result of reading the uploaded table's columns.
fn run_all_with_columns(
    store: &Store,
    column_names: &Result<Vec<String>, String>,
) -> Vec<RuleOutcome> {
    RULES
        .iter()
        .map(|rule| RuleOutcome {
            rule,
            result: match column_names {
                Ok(column_names) => run_rule(rule, store, column_names),
                Err(reason) => Err(Error::SchemaReadError(reason.clone())),
            },
        })
        .collect()
}

/// Run `rule` against `store`.
///
/// `column_names` are the columns of the uploaded table and are compared
/// with the rule's required columns exactly, including case.
///
/// # Errors
/// Returns an [Error::MissingColumns] listing every required column that is
/// absent, or the error from running the query.
pub fn run_rule(
    rule: &'static Rule,
    store: &Store,
    column_names: &[String],
) -> Result<Table, Error> {
    let missing: Vec<String> = rule
        .required_columns
        .iter()
        .filter(|required| !column_names.iter().any(|name| name == *required))
        .map(|required| (*required).to_owned())
        .collect();

    if !missing.is_empty() {
        tracing::debug!("Skipping \"{}\", missing {:?}", rule.title, missing);
        return Err(Error::MissingColumns {
            rule: rule.title,
            columns: missing,
        });
    }

    let params: Vec<(&str, &dyn ToSql)> = rule
        .params
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect();

    store
        .query(rule.sql, params.as_slice())
        .inspect_err(|error| tracing::error!("Rule \"{}\" failed: {error}", rule.title))
}
