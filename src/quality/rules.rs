//! The fixed set of data quality rules.

/// The largest difference between a stored converted amount and the amount
/// recomputed from the original amount and rate that still counts as correct.
pub const CONVERSION_TOLERANCE: f64 = 0.01;

/// Exchange rates below this are reported as outliers.
pub const MIN_PLAUSIBLE_RATE: f64 = 0.01;

/// Exchange rates above this are reported as outliers.
pub const MAX_PLAUSIBLE_RATE: f64 = 10.0;

/// The columns an uploaded transactions file is expected to have.
pub const EXPECTED_COLUMNS: [&str; 14] = [
    "id",
    "date_created",
    "sender_account",
    "receiver_account",
    "status",
    "original_amount",
    "amount",
    "sender_name",
    "receiver_name",
    "from_cur",
    "to_cur",
    "cur_rate",
    "reference",
    "type",
];

/// Identifies a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleId {
    /// Counts the nulls in every expected column.
    MissingValues,
    /// Lists transaction IDs that appear more than once.
    DuplicateTransactions,
    /// Lists transactions converted to the currency they came from.
    MismatchedCurrencies,
    /// Lists conversions whose amount does not match the exchange rate.
    IncorrectConversions,
    /// Lists transactions with an implausible exchange rate.
    ExchangeRateOutliers,
}

impl RuleId {
    /// The HTML element ID of the rule's section on the analysis page.
    pub fn html_id(self) -> &'static str {
        match self {
            RuleId::MissingValues => "missing-values",
            RuleId::DuplicateTransactions => "duplicate-transactions",
            RuleId::MismatchedCurrencies => "mismatched-currencies",
            RuleId::IncorrectConversions => "incorrect-conversions",
            RuleId::ExchangeRateOutliers => "exchange-rate-outliers",
        }
    }
}

/// A parameterless check that runs one SQL query against the uploaded table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    /// Identifies the rule.
    pub id: RuleId,
    /// The heading shown on the analysis page.
    pub title: &'static str,
    /// What a row in the rule's result means.
    pub description: &'static str,
    /// The columns the query reads. The rule fails if any are missing.
    pub required_columns: &'static [&'static str],
    /// The query, which may use the named parameters in `params`.
    pub sql: &'static str,
    /// Named parameters bound when running `sql`.
    pub params: &'static [(&'static str, f64)],
}

/// Every rule, in the order they are run and displayed.
pub static RULES: [Rule; 5] = [
    Rule {
        id: RuleId::MissingValues,
        title: "Missing Values Analysis",
        description: "The number of empty cells in each expected column.",
        required_columns: &EXPECTED_COLUMNS,
        sql: "SELECT
            COUNT(*) - COUNT(id) AS missing_id,
            COUNT(*) - COUNT(date_created) AS missing_date,
            COUNT(*) - COUNT(sender_account) AS missing_senderaccount,
            COUNT(*) - COUNT(receiver_account) AS missing_receiveraccount,
            COUNT(*) - COUNT(status) AS missing_status,
            COUNT(*) - COUNT(original_amount) AS missing_original_amount,
            COUNT(*) - COUNT(amount) AS missing_amount,
            COUNT(*) - COUNT(sender_name) AS missing_sender_name,
            COUNT(*) - COUNT(receiver_name) AS missing_receiver_name,
            COUNT(*) - COUNT(from_cur) AS missing_from_cur,
            COUNT(*) - COUNT(to_cur) AS missing_to_cur,
            COUNT(*) - COUNT(cur_rate) AS missing_cur_rate,
            COUNT(*) - COUNT(reference) AS missing_reference,
            COUNT(*) - COUNT(type) AS missing_type
        FROM transactions",
        params: &[],
    },
    Rule {
        id: RuleId::DuplicateTransactions,
        title: "Duplicate Transactions",
        description: "Transaction IDs that appear more than once and how many times they appear.",
        required_columns: &["id"],
        sql: "SELECT id, COUNT(*) AS count
        FROM transactions
        GROUP BY id
        HAVING COUNT(*) > 1",
        params: &[],
    },
    Rule {
        id: RuleId::MismatchedCurrencies,
        title: "Mismatched Currencies",
        description: "Transactions whose source and target currency are the same.",
        required_columns: &["from_cur", "to_cur"],
        sql: "SELECT *
        FROM transactions
        WHERE from_cur = to_cur",
        params: &[],
    },
    Rule {
        id: RuleId::IncorrectConversions,
        title: "Incorrect Currency Conversions",
        description: "Conversions where the amount received differs from the original amount \
            multiplied by the exchange rate by more than 0.01, largest difference first.",
        required_columns: &[
            "id",
            "sender_account",
            "receiver_account",
            "original_amount",
            "amount",
            "from_cur",
            "to_cur",
            "cur_rate",
        ],
        sql: "SELECT
            id,
            sender_account,
            receiver_account,
            original_amount,
            amount AS amount_received,
            from_cur,
            to_cur,
            cur_rate,
            ABS(original_amount * cur_rate - amount) AS conversion_difference,
            ABS(original_amount * cur_rate) AS Exchange_rate_Calculated_amount
        FROM transactions
        WHERE from_cur != to_cur
            AND ABS(original_amount * cur_rate - amount) > :tolerance
        ORDER BY conversion_difference DESC",
        params: &[(":tolerance", CONVERSION_TOLERANCE)],
    },
    Rule {
        id: RuleId::ExchangeRateOutliers,
        title: "Exchange Rate Outliers",
        description: "Transactions with an exchange rate below 0.01 or above 10.",
        required_columns: &["cur_rate"],
        sql: "SELECT *
        FROM transactions
        WHERE cur_rate < :min_rate OR cur_rate > :max_rate",
        params: &[
            (":min_rate", MIN_PLAUSIBLE_RATE),
            (":max_rate", MAX_PLAUSIBLE_RATE),
        ],
    },
];

/// Look up a rule by its ID.
pub fn rule(id: RuleId) -> &'static Rule {
    // RULES is ordered like the RuleId variants.
    &RULES[id as usize]
}

#[cfg(test)]
mod rules_tests {
    use super::{RULES, RuleId, rule};

    #[test]
    fn rules_are_in_display_order() {
        let ids: Vec<_> = RULES.iter().map(|rule| rule.id).collect();

        assert_eq!(
            ids,
            vec![
                RuleId::MissingValues,
                RuleId::DuplicateTransactions,
                RuleId::MismatchedCurrencies,
                RuleId::IncorrectConversions,
                RuleId::ExchangeRateOutliers,
            ]
        );
    }

    #[test]
    fn lookup_by_id() {
        for expected in &RULES {
            assert_eq!(rule(expected.id), expected);
        }
    }
}
