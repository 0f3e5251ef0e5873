//! CSV export of the incorrect currency conversions.

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    app_state::lock_session,
    quality::{RuleId, rule, run_rule},
    report::handlers::ReportState,
    table::Table,
};

/// The file name the incorrect currency conversions are downloaded as.
pub const EXPORT_FILE_NAME: &str = "currency_conversion_issues.csv";

/// Serialize `table` as comma separated text with a header row.
///
/// The output only depends on the table's columns and rows: nulls are empty
/// fields and numbers are written so that [crate::csv_import::parse_csv]
/// infers the same types when the text is read back.
///
/// # Errors
/// Returns an [Error::CsvWriteError] if the CSV writer fails.
pub fn to_csv(table: &Table) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&table.columns)
        .map_err(|error| Error::CsvWriteError(error.to_string()))?;

    for row in &table.rows {
        writer
            .write_record(row.iter().map(|value| value.to_csv_field()))
            .map_err(|error| Error::CsvWriteError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvWriteError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvWriteError(error.to_string()))
}

/// Route handler for downloading the incorrect currency conversions as a CSV file.
///
/// The rule is run again for every download so the file always matches the
/// current upload.
pub async fn download_conversion_issues(
    State(state): State<ReportState>,
) -> Result<Response, Error> {
    let session = lock_session(&state.session)?;
    let session = session.as_ref().ok_or(Error::NoDataLoaded)?;

    let column_names = session.store.column_names()?;
    let table = run_rule(
        rule(RuleId::IncorrectConversions),
        &session.store,
        &column_names,
    )?;
    let csv = to_csv(&table)?;

    tracing::debug!(
        "Exporting {} incorrect conversions from '{}'",
        table.len(),
        session.file_name
    );

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod to_csv_tests {
    use crate::{
        csv_import::{ColumnType, Store, parse_csv, parse_csv_as},
        quality::{RuleId, rule, run_rule},
        report::export::to_csv,
        table::{Table, Value},
    };

    #[test]
    fn writes_header_and_rows() {
        let table = Table {
            columns: vec!["id".to_owned(), "reference".to_owned(), "rate".to_owned()],
            rows: vec![
                vec![
                    Value::Integer(1),
                    Value::Text("a, \"quoted\" ref".to_owned()),
                    Value::Real(90.0),
                ],
                vec![Value::Integer(2), Value::Null, Value::Real(0.5)],
            ],
        };

        let csv = to_csv(&table).unwrap();

        assert_eq!(
            csv,
            "id,reference,rate\n1,\"a, \"\"quoted\"\" ref\",90.0\n2,,0.5\n"
        );
    }

    #[test]
    fn empty_table_is_header_only() {
        let table = Table {
            columns: vec!["id".to_owned(), "count".to_owned()],
            rows: vec![],
        };

        assert_eq!(to_csv(&table).unwrap(), "id,count\n");
    }

    #[test]
    fn export_parses_back_to_same_table() {
        let upload = parse_csv(
            "id,sender_account,receiver_account,original_amount,amount,from_cur,to_cur,cur_rate\n\
            1,A1,B1,100,95,USD,EUR,0.9\n\
            2,A2,B2,200,150,GBP,USD,1.25\n\
            3,A3,B3,50,45,EUR,GBP,0.9\n\
            4,A4,,10,7,EUR,JPY,0.5\n"
                .as_bytes(),
        )
        .unwrap();
        let store = Store::with_table(&upload).unwrap();
        let column_names = store.column_names().unwrap();
        let issues = run_rule(rule(RuleId::IncorrectConversions), &store, &column_names).unwrap();
        assert_eq!(issues.len(), 3);

        let exported = to_csv(&issues).unwrap();
        let parsed = parse_csv(exported.as_bytes()).unwrap();

        let parsed_columns: Vec<String> = parsed
            .columns
            .iter()
            .map(|column| column.name.clone())
            .collect();
        assert_eq!(parsed_columns, issues.columns);
        assert_eq!(parsed.rows, issues.rows);
    }

    #[test]
    fn numeric_looking_text_reads_back_as_text() {
        let upload = parse_csv(
            "id,sender_account,receiver_account,original_amount,amount,from_cur,to_cur,cur_rate\n\
            1,ACC-1,B1,100,90,USD,EUR,0.9\n\
            2,ACC-2,B2,200,180,USD,EUR,0.9\n\
            3,12345,B3,50,30,EUR,GBP,0.9\n"
                .as_bytes(),
        )
        .unwrap();
        let store = Store::with_table(&upload).unwrap();
        let column_names = store.column_names().unwrap();
        let issues = run_rule(rule(RuleId::IncorrectConversions), &store, &column_names).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.rows[0][1], Value::Text("12345".to_owned()));

        let exported = to_csv(&issues).unwrap();
        let column_types = issues.column_types();
        assert_eq!(column_types[1], ColumnType::Text);
        let parsed = parse_csv_as(exported.as_bytes(), &column_types).unwrap();

        assert_eq!(parsed.rows, issues.rows);
    }

    #[test]
    fn reading_back_needs_one_type_per_column() {
        let result = parse_csv_as(b"id,amount\n1,2\n", &[ColumnType::Integer]);

        assert!(result.is_err(), "want error, got {result:?}");
    }

    #[test]
    fn export_is_deterministic() {
        let table = Table {
            columns: vec!["id".to_owned(), "conversion_difference".to_owned()],
            rows: vec![vec![Value::Integer(1), Value::Real(5.000000000000001)]],
        };

        assert_eq!(to_csv(&table).unwrap(), to_csv(&table).unwrap());
    }
}
