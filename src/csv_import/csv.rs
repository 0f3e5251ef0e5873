//! Parses uploaded CSV bytes into a typed table.
//!
//! Column types are inferred the way a dataframe library would: mostly numeric
//! columns become numbers and their stray non-numeric cells become nulls.

use std::collections::HashSet;

use crate::{Error, table::Value};

/// Cell contents, compared after trimming whitespace, that are read as missing values.
const MISSING_VALUE_MARKERS: [&str; 11] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// The storage type inferred for an uploaded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every numeric cell is a whole number.
    Integer,
    /// Numeric, with at least one fractional number.
    Real,
    /// Everything else, values are kept verbatim.
    Text,
}

impl ColumnType {
    /// The SQLite type name used when creating the column.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The column name from the header row.
    pub name: String,
    /// The inferred type.
    pub column_type: ColumnType,
}

/// The transactions table decoded from an upload, in upload order.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedTable {
    /// The columns in header order.
    pub columns: Vec<Column>,
    /// The rows, each with exactly one value per column.
    pub rows: Vec<Vec<Value>>,
}

/// Parses `bytes` as comma separated UTF-8 text with a header row.
///
/// Header names are kept verbatim, except that blank names become
/// `Unnamed: <index>` and repeated names get a `.<n>` suffix. Blank lines are
/// skipped and records with fewer fields than the header are padded with nulls.
///
/// # Errors
/// Returns [Error::InvalidCsv] if the text is not valid UTF-8, there is no
/// header row, or a record has more fields than the header.
pub fn parse_csv(bytes: &[u8]) -> Result<UploadedTable, Error> {
    let (names, raw_rows) = read_records(bytes)?;

    let column_types: Vec<ColumnType> = (0..names.len())
        .map(|index| infer_column_type(raw_rows.iter().map(|row| row[index].as_deref())))
        .collect();

    Ok(build_table(names, raw_rows, column_types))
}

/// Parses `bytes` like [parse_csv], but with the given type for each column
/// instead of inferring one.
///
/// Use this to read back a file whose column types are already known, such
/// as an export of a [Table](crate::table::Table). A text column keeps cells
/// like `12345` as text, which inference would read as a number.
///
/// # Errors
/// Returns [Error::InvalidCsv] for the same reasons as [parse_csv], or if the
/// number of column types does not match the number of columns.
pub fn parse_csv_as(bytes: &[u8], column_types: &[ColumnType]) -> Result<UploadedTable, Error> {
    let (names, raw_rows) = read_records(bytes)?;

    if column_types.len() != names.len() {
        return Err(Error::InvalidCsv(format!(
            "expected {} columns, saw {}",
            column_types.len(),
            names.len()
        )));
    }

    Ok(build_table(names, raw_rows, column_types.to_vec()))
}

/// Reads the deduplicated header names and the raw cells of every record.
fn read_records(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<Option<String>>>), Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header = reader.headers()?.clone();

    if header.is_empty() || (header.len() == 1 && header[0].trim().is_empty()) {
        return Err(Error::InvalidCsv("no columns to parse from file".to_owned()));
    }

    let names = deduplicate_names(header.iter());
    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();

    for record in reader.records() {
        let record = record?;

        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        if record.len() > names.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(Error::InvalidCsv(format!(
                "expected {} fields on line {line}, saw {}",
                names.len(),
                record.len()
            )));
        }

        let mut row: Vec<Option<String>> = record.iter().map(read_cell).collect();
        row.resize(names.len(), None);
        raw_rows.push(row);
    }

    Ok((names, raw_rows))
}

fn build_table(
    names: Vec<String>,
    raw_rows: Vec<Vec<Option<String>>>,
    column_types: Vec<ColumnType>,
) -> UploadedTable {
    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&column_types)
                .map(|(cell, column_type)| convert_cell(cell, *column_type))
                .collect()
        })
        .collect();

    let columns = names
        .into_iter()
        .zip(column_types)
        .map(|(name, column_type)| Column { name, column_type })
        .collect();

    let table = UploadedTable { columns, rows };

    tracing::debug!(
        "Parsed CSV with {} columns and {} rows",
        table.columns.len(),
        table.rows.len()
    );

    table
}

fn read_cell(field: &str) -> Option<String> {
    if MISSING_VALUE_MARKERS.contains(&field.trim()) {
        None
    } else {
        Some(field.to_owned())
    }
}

/// Makes every column name unique, comparing case-insensitively like SQLite does.
fn deduplicate_names<'a>(header: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for (index, name) in header.enumerate() {
        let base_name = if name.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            name.to_owned()
        };

        let mut candidate = base_name.clone();
        let mut suffix = 1;

        while !seen.insert(candidate.to_lowercase()) {
            candidate = format!("{base_name}.{suffix}");
            suffix += 1;
        }

        names.push(candidate);
    }

    names
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn infer_column_type<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> ColumnType {
    let mut present = 0;
    let mut numeric = 0;
    let mut all_integers = true;

    for cell in cells.flatten() {
        present += 1;

        if parse_number(cell).is_some() {
            numeric += 1;
            all_integers &= cell.trim().parse::<i64>().is_ok();
        }
    }

    if numeric == 0 || numeric * 2 <= present {
        ColumnType::Text
    } else if all_integers {
        ColumnType::Integer
    } else {
        ColumnType::Real
    }
}

fn convert_cell(cell: Option<String>, column_type: ColumnType) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };

    match column_type {
        ColumnType::Text => Value::Text(text),
        ColumnType::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or(Value::Null),
        ColumnType::Real => parse_number(&text).map(Value::Real).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod parse_csv_tests {
    use crate::{
        Error,
        csv_import::csv::{ColumnType, parse_csv},
        table::Value,
    };

    fn column_names(csv: &str) -> Vec<String> {
        parse_csv(csv.as_bytes())
            .expect("Could not parse CSV")
            .columns
            .into_iter()
            .map(|column| column.name)
            .collect()
    }

    #[test]
    fn keeps_header_names_verbatim() {
        let names = column_names("id, From_Cur ,to_cur\n1,USD,EUR\n");

        assert_eq!(names, vec!["id", " From_Cur ", "to_cur"]);
    }

    #[test]
    fn renames_blank_and_duplicate_headers() {
        let names = column_names("id,,ID,id\n1,2,3,4\n");

        assert_eq!(names, vec!["id", "Unnamed: 1", "ID.1", "id.2"]);
    }

    #[test]
    fn infers_column_types() {
        let table = parse_csv(
            "id,original_amount,from_cur\n\
            1,100,USD\n\
            2,12.5,EUR\n"
                .as_bytes(),
        )
        .unwrap();

        let types: Vec<_> = table.columns.iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Real, ColumnType::Text]
        );
        assert_eq!(
            table.rows[0],
            vec![
                Value::Integer(1),
                Value::Real(100.0),
                Value::Text("USD".to_owned())
            ]
        );
    }

    #[test]
    fn non_numeric_cells_in_numeric_column_become_null() {
        let table = parse_csv("cur_rate\n0.9\n1.1\nabc\n0.5\n".as_bytes()).unwrap();

        assert_eq!(table.columns[0].column_type, ColumnType::Real);
        assert_eq!(table.rows[2], vec![Value::Null]);
    }

    #[test]
    fn mostly_text_column_stays_text() {
        let table = parse_csv("reference\nINV-1\n42\nINV-3\n".as_bytes()).unwrap();

        assert_eq!(table.columns[0].column_type, ColumnType::Text);
        assert_eq!(table.rows[1], vec![Value::Text("42".to_owned())]);
    }

    #[test]
    fn missing_value_markers_become_null() {
        let table = parse_csv("status,amount\nNA,\n ,NaN\nok,3\n".as_bytes()).unwrap();

        assert_eq!(table.rows[0], vec![Value::Null, Value::Null]);
        assert_eq!(table.rows[1], vec![Value::Null, Value::Null]);
        assert_eq!(
            table.rows[2],
            vec![Value::Text("ok".to_owned()), Value::Integer(3)]
        );
    }

    #[test]
    fn pads_short_records_with_null() {
        let table = parse_csv("id,from_cur,to_cur\n1,USD\n".as_bytes()).unwrap();

        assert_eq!(
            table.rows[0],
            vec![Value::Integer(1), Value::Text("USD".to_owned()), Value::Null]
        );
    }

    #[test]
    fn rejects_records_with_extra_fields() {
        let result = parse_csv("id,from_cur\n1,USD\n2,EUR,GBP\n".as_bytes());

        assert_eq!(
            result,
            Err(Error::InvalidCsv(
                "expected 2 fields on line 3, saw 3".to_owned()
            ))
        );
    }

    #[test]
    fn header_only_file_has_columns_and_no_rows() {
        let table = parse_csv("id,from_cur,cur_rate\n".as_bytes()).unwrap();

        assert_eq!(column_names("id,from_cur,cur_rate\n"), vec!["id", "from_cur", "cur_rate"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn rejects_empty_input() {
        let result = parse_csv(b"");

        assert!(
            matches!(result, Err(Error::InvalidCsv(_))),
            "want InvalidCsv, got {result:?}"
        );
    }

    #[test]
    fn rejects_invalid_utf8() {
        let result = parse_csv(b"id,name\n1,\xff\xfe\n");

        assert!(
            matches!(result, Err(Error::InvalidCsv(_))),
            "want InvalidCsv, got {result:?}"
        );
    }

    #[test]
    fn skips_blank_lines_and_strips_bom() {
        let table = parse_csv("\u{feff}id\n1\n\n2\n".as_bytes()).unwrap();

        assert_eq!(table.columns[0].name, "id");
        assert_eq!(table.rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
    }
}
