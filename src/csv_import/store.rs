//! The in-memory SQLite database that holds the uploaded transactions.

use rusqlite::{Connection, Params, params_from_iter};

use crate::{
    Error,
    csv_import::csv::UploadedTable,
    table::{Table, Value},
};

/// The name of the table the uploaded CSV is loaded into.
pub const TRANSACTIONS_TABLE: &str = "transactions";

/// The number of rows shown in the data overview.
pub const PREVIEW_ROW_COUNT: usize = 5;

/// A queryable store holding at most one uploaded table.
///
/// Loading a new table replaces the previous one.
#[derive(Debug)]
pub struct Store {
    connection: Connection,
}

impl Store {
    /// Create an empty store backed by an in-memory SQLite database.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the database cannot be opened.
    pub fn new() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;

        Ok(Self { connection })
    }

    /// Create a store and load `table` into it.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the table cannot be created or filled.
    pub fn with_table(table: &UploadedTable) -> Result<Self, Error> {
        let mut store = Self::new()?;
        store.replace(table)?;

        Ok(store)
    }

    /// Replace the transactions table with `table`.
    ///
    /// Every column of `table` becomes a column of the same name with the
    /// SQLite type matching its inferred type. All rows are inserted in one
    /// SQL transaction, in upload order.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn replace(&mut self, table: &UploadedTable) -> Result<(), Error> {
        let column_definitions = table
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    quote_identifier(&column.name),
                    column.column_type.sql_type()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let placeholders = (1..=table.columns.len())
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.connection.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {TRANSACTIONS_TABLE};
            CREATE TABLE {TRANSACTIONS_TABLE} ({column_definitions});"
        ))?;

        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {TRANSACTIONS_TABLE} VALUES ({placeholders})"))?;

            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Loaded {} rows into the {TRANSACTIONS_TABLE} table",
            table.rows.len()
        );

        Ok(())
    }

    /// Run a read-only `sql` query with `params` bound and collect every row.
    ///
    /// # Errors
    /// Returns an [Error::MissingColumn] if the query references a column the
    /// table does not have, or an [Error::SqlError] for other SQL errors.
    pub fn query(&self, sql: &str, params: impl Params) -> Result<Table, Error> {
        let mut stmt = self.connection.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_owned())
            .collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut result_rows = stmt.query(params)?;

        while let Some(row) = result_rows.next()? {
            let values = (0..column_count)
                .map(|index| row.get_ref(index).map(Value::from))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }

        Ok(Table { columns, rows })
    }

    /// The first `limit` rows of the transactions table, in upload order.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if nothing has been loaded yet.
    pub fn preview(&self, limit: usize) -> Result<Table, Error> {
        self.query(
            &format!("SELECT * FROM {TRANSACTIONS_TABLE} ORDER BY rowid LIMIT ?1"),
            [limit as i64],
        )
    }

    /// The number of rows in the transactions table.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if nothing has been loaded yet.
    pub fn row_count(&self) -> Result<usize, Error> {
        let count: i64 = self.connection.query_row(
            &format!("SELECT COUNT(*) FROM {TRANSACTIONS_TABLE}"),
            [],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    /// The column names of the transactions table, in upload order.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn column_names(&self) -> Result<Vec<String>, Error> {
        self.connection
            .prepare(&format!("SELECT name FROM pragma_table_info('{TRANSACTIONS_TABLE}')"))?
            .query_map([], |row| row.get(0))?
            .map(|maybe_name| maybe_name.map_err(Error::from))
            .collect()
    }
}

/// Quote `name` so it can be used as an SQLite identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
