//! DuckDB accident store
//!
//! Executes generated SQL against a DuckDB database and returns typed Polars
//! DataFrames.

use crate::reader::connection::{parse_store_uri, StoreLocation};
use crate::reader::Reader;
use crate::{DataFrame, Result, SafedriveError};
use duckdb::types::Type;
use duckdb::{params, Connection};
use polars::prelude::{Column, Series};

/// DuckDB database reader
///
/// # Examples
///
/// ```rust,ignore
/// use safedrive::reader::{Reader, DuckDBReader};
///
/// let reader = DuckDBReader::from_connection_string("duckdb://accidents.db")?;
/// let df = reader.execute("SELECT RegionName FROM REGION")?;
/// ```
pub struct DuckDBReader {
    conn: Connection,
}

impl DuckDBReader {
    /// Open the database named by a connection string
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the database
    /// file cannot be opened.
    pub fn from_connection_string(uri: &str) -> Result<Self> {
        let location = parse_store_uri(uri)?;
        let conn = match &location {
            StoreLocation::Memory => Connection::open_in_memory(),
            StoreLocation::File(path) => Connection::open(path),
        }
        .map_err(|e| SafedriveError::ReaderError(format!("Failed to open {}: {}", location, e)))?;
        tracing::debug!(%location, "Opened DuckDB store");

        Ok(Self { conn })
    }

    /// Get a reference to the underlying DuckDB connection
    ///
    /// Useful for setup statements (CREATE TABLE, INSERT, etc.)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one or more statements that return no rows
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to execute statement: {}", e)))
    }
}

/// Typed storage for one result column
enum ColumnBuilder {
    TinyInt(Vec<Option<i8>>),
    SmallInt(Vec<Option<i16>>),
    Int(Vec<Option<i32>>),
    BigInt(Vec<Option<i64>>),
    UInt(Vec<Option<i64>>),
    UBigInt(Vec<Option<u64>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Date32(Vec<Option<i32>>),
    /// Converted to Float64
    Decimal(Vec<Option<f64>>),
    /// `SUM` over integers; narrowed to i64 when it fits
    HugeInt(Vec<Option<i128>>),
    Fallback(Vec<Option<String>>),
}

impl ColumnBuilder {
    fn new(duckdb_type: &Type) -> Self {
        match duckdb_type {
            Type::TinyInt => ColumnBuilder::TinyInt(Vec::new()),
            Type::SmallInt => ColumnBuilder::SmallInt(Vec::new()),
            Type::Int => ColumnBuilder::Int(Vec::new()),
            Type::BigInt => ColumnBuilder::BigInt(Vec::new()),
            Type::UTinyInt | Type::USmallInt | Type::UInt => ColumnBuilder::UInt(Vec::new()),
            Type::UBigInt => ColumnBuilder::UBigInt(Vec::new()),
            Type::Float => ColumnBuilder::Float(Vec::new()),
            Type::Double => ColumnBuilder::Double(Vec::new()),
            Type::Boolean => ColumnBuilder::Boolean(Vec::new()),
            Type::Text => ColumnBuilder::Text(Vec::new()),
            Type::Date32 => ColumnBuilder::Date32(Vec::new()),
            Type::Decimal => ColumnBuilder::Decimal(Vec::new()),
            Type::HugeInt => ColumnBuilder::HugeInt(Vec::new()),
            _ => ColumnBuilder::Fallback(Vec::new()),
        }
    }

    fn add_value(&mut self, row: &duckdb::Row, col_idx: usize) {
        use duckdb::types::ValueRef;
        use ColumnBuilder::*;
        match self {
            TinyInt(values) => values.push(row.get(col_idx).ok()),
            SmallInt(values) => values.push(row.get(col_idx).ok()),
            Int(values) => values.push(row.get(col_idx).ok()),
            BigInt(values) => values.push(row.get(col_idx).ok()),
            UInt(values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::UTinyInt(v)) => Some(v as i64),
                    Ok(ValueRef::USmallInt(v)) => Some(v as i64),
                    Ok(ValueRef::UInt(v)) => Some(v as i64),
                    _ => None,
                };
                values.push(val);
            }
            UBigInt(values) => values.push(row.get(col_idx).ok()),
            Float(values) => values.push(row.get(col_idx).ok()),
            Double(values) => values.push(row.get(col_idx).ok()),
            Boolean(values) => values.push(row.get(col_idx).ok()),
            Text(values) => values.push(row.get(col_idx).ok()),
            Date32(values) => values.push(row.get(col_idx).ok()),
            Decimal(values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::Decimal(d)) => d.to_string().parse::<f64>().ok(),
                    Ok(ValueRef::HugeInt(i)) => Some(i as f64),
                    Ok(ValueRef::BigInt(i)) => Some(i as f64),
                    Ok(ValueRef::Int(i)) => Some(i as f64),
                    Ok(ValueRef::Double(f)) => Some(f),
                    _ => None,
                };
                values.push(val);
            }
            HugeInt(values) => values.push(row.get(col_idx).ok()),
            Fallback(values) => values.push(row.get::<_, String>(col_idx).ok()),
        }
    }

    fn build(self, column_name: &str) -> Result<Series> {
        use polars::prelude::*;
        use ColumnBuilder::*;

        let name: PlSmallStr = column_name.into();
        Ok(match self {
            TinyInt(values) => Series::new(name, values),
            SmallInt(values) => Series::new(name, values),
            Int(values) => Series::new(name, values),
            BigInt(values) => Series::new(name, values),
            UInt(values) => Series::new(name, values),
            UBigInt(values) => {
                if values.iter().flatten().all(|v| *v <= i64::MAX as u64) {
                    let narrowed: Vec<Option<i64>> =
                        values.into_iter().map(|v| v.map(|v| v as i64)).collect();
                    Series::new(name, narrowed)
                } else {
                    tracing::warn!(column = column_name, "UBigInt overflow, converting to string");
                    let text: Vec<Option<String>> =
                        values.into_iter().map(|v| v.map(|v| v.to_string())).collect();
                    Series::new(name, text)
                }
            }
            Float(values) => Series::new(name, values),
            Double(values) => Series::new(name, values),
            Boolean(values) => Series::new(name, values),
            Text(values) => Series::new(name, values),
            Date32(values) => Series::new(name, values)
                .cast(&DataType::Date)
                .map_err(|e| SafedriveError::ReaderError(format!("Date cast failed: {}", e)))?,
            Decimal(values) => Series::new(name, values),
            HugeInt(values) => {
                let fits = values
                    .iter()
                    .flatten()
                    .all(|v| *v >= i64::MIN as i128 && *v <= i64::MAX as i128);
                if fits {
                    let narrowed: Vec<Option<i64>> =
                        values.into_iter().map(|v| v.map(|v| v as i64)).collect();
                    Series::new(name, narrowed)
                } else {
                    tracing::warn!(column = column_name, "HugeInt overflow, converting to f64");
                    let wide: Vec<Option<f64>> =
                        values.into_iter().map(|v| v.map(|v| v as f64)).collect();
                    Series::new(name, wide)
                }
            }
            Fallback(values) => {
                tracing::warn!(column = column_name, "Using fallback string conversion");
                Series::new(name, values)
            }
        })
    }
}

impl Reader for DuckDBReader {
    fn execute(&self, sql: &str) -> Result<DataFrame> {
        // Scoped handle: statement and handle are released on every exit path
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to open connection: {}", e)))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to prepare SQL: {}", e)))?;

        // Run once; the result schema is read off the executed statement
        let mut rows = stmt
            .query(params![])
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to execute SQL: {}", e)))?;

        let (column_names, mut builders) = {
            let executed = rows.as_ref().ok_or_else(|| {
                SafedriveError::ReaderError("Query produced no result set".to_string())
            })?;
            let column_count = executed.column_count();
            if column_count == 0 {
                return Err(SafedriveError::ReaderError(
                    "Query returned no columns".to_string(),
                ));
            }

            let mut names = Vec::with_capacity(column_count);
            let mut builders = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let name = executed.column_name(i).map_err(|e| {
                    SafedriveError::ReaderError(format!("Failed to get column name: {}", e))
                })?;
                names.push(name.to_string());
                builders.push(ColumnBuilder::new(&Type::from(&executed.column_type(i))));
            }
            (names, builders)
        };

        while let Some(row) = rows
            .next()
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to read row: {}", e)))?
        {
            for (col_idx, builder) in builders.iter_mut().enumerate() {
                builder.add_value(row, col_idx);
            }
        }

        let columns = builders
            .into_iter()
            .zip(&column_names)
            .map(|(builder, name)| builder.build(name).map(Column::from))
            .collect::<Result<Vec<_>>>()?;

        DataFrame::new(columns)
            .map_err(|e| SafedriveError::ReaderError(format!("Failed to create DataFrame: {}", e)))
    }

    fn validate_columns(&self, sql: &str, columns: &[String]) -> Result<()> {
        let df = self.execute(sql)?;

        let schema_columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for col in columns {
            if !schema_columns.contains(col) {
                return Err(SafedriveError::ReaderError(format!(
                    "Column '{}' not found in query result. Available columns: {}",
                    col,
                    schema_columns.join(", ")
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;

    #[test]
    fn test_file_store_persists_between_readers() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("duckdb://{}", dir.path().join("accidents.db").display());

        {
            let reader = DuckDBReader::from_connection_string(&uri).unwrap();
            reader
                .execute_batch(
                    "CREATE TABLE REGION(RegionCode VARCHAR, RegionName VARCHAR);
                     INSERT INTO REGION VALUES ('R001', '서울');",
                )
                .unwrap();
        }

        let reader = DuckDBReader::from_connection_string(&uri).unwrap();
        let df = reader.execute("SELECT RegionName FROM REGION").unwrap();
        assert_eq!(df.shape(), (1, 1));
        assert_eq!(df.get_column_names(), vec!["RegionName"]);
    }

    #[test]
    fn test_rejects_non_duckdb_uri() {
        let err = DuckDBReader::from_connection_string("sqlite://accidents.db")
            .err()
            .unwrap();
        assert!(matches!(err, SafedriveError::ReaderError(_)));
    }

    #[test]
    fn test_zero_rows_is_empty_frame() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader
            .execute_batch("CREATE TABLE t(code VARCHAR, n INTEGER)")
            .unwrap();

        let df = reader.execute("SELECT code, n FROM t").unwrap();
        assert_eq!(df.shape(), (0, 2));
        assert_eq!(df.get_column_names(), vec!["code", "n"]);
    }

    #[test]
    fn test_sum_of_integers_is_narrowed() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader
            .execute_batch(
                "CREATE TABLE t(region VARCHAR, deaths INTEGER);
                 INSERT INTO t VALUES ('A', 1), ('A', 2), ('B', 5);",
            )
            .unwrap();

        let sql = "SELECT region, SUM(deaths) AS \"Value\" FROM t GROUP BY region ORDER BY region";
        let df = reader.execute(sql).unwrap();

        assert_eq!(df.shape(), (2, 2));
        let values: Vec<f64> = df
            .column("Value")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(values, vec![3.0, 5.0]);
    }

    #[test]
    fn test_count_is_integer() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let df = reader
            .execute("SELECT COUNT(*) AS \"Value\" FROM range(7)")
            .unwrap();
        assert_eq!(df.column("Value").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_each_query_runs_once_in_the_store() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader.execute_batch("CREATE SEQUENCE runs START 1").unwrap();

        // nextval advances on every execution of the statement
        let df = reader.execute("SELECT nextval('runs') AS run").unwrap();
        let first: Vec<i64> = df
            .column("run")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(first, vec![1]);

        let df = reader.execute("SELECT nextval('runs') AS run").unwrap();
        let second = df
            .column("run")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .get(0);
        assert_eq!(second, Some(2));
    }

    #[test]
    fn test_validate_columns() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let sql = "SELECT 1 as x, 2 as y";

        assert!(reader
            .validate_columns(sql, &["x".to_string(), "y".to_string()])
            .is_ok());
        let err = reader.validate_columns(sql, &["z".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Column 'z' not found"));
    }

    #[test]
    fn test_invalid_sql() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let err = reader.execute("SELECT FROM WHERE").unwrap_err();
        assert!(matches!(err, SafedriveError::ReaderError(_)));
    }

    #[test]
    fn test_handles_are_independent_of_each_query() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader.execute_batch("CREATE TABLE t(x INTEGER)").unwrap();

        assert!(reader.execute("SELECT * FROM missing_table").is_err());
        // A failed query leaves the store usable
        reader.execute_batch("INSERT INTO t VALUES (1)").unwrap();
        assert_eq!(reader.execute("SELECT x FROM t").unwrap().height(), 1);
    }
}
