//! Data store abstraction layer
//!
//! Chart strategies never talk to a database directly: they hand generated SQL
//! to a [`Reader`] and get a Polars DataFrame back.
//!
//! # Example
//!
//! ```rust,ignore
//! use safedrive::reader::{Reader, DuckDBReader};
//!
//! let reader = DuckDBReader::from_connection_string("duckdb://memory")?;
//! let df = reader.execute("SELECT RegionName FROM REGION")?;
//! ```

use crate::{DataFrame, Result};

#[cfg(feature = "duckdb")]
pub mod dataset;
#[cfg(feature = "duckdb")]
pub mod duckdb;

pub mod connection;

#[cfg(feature = "duckdb")]
pub use duckdb::DuckDBReader;

/// Trait for accident store readers
///
/// Implementations must release whatever connection resources a query
/// acquires before returning, on success and on failure.
pub trait Reader {
    /// Execute a SQL query and return the result as a DataFrame
    ///
    /// A query matching no rows returns an empty DataFrame with the selected
    /// columns, not an error.
    ///
    /// # Errors
    ///
    /// Returns `SafedriveError::ReaderError` if the SQL is invalid, the
    /// connection fails or a referenced table or column does not exist.
    fn execute(&self, sql: &str) -> Result<DataFrame>;

    /// Validate that specified columns exist in a query result
    fn validate_columns(&self, sql: &str, columns: &[String]) -> Result<()>;
}
