//! Where the accident store lives
//!
//! The `--reader` flag takes a `duckdb://` URI. `duckdb://memory` is a fresh
//! in-memory database; anything else after the scheme is a file path, with
//! `duckdb:///abs/path.db` for absolute paths.

use crate::{Result, SafedriveError};
use std::fmt;
use std::path::PathBuf;

const DUCKDB_SCHEME: &str = "duckdb://";

/// Location of a DuckDB accident store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Memory => write!(f, "{}memory", DUCKDB_SCHEME),
            StoreLocation::File(path) => write!(f, "{}{}", DUCKDB_SCHEME, path.display()),
        }
    }
}

/// Parse a `duckdb://` store URI
///
/// ```
/// use safedrive::reader::connection::{parse_store_uri, StoreLocation};
///
/// assert_eq!(parse_store_uri("duckdb://memory").unwrap(), StoreLocation::Memory);
/// assert_eq!(
///     parse_store_uri("duckdb://accidents.db").unwrap(),
///     StoreLocation::File("accidents.db".into())
/// );
/// ```
pub fn parse_store_uri(uri: &str) -> Result<StoreLocation> {
    let rest = uri.trim().strip_prefix(DUCKDB_SCHEME).ok_or_else(|| {
        SafedriveError::ReaderError(format!(
            "Unsupported store URI '{}': expected duckdb://memory or duckdb://<path>",
            uri
        ))
    })?;

    if rest == "memory" {
        return Ok(StoreLocation::Memory);
    }

    let relative = rest.trim_start_matches('/');
    if relative.is_empty() {
        return Err(SafedriveError::ReaderError(format!(
            "Store URI '{}' names no database file",
            uri
        )));
    }

    // Collapse any run of leading slashes to one
    let path = if rest.starts_with('/') {
        format!("/{}", relative)
    } else {
        relative.to_string()
    };
    Ok(StoreLocation::File(PathBuf::from(path)))
}
