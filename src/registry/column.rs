//! Column identifier types
//!
//! A column is addressed as `TABLE.column`. The table part is free text at the
//! identifier level; only registered columns resolve to one of the three known
//! [`Table`]s.

use crate::{Result, SafedriveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic kind of a column, used to pick a chart strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Discrete labels (weather condition, road form, ...)
    Categorical,
    /// Countable or summable measures (injury counts, ...)
    Numeric,
    /// Time-ordered keys (year-month bucket)
    Temporal,
    /// Anything not in the registry
    Unknown,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// The relational tables the accident store is made of
///
/// Ordering matters: join clauses are emitted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Table {
    /// One row per accident; always the FROM table
    Accident,
    /// One or two rows per accident (at-fault / victim)
    Driver,
    /// Region code to name dimension
    Region,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Accident => "ACCIDENT",
            Table::Driver => "DRIVER",
            Table::Region => "REGION",
        }
    }

    pub fn all() -> [Table; 3] {
        [Table::Accident, Table::Driver, Table::Region]
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = SafedriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACCIDENT" => Ok(Table::Accident),
            "DRIVER" => Ok(Table::Driver),
            "REGION" => Ok(Table::Region),
            other => Err(SafedriveError::ConfigError(format!(
                "Unknown table '{}'. Supported: ACCIDENT, DRIVER, REGION",
                other
            ))),
        }
    }
}

/// A `TABLE.column` identifier as chosen by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnRef {
    table: String,
    column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Split an identifier at its first `.`
    ///
    /// Fails when the separator is missing or either side is empty.
    pub fn parse(id: &str) -> Result<Self> {
        match id.trim().split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(Self::new(table, column))
            }
            _ => Err(SafedriveError::MalformedIdentifier(id.to_string())),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl FromStr for ColumnRef {
    type Err = SafedriveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = SafedriveError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ColumnRef> for String {
    fn from(value: ColumnRef) -> Self {
        value.to_string()
    }
}

/// A physical column in one of the known tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalColumn {
    pub table: Table,
    pub column: String,
}

impl PhysicalColumn {
    pub fn new(table: Table, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }

    /// Qualified SQL reference, e.g. `ACCIDENT.DeathCount`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

impl fmt::Display for PhysicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}
