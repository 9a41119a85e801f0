//! Column registry
//!
//! Fixed mapping from `TABLE.column` identifiers to their semantic kind. The
//! table is data: a JSON document listing every column, loaded once at start
//! up and read-only afterwards.
//!
//! ```json
//! {
//!   "count_key": "ACCIDENT.AccidentID",
//!   "columns": [
//!     { "id": "ACCIDENT.DayNight", "kind": "categorical" },
//!     { "id": "ACCIDENT.(사고건수)", "kind": "numeric", "virtual": true }
//!   ]
//! }
//! ```
//!
//! A *virtual* column has no physical backing; it stands for "number of
//! accidents" and resolves to `COUNT(<count_key>)` at query-build time.

mod column;

pub use column::{ColumnKind, ColumnRef, PhysicalColumn, Table};

use crate::{Result, SafedriveError};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Registry table shipped with the crate
const BUILTIN_COLUMNS: &str = include_str!("../../data/columns.json");

/// Where a registered column's values come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// A real column that can be selected and grouped on
    Physical(PhysicalColumn),
    /// The synthetic accident-count column
    VirtualCount,
}

/// A column known to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredColumn {
    pub reference: ColumnRef,
    pub kind: ColumnKind,
    pub source: ColumnSource,
}

impl RegisteredColumn {
    pub fn is_virtual(&self) -> bool {
        matches!(self.source, ColumnSource::VirtualCount)
    }

    /// The physical column, or `None` for the virtual count column
    pub fn physical(&self) -> Option<&PhysicalColumn> {
        match &self.source {
            ColumnSource::Physical(col) => Some(col),
            ColumnSource::VirtualCount => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    count_key: String,
    columns: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    id: String,
    kind: ColumnKind,
    #[serde(default, rename = "virtual")]
    is_virtual: bool,
}

/// Immutable column registry
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    columns: BTreeMap<String, RegisteredColumn>,
    count_key: PhysicalColumn,
    virtual_count: ColumnRef,
}

impl ColumnRegistry {
    /// Load the registry table embedded in the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_COLUMNS)
    }

    /// Load a registry table from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SafedriveError::ConfigError(format!(
                "Failed to read registry file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a registry table
    ///
    /// # Errors
    ///
    /// Returns `SafedriveError::ConfigError` if:
    /// - The JSON is malformed
    /// - A column names an unknown table or is declared `unknown`
    /// - A physical column name is not a plain SQL identifier
    /// - An identifier appears twice
    /// - There is not exactly one virtual count column, or it is not numeric
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)
            .map_err(|e| SafedriveError::ConfigError(format!("Invalid registry JSON: {}", e)))?;

        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| SafedriveError::InternalError(e.to_string()))?;

        let count_key = physical_column(&file.count_key, &identifier)?;
        if count_key.table != Table::Accident {
            return Err(SafedriveError::ConfigError(format!(
                "Count key '{}' must be an ACCIDENT column",
                file.count_key
            )));
        }

        let mut columns = BTreeMap::new();
        let mut virtual_count = None;

        for entry in file.columns {
            if entry.kind == ColumnKind::Unknown {
                return Err(SafedriveError::ConfigError(format!(
                    "Column '{}' cannot be registered with kind 'unknown'",
                    entry.id
                )));
            }

            let reference = ColumnRef::parse(&entry.id)
                .map_err(|e| SafedriveError::ConfigError(e.to_string()))?;

            let source = if entry.is_virtual {
                if entry.kind != ColumnKind::Numeric {
                    return Err(SafedriveError::ConfigError(format!(
                        "Virtual column '{}' must be numeric",
                        entry.id
                    )));
                }
                if let Some(existing) = &virtual_count {
                    return Err(SafedriveError::ConfigError(format!(
                        "Only one virtual count column is supported, found '{}' and '{}'",
                        existing, entry.id
                    )));
                }
                reference.table().parse::<Table>()?;
                virtual_count = Some(reference.clone());
                ColumnSource::VirtualCount
            } else {
                ColumnSource::Physical(physical_column(&entry.id, &identifier)?)
            };

            let registered = RegisteredColumn {
                reference,
                kind: entry.kind,
                source,
            };
            if columns.insert(entry.id.clone(), registered).is_some() {
                return Err(SafedriveError::ConfigError(format!(
                    "Column '{}' is registered twice",
                    entry.id
                )));
            }
        }

        let virtual_count = virtual_count.ok_or_else(|| {
            SafedriveError::ConfigError(
                "Registry must declare one virtual count column".to_string(),
            )
        })?;

        Ok(Self {
            columns,
            count_key,
            virtual_count,
        })
    }

    /// Kind of a column; `Unknown` for anything not registered
    pub fn kind_of(&self, reference: &ColumnRef) -> ColumnKind {
        self.lookup(reference)
            .map(|col| col.kind)
            .unwrap_or(ColumnKind::Unknown)
    }

    pub fn lookup(&self, reference: &ColumnRef) -> Option<&RegisteredColumn> {
        self.columns.get(&reference.to_string())
    }

    pub fn is_virtual(&self, reference: &ColumnRef) -> bool {
        self.lookup(reference)
            .map(RegisteredColumn::is_virtual)
            .unwrap_or(false)
    }

    /// All registered identifiers, sorted
    pub fn all_columns(&self) -> Vec<ColumnRef> {
        self.columns.values().map(|c| c.reference.clone()).collect()
    }

    /// Registered physical columns grouped by table
    pub fn physical_columns(&self) -> BTreeMap<Table, Vec<&PhysicalColumn>> {
        let mut by_table: BTreeMap<Table, Vec<&PhysicalColumn>> = BTreeMap::new();
        by_table
            .entry(self.count_key.table)
            .or_default()
            .push(&self.count_key);
        for col in self.columns.values().filter_map(RegisteredColumn::physical) {
            by_table.entry(col.table).or_default().push(col);
        }
        by_table
    }

    /// Surrogate key counted by the virtual count column
    pub fn count_key(&self) -> &PhysicalColumn {
        &self.count_key
    }

    /// Identifier of the virtual count column
    pub fn virtual_count(&self) -> &ColumnRef {
        &self.virtual_count
    }
}

fn physical_column(id: &str, identifier: &Regex) -> Result<PhysicalColumn> {
    let reference =
        ColumnRef::parse(id).map_err(|e| SafedriveError::ConfigError(e.to_string()))?;
    let table = reference.table().parse::<Table>()?;
    if !identifier.is_match(reference.column()) {
        return Err(SafedriveError::ConfigError(format!(
            "Column name '{}' in '{}' is not a plain SQL identifier",
            reference.column(),
            id
        )));
    }
    Ok(PhysicalColumn::new(table, reference.column()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_registry_kinds() {
        let registry = ColumnRegistry::builtin().unwrap();

        let kind = |id: &str| registry.kind_of(&ColumnRef::parse(id).unwrap());
        assert_eq!(kind("ACCIDENT.DayNight"), ColumnKind::Categorical);
        assert_eq!(kind("REGION.RegionName"), ColumnKind::Categorical);
        assert_eq!(kind("DRIVER.Gender"), ColumnKind::Categorical);
        assert_eq!(kind("ACCIDENT.DeathCount"), ColumnKind::Numeric);
        assert_eq!(kind("ACCIDENT.(사고건수)"), ColumnKind::Numeric);
        assert_eq!(kind("ACCIDENT.OccurYearMonth"), ColumnKind::Temporal);
        assert_eq!(kind("NOT.AColumn"), ColumnKind::Unknown);
        assert_eq!(kind("ACCIDENT.AccidentID"), ColumnKind::Unknown);
    }

    #[test]
    fn test_all_columns_sorted() {
        let registry = ColumnRegistry::builtin().unwrap();
        let ids: Vec<String> = registry.all_columns().iter().map(|c| c.to_string()).collect();

        assert_eq!(ids.len(), 18);
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_virtual_count_column() {
        let registry = ColumnRegistry::builtin().unwrap();
        let virtual_count = registry.virtual_count().clone();

        assert_eq!(virtual_count.to_string(), "ACCIDENT.(사고건수)");
        assert!(registry.is_virtual(&virtual_count));
        assert!(registry.lookup(&virtual_count).unwrap().physical().is_none());
        assert!(!registry.is_virtual(&ColumnRef::new("ACCIDENT", "DeathCount")));
        assert_eq!(registry.count_key().qualified(), "ACCIDENT.AccidentID");
    }

    #[test]
    fn test_physical_columns_include_count_key() {
        let registry = ColumnRegistry::builtin().unwrap();
        let by_table = registry.physical_columns();

        let accident: Vec<String> = by_table[&Table::Accident]
            .iter()
            .map(|c| c.column.clone())
            .collect();
        assert!(accident.contains(&"AccidentID".to_string()));
        assert!(!accident.iter().any(|c| c.contains('(')));
        assert_eq!(by_table[&Table::Region].len(), 1);
    }

    #[test]
    fn test_rejects_unknown_table() {
        let json = r#"{"count_key": "ACCIDENT.AccidentID", "columns": [
            {"id": "VEHICLE.Make", "kind": "categorical"},
            {"id": "ACCIDENT.(count)", "kind": "numeric", "virtual": true}
        ]}"#;
        let err = ColumnRegistry::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("Unknown table 'VEHICLE'"));
    }

    #[test]
    fn test_rejects_non_identifier_physical_column() {
        let json = r#"{"count_key": "ACCIDENT.AccidentID", "columns": [
            {"id": "ACCIDENT.Death; DROP TABLE ACCIDENT", "kind": "numeric"},
            {"id": "ACCIDENT.(count)", "kind": "numeric", "virtual": true}
        ]}"#;
        let err = ColumnRegistry::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("not a plain SQL identifier"));
    }

    #[test]
    fn test_rejects_duplicates_and_missing_virtual() {
        let duplicate = r#"{"count_key": "ACCIDENT.AccidentID", "columns": [
            {"id": "ACCIDENT.DayNight", "kind": "categorical"},
            {"id": "ACCIDENT.DayNight", "kind": "categorical"},
            {"id": "ACCIDENT.(count)", "kind": "numeric", "virtual": true}
        ]}"#;
        assert!(ColumnRegistry::from_json_str(duplicate)
            .unwrap_err()
            .to_string()
            .contains("registered twice"));

        let no_virtual = r#"{"count_key": "ACCIDENT.AccidentID", "columns": [
            {"id": "ACCIDENT.DayNight", "kind": "categorical"}
        ]}"#;
        assert!(ColumnRegistry::from_json_str(no_virtual).is_err());
    }

    #[test]
    fn test_rejects_unknown_kind_and_foreign_count_key() {
        let unknown_kind = r#"{"count_key": "ACCIDENT.AccidentID", "columns": [
            {"id": "ACCIDENT.DayNight", "kind": "unknown"}
        ]}"#;
        assert!(ColumnRegistry::from_json_str(unknown_kind).is_err());

        let driver_key = r#"{"count_key": "DRIVER.DriverID", "columns": [
            {"id": "ACCIDENT.(count)", "kind": "numeric", "virtual": true}
        ]}"#;
        assert!(ColumnRegistry::from_json_str(driver_key)
            .unwrap_err()
            .to_string()
            .contains("must be an ACCIDENT column"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"count_key": "ACCIDENT.AccidentID", "columns": [
                {{"id": "ACCIDENT.WeatherState", "kind": "categorical"}},
                {{"id": "ACCIDENT.(count)", "kind": "numeric", "virtual": true}}
            ]}}"#
        )
        .unwrap();

        let registry = ColumnRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.all_columns().len(), 2);
        assert_eq!(registry.virtual_count().column(), "(count)");

        assert!(ColumnRegistry::from_path("/nonexistent/columns.json").is_err());
    }
}
