//! Query plan types
//!
//! A [`QueryPlan`] is the typed intermediate form of a single aggregation query.
//! Every column in it is a [`PhysicalColumn`] taken from the registry, so the
//! rendered SQL never contains free-form user text.

use crate::registry::{PhysicalColumn, Table};
use crate::{Result, SafedriveError};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Output name of the aggregated value column
pub const VALUE_COLUMN: &str = "Value";

/// Aggregation applied to the value operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggFunc {
    Count,
    Sum,
}

impl AggFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One expression in the SELECT list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectItem {
    /// Raw column, aliased to its column name
    Column(PhysicalColumn),
    /// Aggregated column, aliased to [`VALUE_COLUMN`]
    Aggregate { func: AggFunc, column: PhysicalColumn },
}

impl SelectItem {
    pub fn output_name(&self) -> &str {
        match self {
            SelectItem::Column(col) => &col.column,
            SelectItem::Aggregate { .. } => VALUE_COLUMN,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            SelectItem::Column(col) => col.table,
            SelectItem::Aggregate { column, .. } => column.table,
        }
    }

    fn to_sql(&self) -> String {
        match self {
            SelectItem::Column(col) => format!("{} AS \"{}\"", col.qualified(), col.column),
            SelectItem::Aggregate { func, column } => {
                format!("{}({}) AS \"{}\"", func, column.qualified(), VALUE_COLUMN)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// What an ORDER BY key refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SortTarget {
    Column(PhysicalColumn),
    /// The aggregated [`VALUE_COLUMN`]
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub target: SortTarget,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(column: PhysicalColumn) -> Self {
        Self {
            target: SortTarget::Column(column),
            direction: SortDirection::Ascending,
        }
    }

    pub fn value_descending() -> Self {
        Self {
            target: SortTarget::Value,
            direction: SortDirection::Descending,
        }
    }

    fn to_sql(&self) -> String {
        let target = match &self.target {
            SortTarget::Column(col) => col.qualified(),
            SortTarget::Value => format!("\"{}\"", VALUE_COLUMN),
        };
        let direction = match self.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        format!("{} {}", target, direction)
    }
}

/// Not-yet-executed aggregation query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub select: Vec<SelectItem>,
    /// Always ACCIDENT
    pub from: Table,
    /// Tables joined onto ACCIDENT, each at most once
    pub joins: BTreeSet<Table>,
    pub group_by: Vec<PhysicalColumn>,
    pub order_by: Vec<SortKey>,
    pub agg_func: Option<AggFunc>,
    pub limit: Option<usize>,
}

impl QueryPlan {
    pub fn with_order_by(mut self, order_by: Vec<SortKey>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every table referenced by SELECT, GROUP BY or ORDER BY
    pub fn referenced_tables(&self) -> BTreeSet<Table> {
        let mut tables: BTreeSet<Table> = self.select.iter().map(SelectItem::table).collect();
        tables.extend(self.group_by.iter().map(|c| c.table));
        tables.extend(self.order_by.iter().filter_map(|k| match &k.target {
            SortTarget::Column(col) => Some(col.table),
            SortTarget::Value => None,
        }));
        tables
    }

    /// FROM table plus joins
    pub fn tables(&self) -> BTreeSet<Table> {
        let mut tables = self.joins.clone();
        tables.insert(self.from);
        tables
    }

    /// Output column names, in SELECT order
    pub fn output_columns(&self) -> Vec<&str> {
        self.select.iter().map(SelectItem::output_name).collect()
    }

    /// Check the plan can be executed
    ///
    /// Every referenced table must be reachable through the join set, output
    /// names must be unique, and ORDER BY on the value needs an aggregate.
    pub fn validate(&self) -> Result<()> {
        if self.select.is_empty() {
            return Err(SafedriveError::InvalidPlan(
                "SELECT list is empty".to_string(),
            ));
        }

        let available = self.tables();
        let missing: Vec<&str> = self
            .referenced_tables()
            .difference(&available)
            .map(|t| t.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(SafedriveError::InvalidPlan(format!(
                "Tables referenced but not joined: {}",
                missing.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        for name in self.output_columns() {
            if !seen.insert(name) {
                return Err(SafedriveError::InvalidPlan(format!(
                    "Duplicate output column '{}'",
                    name
                )));
            }
        }

        let orders_by_value = self
            .order_by
            .iter()
            .any(|k| matches!(k.target, SortTarget::Value));
        if orders_by_value && !seen.contains(VALUE_COLUMN) {
            return Err(SafedriveError::InvalidPlan(format!(
                "ORDER BY \"{}\" requires an aggregate",
                VALUE_COLUMN
            )));
        }

        Ok(())
    }

    /// Render the plan as a single SQL statement
    pub fn to_sql(&self) -> Result<String> {
        self.validate()?;

        let select: Vec<String> = self.select.iter().map(SelectItem::to_sql).collect();
        let mut sql = format!("SELECT {} FROM {}", select.join(", "), self.from);

        for table in &self.joins {
            if let Some(condition) = join_condition(*table) {
                sql.push_str(&format!(" JOIN {} ON {}", table, condition));
            }
        }

        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|c| c.qualified()).collect();
            sql.push_str(&format!(" GROUP BY {}", keys.join(", ")));
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(SortKey::to_sql).collect();
            sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Ok(sql)
    }
}

/// Foreign-key join from ACCIDENT to another table
fn join_condition(table: Table) -> Option<&'static str> {
    match table {
        Table::Accident => None,
        Table::Driver => Some("ACCIDENT.AccidentID = DRIVER.AccidentID"),
        Table::Region => Some("ACCIDENT.RegionCode = REGION.RegionCode"),
    }
}
