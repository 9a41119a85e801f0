//! Query builder
//!
//! Turns two or three column identifiers into a [`QueryPlan`]. Joins are derived
//! from the tables the plan actually references; ACCIDENT is always the FROM
//! table and DRIVER / REGION are joined at most once each.

use super::plan::{AggFunc, QueryPlan, SelectItem, SortKey};
use crate::registry::{ColumnRef, ColumnRegistry, ColumnSource, PhysicalColumn, Table};
use crate::{Result, SafedriveError};
use std::collections::BTreeSet;

/// Builds query plans for registered columns. Pure: nothing is executed.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    registry: &'a ColumnRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a ColumnRegistry) -> Self {
        Self { registry }
    }

    /// Aggregation for a value operand: `COUNT` for the virtual count column,
    /// `SUM` for everything else
    pub fn value_agg(&self, value: &ColumnRef) -> AggFunc {
        if self.registry.is_virtual(value) {
            AggFunc::Count
        } else {
            AggFunc::Sum
        }
    }

    /// Build a two-column plan
    ///
    /// With `agg_func`, the first column is the group key (also ordered on) and
    /// the second is aggregated into [`super::VALUE_COLUMN`]. Without it both
    /// columns are selected raw, ungrouped.
    pub fn build(
        &self,
        first: &ColumnRef,
        second: &ColumnRef,
        agg_func: Option<AggFunc>,
    ) -> Result<QueryPlan> {
        let key = self.groupable(first)?;

        let (select, group_by, order_by) = match agg_func {
            Some(func) => (
                vec![
                    SelectItem::Column(key.clone()),
                    self.aggregate(second, func)?,
                ],
                vec![key.clone()],
                vec![SortKey::ascending(key)],
            ),
            None => (
                vec![
                    SelectItem::Column(key),
                    SelectItem::Column(self.groupable(second)?),
                ],
                Vec::new(),
                Vec::new(),
            ),
        };

        finish(select, group_by, order_by, agg_func)
    }

    /// Build a plan grouped on two keys with an aggregated value
    ///
    /// `x` is the primary key (ordered ascending), `group` the secondary key.
    pub fn build_grouped(
        &self,
        x: &ColumnRef,
        group: &ColumnRef,
        value: &ColumnRef,
        agg_func: AggFunc,
    ) -> Result<QueryPlan> {
        let x_key = self.groupable(x)?;
        let group_key = self.groupable(group)?;

        let select = vec![
            SelectItem::Column(x_key.clone()),
            SelectItem::Column(group_key.clone()),
            self.aggregate(value, agg_func)?,
        ];
        let group_by = vec![x_key.clone(), group_key];
        let order_by = vec![SortKey::ascending(x_key)];

        finish(select, group_by, order_by, Some(agg_func))
    }

    fn resolve(&self, reference: &ColumnRef) -> Result<&ColumnSource> {
        self.registry
            .lookup(reference)
            .map(|col| &col.source)
            .ok_or_else(|| {
                SafedriveError::Classification(format!(
                    "'{}' is not a registered column",
                    reference
                ))
            })
    }

    /// A physical column that can be selected raw or grouped on
    fn groupable(&self, reference: &ColumnRef) -> Result<PhysicalColumn> {
        match self.resolve(reference)? {
            ColumnSource::Physical(col) => Ok(col.clone()),
            ColumnSource::VirtualCount => Err(SafedriveError::UnsupportedCombination(format!(
                "'{}' is an aggregate-only column and cannot be grouped on or selected raw",
                reference
            ))),
        }
    }

    fn aggregate(&self, reference: &ColumnRef, func: AggFunc) -> Result<SelectItem> {
        Ok(match self.resolve(reference)? {
            ColumnSource::VirtualCount => SelectItem::Aggregate {
                func: AggFunc::Count,
                column: self.registry.count_key().clone(),
            },
            ColumnSource::Physical(col) => SelectItem::Aggregate {
                func,
                column: col.clone(),
            },
        })
    }
}

fn finish(
    select: Vec<SelectItem>,
    group_by: Vec<PhysicalColumn>,
    order_by: Vec<SortKey>,
    agg_func: Option<AggFunc>,
) -> Result<QueryPlan> {
    let mut plan = QueryPlan {
        select,
        from: Table::Accident,
        joins: BTreeSet::new(),
        group_by,
        order_by,
        agg_func,
        limit: None,
    };
    plan.joins = plan
        .referenced_tables()
        .into_iter()
        .filter(|t| *t != Table::Accident)
        .collect();
    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::VALUE_COLUMN;

    fn col(id: &str) -> ColumnRef {
        ColumnRef::parse(id).unwrap()
    }

    #[test]
    fn test_virtual_count_becomes_count_of_key() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let plan = builder
            .build(
                &col("REGION.RegionName"),
                &col("ACCIDENT.(사고건수)"),
                Some(AggFunc::Count),
            )
            .unwrap();

        assert_eq!(
            plan.to_sql().unwrap(),
            "SELECT REGION.RegionName AS \"RegionName\", \
             COUNT(ACCIDENT.AccidentID) AS \"Value\" FROM ACCIDENT \
             JOIN REGION ON ACCIDENT.RegionCode = REGION.RegionCode \
             GROUP BY REGION.RegionName ORDER BY REGION.RegionName ASC"
        );
        assert_eq!(plan.joins, [Table::Region].into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_virtual_count_ignores_requested_function() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let plan = builder
            .build(
                &col("ACCIDENT.OccurYearMonth"),
                &col("ACCIDENT.(사고건수)"),
                Some(AggFunc::Sum),
            )
            .unwrap();
        assert!(plan.to_sql().unwrap().contains("COUNT(ACCIDENT.AccidentID)"));
    }

    #[test]
    fn test_value_agg_choice() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        assert_eq!(builder.value_agg(&col("ACCIDENT.(사고건수)")), AggFunc::Count);
        assert_eq!(builder.value_agg(&col("ACCIDENT.DeathCount")), AggFunc::Sum);
    }

    #[test]
    fn test_sum_of_physical_column() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let plan = builder
            .build(&col("DRIVER.VehicleType"), &col("ACCIDENT.DeathCount"), Some(AggFunc::Sum))
            .unwrap();
        let sql = plan.to_sql().unwrap();

        assert!(sql.contains("SUM(ACCIDENT.DeathCount) AS \"Value\""));
        assert!(sql.contains("JOIN DRIVER ON ACCIDENT.AccidentID = DRIVER.AccidentID"));
        assert!(!sql.contains("JOIN REGION"));
        assert_eq!(plan.group_by.len(), 1);
    }

    #[test]
    fn test_unaggregated_pair() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let plan = builder
            .build(&col("ACCIDENT.SevereInjuryCount"), &col("ACCIDENT.MinorInjuryCount"), None)
            .unwrap();

        assert!(plan.group_by.is_empty());
        assert!(plan.order_by.is_empty());
        assert!(plan.joins.is_empty());
        assert_eq!(plan.output_columns(), vec!["SevereInjuryCount", "MinorInjuryCount"]);
    }

    #[test]
    fn test_grouped_plan_joins_each_table_once() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let plan = builder
            .build_grouped(
                &col("REGION.RegionName"),
                &col("DRIVER.Gender"),
                &col("ACCIDENT.(사고건수)"),
                AggFunc::Count,
            )
            .unwrap();
        let sql = plan.to_sql().unwrap();

        assert_eq!(sql.matches("JOIN DRIVER").count(), 1);
        assert_eq!(sql.matches("JOIN REGION").count(), 1);
        assert!(sql.contains("GROUP BY REGION.RegionName, DRIVER.Gender"));
        assert_eq!(plan.output_columns(), vec!["RegionName", "Gender", VALUE_COLUMN]);
    }

    #[test]
    fn test_join_set_covers_referenced_tables() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);
        let columns = registry.all_columns();

        for a in &columns {
            for b in &columns {
                if a == b || registry.is_virtual(a) {
                    continue;
                }
                let agg = builder.value_agg(b);
                if let Ok(plan) = builder.build(a, b, Some(agg)) {
                    assert!(plan.referenced_tables().is_subset(&plan.tables()));
                    assert!(!plan.joins.contains(&Table::Accident));
                }
            }
        }
    }

    #[test]
    fn test_virtual_column_cannot_be_group_key() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let err = builder
            .build(&col("ACCIDENT.(사고건수)"), &col("ACCIDENT.DeathCount"), None)
            .unwrap_err();
        assert!(matches!(err, SafedriveError::UnsupportedCombination(_)));
    }

    #[test]
    fn test_unregistered_column_is_rejected() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let err = builder
            .build(&col("ACCIDENT.Description"), &col("ACCIDENT.DeathCount"), None)
            .unwrap_err();
        assert!(matches!(err, SafedriveError::Classification(_)));
    }
}
