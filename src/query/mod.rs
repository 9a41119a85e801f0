//! Query plans and the query builder
//!
//! The builder never sees raw SQL text: identifiers are resolved through the
//! [`ColumnRegistry`](crate::registry::ColumnRegistry) into typed columns, and the
//! plan renders itself with [`QueryPlan::to_sql`] only after checking that every
//! referenced table is joined.

mod builder;
mod plan;

pub use builder::QueryBuilder;
pub use plan::{
    AggFunc, QueryPlan, SelectItem, SortDirection, SortKey, SortTarget, VALUE_COLUMN,
};
