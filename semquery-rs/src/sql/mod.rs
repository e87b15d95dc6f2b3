//! Query model, validation and SQL generation

mod generator;
mod query;
pub mod quote;
mod validator;

pub use generator::SqlGenerator;
pub use query::{
    Filter, FilterOperator, Granularity, OrderEntry, SemanticQuery, TimeDimension,
};
pub use validator::{
    validate, DateRange, PlannedFilter, PlannedOrder, PlannedTimeDimension, Predicate, QueryPlan,
    QueryValidator,
};
