//! Query validator: resolves a SemanticQuery against a dataset catalog
//!
//! The output is a [`QueryPlan`] holding resolved measures and dimensions,
//! typed granularities and typed filter predicates. The SQL generator only
//! ever sees a plan, never raw member names.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::core::{Dataset, DatasetRegistry, Dimension, Measure, Member};
use crate::error::{Result, SemqueryError};
use crate::sql::query::{Filter, FilterOperator, Granularity, SemanticQuery, TimeDimension};

/// A validated, fully resolved query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Dataset name, used as the FROM reference
    pub dataset: String,
    pub measures: Vec<Measure>,
    pub dimensions: Vec<Dimension>,
    pub time_dimensions: Vec<PlannedTimeDimension>,
    pub filters: Vec<PlannedFilter>,
    pub order: Vec<PlannedOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTimeDimension {
    pub dimension: Dimension,
    pub granularity: Option<Granularity>,
    pub date_range: Option<DateRange>,
}

/// Inclusive range bounds, kept as the caller wrote them
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFilter {
    pub member: Member,
    pub predicate: Predicate,
}

/// A filter operator together with the values it takes
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Vec<String>),
    NotEquals(Vec<String>),
    Contains(Vec<String>),
    NotContains(Vec<String>),
    Gt(String),
    Gte(String),
    Lt(String),
    Lte(String),
    Set,
    NotSet,
    InDateRange(DateRange),
    NotInDateRange(DateRange),
    BeforeDate(String),
    AfterDate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrder {
    pub member: Member,
    pub desc: bool,
}

/// Look up the query's dataset in the registry and validate against it
pub fn validate(registry: &DatasetRegistry, query: &SemanticQuery) -> Result<QueryPlan> {
    let dataset = registry.lookup(&query.dataset)?;
    QueryValidator::new(&dataset).validate(query)
}

/// Validates queries against a single dataset
pub struct QueryValidator<'a> {
    dataset: &'a Dataset,
}

impl<'a> QueryValidator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn validate(&self, query: &SemanticQuery) -> Result<QueryPlan> {
        if query.is_empty() {
            return Err(SemqueryError::EmptyQuery);
        }

        let measures = query
            .measures
            .iter()
            .map(|name| self.resolve_measure(name))
            .collect::<Result<Vec<_>>>()?;

        let dimensions = query
            .dimensions
            .iter()
            .map(|name| self.resolve_dimension(name))
            .collect::<Result<Vec<_>>>()?;

        let time_dimensions = query
            .time_dimensions
            .iter()
            .map(|td| self.resolve_time_dimension(td))
            .collect::<Result<Vec<_>>>()?;

        let filters = query
            .filters
            .iter()
            .map(|f| self.resolve_filter(f))
            .collect::<Result<Vec<_>>>()?;

        // Each output column gets its member name as alias, so names must be unique
        let mut selected = HashSet::new();
        let names = measures
            .iter()
            .map(|m| m.name.as_str())
            .chain(dimensions.iter().map(|d| d.name.as_str()))
            .chain(time_dimensions.iter().map(|td| td.dimension.name.as_str()));
        for name in names {
            if !selected.insert(name) {
                return Err(SemqueryError::InvalidQuery(format!(
                    "member '{name}' is selected more than once"
                )));
            }
        }

        // ORDER BY refers to output aliases, so only selected members can be keys
        let order = query
            .order
            .iter()
            .map(|entry| {
                let member = self.dataset.get_member(&entry.id).ok_or_else(|| {
                    SemqueryError::MemberNotFound {
                        dataset: self.dataset.name.clone(),
                        member: entry.id.clone(),
                    }
                })?;
                if !selected.contains(member.name()) {
                    return Err(SemqueryError::InvalidQuery(format!(
                        "cannot order by '{}': it is not selected",
                        entry.id
                    )));
                }
                Ok(PlannedOrder {
                    member,
                    desc: entry.desc,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let time_zone = match &query.time_zone {
            Some(tz) if tz.trim().is_empty() => {
                return Err(SemqueryError::InvalidQuery(
                    "time_zone must not be empty".into(),
                ))
            }
            Some(tz) => {
                if !time_dimensions.is_empty() && !tz.eq_ignore_ascii_case("UTC") {
                    warn!(
                        time_zone = %tz,
                        "time_zone is not applied to DATE_TRUNC; buckets follow the session time zone"
                    );
                }
                Some(tz.clone())
            }
            None => None,
        };

        let plan = QueryPlan {
            dataset: self.dataset.name.clone(),
            measures,
            dimensions,
            time_dimensions,
            filters,
            order,
            limit: positive(query.limit),
            offset: positive(query.offset),
            time_zone,
        };

        debug!(
            dataset = %plan.dataset,
            measures = plan.measures.len(),
            dimensions = plan.dimensions.len(),
            time_dimensions = plan.time_dimensions.len(),
            filters = plan.filters.len(),
            "Query validated"
        );

        Ok(plan)
    }

    fn resolve_measure(&self, name: &str) -> Result<Measure> {
        self.dataset
            .get_measure(name)
            .cloned()
            .ok_or_else(|| SemqueryError::MeasureNotFound {
                dataset: self.dataset.name.clone(),
                measure: name.to_string(),
            })
    }

    fn resolve_dimension(&self, name: &str) -> Result<Dimension> {
        self.dataset
            .get_dimension(name)
            .cloned()
            .ok_or_else(|| self.dimension_not_found(name))
    }

    fn dimension_not_found(&self, name: &str) -> SemqueryError {
        SemqueryError::DimensionNotFound {
            dataset: self.dataset.name.clone(),
            dimension: name.to_string(),
        }
    }

    fn resolve_time_dimension(&self, td: &TimeDimension) -> Result<PlannedTimeDimension> {
        let dimension = self.resolve_dimension(&td.dimension)?;

        let granularity = td
            .granularity
            .as_deref()
            .map(|g| {
                g.parse::<Granularity>()
                    .map_err(|_| SemqueryError::InvalidGranularity {
                        dimension: td.dimension.clone(),
                        granularity: g.to_string(),
                        expected: Granularity::expected(),
                    })
            })
            .transpose()?;

        if granularity.is_some() && !dimension.is_time() {
            warn!(
                dimension = %dimension.name,
                "Applying time granularity to a dimension not declared as time"
            );
        }

        let date_range = td
            .date_range
            .as_deref()
            .map(|values| parse_date_range(&td.dimension, values))
            .transpose()?;

        Ok(PlannedTimeDimension {
            dimension,
            granularity,
            date_range,
        })
    }

    fn resolve_filter(&self, filter: &Filter) -> Result<PlannedFilter> {
        let member = self
            .dataset
            .get_member(&filter.dimension)
            .ok_or_else(|| self.dimension_not_found(&filter.dimension))?;
        let predicate = build_predicate(filter)?;
        Ok(PlannedFilter { member, predicate })
    }
}

fn positive(value: Option<i64>) -> Option<u64> {
    value.filter(|&n| n > 0).map(|n| n as u64)
}

fn build_predicate(filter: &Filter) -> Result<Predicate> {
    let operator: FilterOperator = filter.operator.parse().map_err(|_| {
        let expected: Vec<&str> = FilterOperator::ALL.iter().map(|op| op.as_str()).collect();
        SemqueryError::invalid_filter(
            &filter.dimension,
            format!(
                "unknown operator '{}' (expected one of: {})",
                filter.operator,
                expected.join(", ")
            ),
        )
    })?;

    let predicate = match operator {
        FilterOperator::Equals => Predicate::Equals(one_or_more(filter, operator)?),
        FilterOperator::NotEquals => Predicate::NotEquals(one_or_more(filter, operator)?),
        FilterOperator::Contains => Predicate::Contains(one_or_more(filter, operator)?),
        FilterOperator::NotContains => Predicate::NotContains(one_or_more(filter, operator)?),
        FilterOperator::Gt => Predicate::Gt(exactly_one(filter, operator)?),
        FilterOperator::Gte => Predicate::Gte(exactly_one(filter, operator)?),
        FilterOperator::Lt => Predicate::Lt(exactly_one(filter, operator)?),
        FilterOperator::Lte => Predicate::Lte(exactly_one(filter, operator)?),
        FilterOperator::Set => {
            no_values(filter, operator)?;
            Predicate::Set
        }
        FilterOperator::NotSet => {
            no_values(filter, operator)?;
            Predicate::NotSet
        }
        FilterOperator::InDateRange => {
            exactly_two(filter, operator)?;
            Predicate::InDateRange(parse_date_range(&filter.dimension, &filter.values)?)
        }
        FilterOperator::NotInDateRange => {
            exactly_two(filter, operator)?;
            Predicate::NotInDateRange(parse_date_range(&filter.dimension, &filter.values)?)
        }
        FilterOperator::BeforeDate => {
            let value = exactly_one(filter, operator)?;
            parse_date(&filter.dimension, &value)?;
            Predicate::BeforeDate(value)
        }
        FilterOperator::AfterDate => {
            let value = exactly_one(filter, operator)?;
            parse_date(&filter.dimension, &value)?;
            Predicate::AfterDate(value)
        }
    };

    Ok(predicate)
}

fn one_or_more(filter: &Filter, operator: FilterOperator) -> Result<Vec<String>> {
    if filter.values.is_empty() {
        return Err(arity_error(filter, operator, "at least one value"));
    }
    Ok(filter.values.clone())
}

fn exactly_one(filter: &Filter, operator: FilterOperator) -> Result<String> {
    match filter.values.as_slice() {
        [value] => Ok(value.clone()),
        _ => Err(arity_error(filter, operator, "exactly one value")),
    }
}

fn exactly_two(filter: &Filter, operator: FilterOperator) -> Result<()> {
    if filter.values.len() != 2 {
        return Err(arity_error(filter, operator, "exactly two values"));
    }
    Ok(())
}

fn no_values(filter: &Filter, operator: FilterOperator) -> Result<()> {
    if !filter.values.is_empty() {
        return Err(arity_error(filter, operator, "no values"));
    }
    Ok(())
}

fn arity_error(filter: &Filter, operator: FilterOperator, expected: &str) -> SemqueryError {
    SemqueryError::invalid_filter(
        &filter.dimension,
        format!(
            "operator '{}' takes {}, got {}",
            operator,
            expected,
            filter.values.len()
        ),
    )
}

fn parse_date_range(dimension: &str, values: &[String]) -> Result<DateRange> {
    let [start, end] = values else {
        return Err(SemqueryError::invalid_date_range(
            dimension,
            format!("expected [start, end], got {} values", values.len()),
        ));
    };

    if parse_date(dimension, start)? > parse_date(dimension, end)? {
        return Err(SemqueryError::invalid_date_range(
            dimension,
            format!("start '{start}' is after end '{end}'"),
        ));
    }

    Ok(DateRange {
        start: start.clone(),
        end: end.clone(),
    })
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD[T ]HH:MM:SS`
fn parse_date(dimension: &str, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            SemqueryError::invalid_date_range(dimension, format!("'{value}' is not a valid date"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DatasetRegistry {
        let registry = DatasetRegistry::new();
        registry
            .register(
                Dataset::new("orders_ds")
                    .with_measure(Measure::sum("orders_ds.total_revenue", "SUM(order_amount)"))
                    .with_measure(Measure::count("orders_ds.order_count", "COUNT(*)"))
                    .with_dimension(Dimension::time("orders_ds.order_date", "order_date"))
                    .with_dimension(Dimension::new("orders_ds.customer_id", "customer_id"))
                    .with_dimension(Dimension::new(
                        "orders_ds.product_category",
                        "product_category",
                    )),
            )
            .unwrap();
        registry
    }

    fn base() -> SemanticQuery {
        SemanticQuery::new("orders_ds").with_measures(vec!["orders_ds.total_revenue".into()])
    }

    fn filter(operator: &str, values: &[&str]) -> Filter {
        Filter::new(
            "orders_ds.customer_id",
            operator,
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn test_resolves_members_in_order() {
        let query = SemanticQuery::new("orders_ds")
            .with_measures(vec![
                "orders_ds.order_count".into(),
                "orders_ds.total_revenue".into(),
            ])
            .with_dimensions(vec!["orders_ds.customer_id".into()])
            .with_order("orders_ds.total_revenue", true);

        let plan = validate(&registry(), &query).unwrap();
        assert_eq!(plan.dataset, "orders_ds");
        assert_eq!(plan.measures[0].name, "orders_ds.order_count");
        assert_eq!(plan.measures[1].sql_expression, "SUM(order_amount)");
        assert_eq!(plan.dimensions[0].sql_expression, "customer_id");
        assert!(plan.order[0].member.is_measure());
        assert!(plan.order[0].desc);
    }

    #[test]
    fn test_error_contracts() {
        let reg = registry();

        let err = validate(&reg, &SemanticQuery::new("nope").with_measures(vec!["x".into()]))
            .unwrap_err();
        assert!(err.to_string().contains("not found in registry"));

        let err = validate(
            &reg,
            &SemanticQuery::new("orders_ds").with_measures(vec!["invalid_measure".into()]),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Measure 'invalid_measure' not found in dataset 'orders_ds'"
        );

        let err = validate(
            &reg,
            &SemanticQuery::new("orders_ds").with_dimensions(vec!["invalid_dimension".into()]),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dimension 'invalid_dimension' not found in dataset 'orders_ds'"
        );

        let err = validate(&reg, &SemanticQuery::new("orders_ds")).unwrap_err();
        assert!(err
            .to_string()
            .contains("No valid measures or dimensions"));
    }

    #[test]
    fn test_measure_name_is_not_a_dimension() {
        let query = SemanticQuery::new("orders_ds")
            .with_dimensions(vec!["orders_ds.total_revenue".into()]);
        let err = validate(&registry(), &query).unwrap_err();
        assert!(matches!(err, SemqueryError::DimensionNotFound { .. }));
    }

    #[test]
    fn test_time_dimension_validation() {
        let reg = registry();

        let query = base().with_time_dimension(
            TimeDimension::new("orders_ds.order_date").with_granularity("fortnight"),
        );
        let err = validate(&reg, &query).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidGranularity { .. }));
        assert!(err.to_string().contains("fortnight"));

        let query = base().with_time_dimension(TimeDimension::new("orders_ds.missing"));
        let err = validate(&reg, &query).unwrap_err();
        assert!(err.to_string().contains("not found in dataset"));

        let query = base().with_time_dimension(
            TimeDimension::new("orders_ds.order_date").with_date_range("2025-12-31", "2025-01-01"),
        );
        let err = validate(&reg, &query).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidDateRange { .. }));

        let query = base().with_time_dimension(
            TimeDimension::new("orders_ds.order_date").with_date_range("yesterday", "2025-01-01"),
        );
        assert!(validate(&reg, &query).is_err());

        let mut td = TimeDimension::new("orders_ds.order_date");
        td.date_range = Some(vec!["2025-01-01".into()]);
        assert!(validate(&reg, &base().with_time_dimension(td)).is_err());

        let query = base().with_time_dimension(
            TimeDimension::new("orders_ds.order_date")
                .with_granularity("week")
                .with_date_range("2025-01-01 00:00:00", "2025-01-31T23:59:59"),
        );
        let plan = validate(&reg, &query).unwrap();
        assert_eq!(plan.time_dimensions[0].granularity, Some(Granularity::Week));
        assert_eq!(
            plan.time_dimensions[0].date_range.as_ref().unwrap().end,
            "2025-01-31T23:59:59"
        );
    }

    #[test]
    fn test_filter_arity() {
        let reg = registry();
        let check = |f: Filter| validate(&reg, &base().with_filter(f));

        assert!(check(filter("equals", &["1", "2"])).is_ok());
        assert!(check(filter("equals", &[])).is_err());
        assert!(check(filter("not_equals", &["1"])).is_ok());
        assert!(check(filter("contains", &[])).is_err());
        assert!(check(filter("gt", &["1"])).is_ok());
        assert!(check(filter("gte", &["1", "2"])).is_err());
        assert!(check(filter("lt", &[])).is_err());
        assert!(check(filter("set", &[])).is_ok());
        assert!(check(filter("not_set", &["x"])).is_err());
        assert!(check(filter("in_date_range", &["2025-01-01"])).is_err());
        assert!(check(filter("in_date_range", &["2025-01-01", "2025-02-01"])).is_ok());
        assert!(check(filter("before_date", &["2025-01-01"])).is_ok());
        assert!(check(filter("after_date", &["soon"])).is_err());

        let err = check(filter("like", &["x"])).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidFilter { .. }));
        assert!(err.to_string().contains("unknown operator 'like'"));
    }

    #[test]
    fn test_filter_resolution() {
        let reg = registry();

        let query = base().with_filter(Filter::new(
            "orders_ds.total_revenue",
            "gt",
            vec!["100".into()],
        ));
        let plan = validate(&reg, &query).unwrap();
        assert!(plan.filters[0].member.is_measure());
        assert_eq!(plan.filters[0].predicate, Predicate::Gt("100".into()));

        let query = base().with_filter(Filter::new("orders_ds.nope", "set", vec![]));
        let err = validate(&reg, &query).unwrap_err();
        assert!(err.to_string().contains("not found in dataset"));
    }

    #[test]
    fn test_order_resolution() {
        let err = validate(&registry(), &base().with_order("orders_ds.nope", false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Member 'orders_ds.nope' not found in dataset 'orders_ds'"
        );
    }

    #[test]
    fn test_order_requires_selected_member() {
        let reg = registry();

        let query = base()
            .with_dimensions(vec!["orders_ds.customer_id".into()])
            .with_order("orders_ds.order_date", false);
        let err = validate(&reg, &query).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidQuery(_)));
        assert!(err.to_string().contains("'orders_ds.order_date': it is not selected"));

        let query = SemanticQuery::new("orders_ds")
            .with_dimensions(vec!["orders_ds.customer_id".into()])
            .with_order("orders_ds.total_revenue", true);
        assert!(matches!(
            validate(&reg, &query).unwrap_err(),
            SemqueryError::InvalidQuery(_)
        ));

        let query = base()
            .with_time_dimension(TimeDimension::new("orders_ds.order_date").with_granularity("day"))
            .with_order("orders_ds.order_date", true);
        let plan = validate(&reg, &query).unwrap();
        assert_eq!(plan.order[0].member.name(), "orders_ds.order_date");
    }

    #[test]
    fn test_duplicate_selected_members() {
        let reg = registry();

        let query = base()
            .with_dimensions(vec!["orders_ds.order_date".into()])
            .with_time_dimension(
                TimeDimension::new("orders_ds.order_date").with_granularity("month"),
            );
        let err = validate(&reg, &query).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidQuery(_)));
        assert!(err.to_string().contains("'orders_ds.order_date' is selected more than once"));

        let query = SemanticQuery::new("orders_ds").with_measures(vec![
            "orders_ds.total_revenue".into(),
            "orders_ds.total_revenue".into(),
        ]);
        assert!(validate(&reg, &query).is_err());
    }

    #[test]
    fn test_limit_offset_and_time_zone() {
        let reg = registry();

        let plan = validate(&reg, &base().with_limit(10).with_offset(0)).unwrap();
        assert_eq!(plan.limit, Some(10));
        assert_eq!(plan.offset, None);

        let plan = validate(&reg, &base().with_limit(-1)).unwrap();
        assert_eq!(plan.limit, None);

        let plan = validate(&reg, &base().with_time_zone("America/New_York")).unwrap();
        assert_eq!(plan.time_zone.as_deref(), Some("America/New_York"));

        let err = validate(&reg, &base().with_time_zone(" ")).unwrap_err();
        assert!(matches!(err, SemqueryError::InvalidQuery(_)));
    }
}
