//! SQL generator: compiles validated query plans to DuckDB SQL

use tracing::debug;

use crate::sql::quote::{contains_pattern, literal, operand, quote_ident, quote_string};
use crate::sql::validator::{DateRange, PlannedFilter, PlannedTimeDimension, Predicate, QueryPlan};

/// SQL generator for query plans.
///
/// Generation is a pure function of the plan: the same plan always yields
/// the same text.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlGenerator;

impl SqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a SELECT statement from a validated plan
    pub fn generate(&self, plan: &QueryPlan) -> String {
        let mut sql = String::new();

        // SELECT clause: measures, then dimensions, then time dimensions
        sql.push_str("SELECT\n");
        let mut select_parts = Vec::new();

        for measure in &plan.measures {
            select_parts.push(format!(
                "  {} AS {}",
                measure.sql_expression,
                quote_ident(&measure.name)
            ));
        }

        for dimension in &plan.dimensions {
            select_parts.push(format!(
                "  {} AS {}",
                dimension.sql_expression,
                quote_ident(&dimension.name)
            ));
        }

        for td in &plan.time_dimensions {
            select_parts.push(format!(
                "  {} AS {}",
                time_dimension_sql(td),
                quote_ident(&td.dimension.name)
            ));
        }

        sql.push_str(&select_parts.join(",\n"));
        sql.push('\n');

        // FROM clause
        sql.push_str(&format!("FROM {}\n", plan.dataset));

        // WHERE clause: date ranges, then dimension filters
        let mut where_parts = Vec::new();
        for td in &plan.time_dimensions {
            if let Some(range) = &td.date_range {
                let expr = operand(&td.dimension.sql_expression);
                where_parts.push(format!("{} >= {}", expr, quote_string(&range.start)));
                where_parts.push(format!("{} <= {}", expr, quote_string(&range.end)));
            }
        }

        // Filters on measures test aggregates and belong in HAVING
        let (measure_filters, dimension_filters): (Vec<&PlannedFilter>, Vec<&PlannedFilter>) =
            plan.filters.iter().partition(|f| f.member.is_measure());

        where_parts.extend(dimension_filters.iter().map(|f| filter_sql(f)));

        if !where_parts.is_empty() {
            sql.push_str(&format!("WHERE {}\n", where_parts.join(" AND ")));
        }

        // GROUP BY clause (if the query aggregates and selects other columns)
        let grouped = plan.dimensions.len() + plan.time_dimensions.len();
        let aggregates = !plan.measures.is_empty() || !measure_filters.is_empty();
        if aggregates && grouped > 0 {
            let first = plan.measures.len() + 1;
            let positions: Vec<String> = (first..first + grouped).map(|i| i.to_string()).collect();
            sql.push_str(&format!("GROUP BY {}\n", positions.join(", ")));
        }

        // HAVING clause
        if !measure_filters.is_empty() {
            let having: Vec<String> = measure_filters.iter().map(|f| filter_sql(f)).collect();
            sql.push_str(&format!("HAVING {}\n", having.join(" AND ")));
        }

        // ORDER BY clause
        if !plan.order.is_empty() {
            let order_parts: Vec<String> = plan
                .order
                .iter()
                .map(|entry| {
                    let key = quote_ident(entry.member.name());
                    if entry.desc {
                        format!("{key} DESC")
                    } else {
                        key
                    }
                })
                .collect();
            sql.push_str(&format!("ORDER BY {}\n", order_parts.join(", ")));
        }

        // LIMIT / OFFSET clauses
        if let Some(limit) = plan.limit {
            sql.push_str(&format!("LIMIT {}\n", limit));
        }
        if let Some(offset) = plan.offset {
            sql.push_str(&format!("OFFSET {}\n", offset));
        }

        let sql = sql.trim_end().to_string();
        debug!(dataset = %plan.dataset, sql = %sql, "Generated SQL");
        sql
    }
}

fn time_dimension_sql(td: &PlannedTimeDimension) -> String {
    match td.granularity {
        Some(g) => format!("DATE_TRUNC('{}', {})", g, td.dimension.sql_expression),
        None => td.dimension.sql_expression.clone(),
    }
}

fn filter_sql(filter: &PlannedFilter) -> String {
    let expr = operand(filter.member.sql_expression());

    match &filter.predicate {
        Predicate::Equals(values) => match values.as_slice() {
            [value] => format!("{} = {}", expr, quote_string(value)),
            _ => format!("{} IN ({})", expr, quoted_list(values)),
        },
        Predicate::NotEquals(values) => match values.as_slice() {
            [value] => format!("{} <> {}", expr, quote_string(value)),
            _ => format!("{} NOT IN ({})", expr, quoted_list(values)),
        },
        Predicate::Contains(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("{} ILIKE {} ESCAPE '\\'", expr, contains_pattern(v)))
                .collect();
            group(parts, " OR ")
        }
        Predicate::NotContains(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("{} NOT ILIKE {} ESCAPE '\\'", expr, contains_pattern(v)))
                .collect();
            group(parts, " AND ")
        }
        Predicate::Gt(value) => format!("{} > {}", expr, literal(value)),
        Predicate::Gte(value) => format!("{} >= {}", expr, literal(value)),
        Predicate::Lt(value) => format!("{} < {}", expr, literal(value)),
        Predicate::Lte(value) => format!("{} <= {}", expr, literal(value)),
        Predicate::Set => format!("{} IS NOT NULL", expr),
        Predicate::NotSet => format!("{} IS NULL", expr),
        Predicate::InDateRange(range) => format!("{} BETWEEN {}", expr, range_bounds(range)),
        Predicate::NotInDateRange(range) => {
            format!("{} NOT BETWEEN {}", expr, range_bounds(range))
        }
        Predicate::BeforeDate(value) => format!("{} < {}", expr, quote_string(value)),
        Predicate::AfterDate(value) => format!("{} > {}", expr, quote_string(value)),
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_string(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn range_bounds(range: &DateRange) -> String {
    format!(
        "{} AND {}",
        quote_string(&range.start),
        quote_string(&range.end)
    )
}

fn group(parts: Vec<String>, separator: &str) -> String {
    if parts.len() == 1 {
        parts.join("")
    } else {
        format!("({})", parts.join(separator))
    }
}
