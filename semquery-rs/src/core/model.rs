//! Catalog types: Dataset, Measure, Dimension

use serde::{Deserialize, Serialize};

/// Aggregation applied by a measure's SQL expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    #[default]
    Sum,
    Count,
    CountDistinct,
    Avg,
    Min,
    Max,
    Median,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Count => "count",
            AggregationType::CountDistinct => "count_distinct",
            AggregationType::Avg => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Median => "median",
        }
    }
}

/// Dimension type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    #[default]
    Categorical,
    Time,
    Number,
    Boolean,
}

/// A measure is an aggregated value exposed by a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Measure {
    pub name: String,
    /// Aggregate SQL expression, emitted verbatim (e.g. `SUM(order_amount)`)
    #[serde(alias = "sql")]
    pub sql_expression: String,
    #[serde(default, alias = "type")]
    pub aggregation_type: AggregationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Measure {
    pub fn new(
        name: impl Into<String>,
        sql_expression: impl Into<String>,
        aggregation_type: AggregationType,
    ) -> Self {
        Self {
            name: name.into(),
            sql_expression: sql_expression.into(),
            aggregation_type,
            description: None,
        }
    }

    pub fn sum(name: impl Into<String>, sql_expression: impl Into<String>) -> Self {
        Self::new(name, sql_expression, AggregationType::Sum)
    }

    pub fn count(name: impl Into<String>, sql_expression: impl Into<String>) -> Self {
        Self::new(name, sql_expression, AggregationType::Count)
    }

    pub fn avg(name: impl Into<String>, sql_expression: impl Into<String>) -> Self {
        Self::new(name, sql_expression, AggregationType::Avg)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A dimension is a non-aggregated attribute used for grouping and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dimension {
    pub name: String,
    #[serde(alias = "sql")]
    pub sql_expression: String,
    #[serde(default)]
    pub r#type: DimensionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, sql_expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_expression: sql_expression.into(),
            r#type: DimensionType::Categorical,
            description: None,
        }
    }

    pub fn time(name: impl Into<String>, sql_expression: impl Into<String>) -> Self {
        Self {
            r#type: DimensionType::Time,
            ..Self::new(name, sql_expression)
        }
    }

    pub fn with_type(mut self, r#type: DimensionType) -> Self {
        self.r#type = r#type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_time(&self) -> bool {
        self.r#type == DimensionType::Time
    }
}

/// A named logical table exposing measures and dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measures: Vec::new(),
            dimensions: Vec::new(),
        }
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Find a measure by name
    pub fn get_measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }

    /// Find a dimension by name
    pub fn get_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Resolve a name against measures first, then dimensions
    pub fn get_member(&self, name: &str) -> Option<Member> {
        self.get_measure(name)
            .cloned()
            .map(Member::Measure)
            .or_else(|| self.get_dimension(name).cloned().map(Member::Dimension))
    }
}

/// A resolved catalog member
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Measure(Measure),
    Dimension(Dimension),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Measure(m) => &m.name,
            Member::Dimension(d) => &d.name,
        }
    }

    pub fn sql_expression(&self) -> &str {
        match self {
            Member::Measure(m) => &m.sql_expression,
            Member::Dimension(d) => &d.sql_expression,
        }
    }

    pub fn is_measure(&self) -> bool {
        matches!(self, Member::Measure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Dataset {
        Dataset::new("orders_ds")
            .with_measure(Measure::sum("orders_ds.total_revenue", "SUM(order_amount)"))
            .with_measure(Measure::count("orders_ds.order_count", "COUNT(*)"))
            .with_dimension(Dimension::time("orders_ds.order_date", "order_date"))
            .with_dimension(Dimension::new("orders_ds.customer_id", "customer_id"))
    }

    #[test]
    fn test_dataset_lookup() {
        let ds = orders();
        assert!(ds.get_measure("orders_ds.total_revenue").is_some());
        assert!(ds.get_dimension("orders_ds.order_date").unwrap().is_time());
        assert!(ds.get_measure("orders_ds.order_date").is_none());
        assert!(ds.get_dimension("missing").is_none());
    }

    #[test]
    fn test_member_resolution_prefers_measures() {
        let ds = orders();
        let member = ds.get_member("orders_ds.order_count").unwrap();
        assert!(member.is_measure());
        assert_eq!(member.sql_expression(), "COUNT(*)");

        let member = ds.get_member("orders_ds.customer_id").unwrap();
        assert!(!member.is_measure());
        assert_eq!(member.name(), "orders_ds.customer_id");
    }

    #[test]
    fn test_measure_json_shapes() {
        let measure: Measure = serde_json::from_str(
            r#"{"name": "m", "sql_expression": "AVG(x)", "aggregation_type": "avg"}"#,
        )
        .unwrap();
        assert_eq!(measure.aggregation_type, AggregationType::Avg);

        // Combined registration form uses `sql` and `type`, defaulting to sum
        let measure: Measure =
            serde_json::from_str(r#"{"name": "m", "sql": "SUM(x)"}"#).unwrap();
        assert_eq!(measure.sql_expression, "SUM(x)");
        assert_eq!(measure.aggregation_type, AggregationType::Sum);

        let measure: Measure =
            serde_json::from_str(r#"{"name": "m", "sql": "COUNT(DISTINCT x)", "type": "count_distinct"}"#)
                .unwrap();
        assert_eq!(measure.aggregation_type, AggregationType::CountDistinct);

        assert!(serde_json::from_str::<Measure>(
            r#"{"name": "m", "sql_expression": "x", "aggregation_type": "stddev"}"#
        )
        .is_err());
    }
}
