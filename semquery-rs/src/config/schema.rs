//! Serialized shape of dataset definitions

use serde::{Deserialize, Serialize};

use crate::core::{Dataset, Dimension, DimensionType, Measure};

/// Top-level definitions document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionsFile {
    #[serde(default)]
    pub datasets: Vec<DatasetDefinition>,
}

/// One dataset as written in a definitions file
///
/// ```yaml
/// name: orders_ds
/// measures:
///   - name: orders_ds.total_revenue
///     sql: SUM(order_amount)
///     type: sum
/// dimensions:
///   - name: orders_ds.customer_id
///     sql: customer_id
/// time_dimensions:
///   - name: orders_ds.order_date
///     sql: order_date
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    /// Shorthand for dimensions of type `time`
    #[serde(default)]
    pub time_dimensions: Vec<Dimension>,
}

impl DatasetDefinition {
    pub fn into_dataset(self) -> Dataset {
        let mut dimensions = self.dimensions;
        dimensions.extend(
            self.time_dimensions
                .into_iter()
                .map(|d| d.with_type(DimensionType::Time)),
        );

        Dataset {
            name: self.name,
            measures: self.measures,
            dimensions,
        }
    }
}
