//! Core semantic layer types and the dataset registry

mod model;
mod registry;

pub use model::{AggregationType, Dataset, Dimension, DimensionType, Measure, Member};
pub use registry::DatasetRegistry;
