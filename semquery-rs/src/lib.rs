//! semquery: a semantic query layer for DuckDB
//!
//! Datasets declare named measures and dimensions over SQL expressions.
//! JSON semantic queries reference those members by name and are validated
//! and compiled into DuckDB SQL. Execution is left to an [`Executor`].
//!
//! ```rust
//! use semquery::SemanticLayer;
//!
//! let layer = SemanticLayer::default();
//! layer
//!     .register_dataset(
//!         "orders_ds",
//!         r#"[{"name": "orders_ds.total_revenue", "sql_expression": "SUM(order_amount)", "aggregation_type": "sum"}]"#,
//!         r#"[{"name": "orders_ds.customer_id", "sql_expression": "customer_id"}]"#,
//!     )
//!     .unwrap();
//!
//! let sql = layer
//!     .compile(r#"{"dataset": "orders_ds", "measures": ["orders_ds.total_revenue"], "dimensions": ["orders_ds.customer_id"]}"#)
//!     .unwrap();
//! assert!(sql.contains("GROUP BY 2"));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod exec;
pub mod ffi;
pub mod layer;
pub mod sql;

pub use crate::core::{
    AggregationType, Dataset, DatasetRegistry, Dimension, DimensionType, Measure, Member,
};
pub use error::{BoxError, Result, SemqueryError};
pub use exec::{Executor, QueryResult};
pub use layer::SemanticLayer;
pub use sql::{SemanticQuery, SqlGenerator};
