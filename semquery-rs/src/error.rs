//! Error types for semquery

use thiserror::Error;

/// Boxed error returned by an [`Executor`](crate::exec::Executor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum SemqueryError {
    #[error("Invalid JSON in semantic query: {0}")]
    InvalidJson(String),

    #[error("Dataset '{0}' not found in registry")]
    DatasetNotFound(String),

    #[error("Measure '{measure}' not found in dataset '{dataset}'")]
    MeasureNotFound { dataset: String, measure: String },

    #[error("Dimension '{dimension}' not found in dataset '{dataset}'")]
    DimensionNotFound { dataset: String, dimension: String },

    #[error("Member '{member}' not found in dataset '{dataset}'")]
    MemberNotFound { dataset: String, member: String },

    #[error("Invalid granularity '{granularity}' for time dimension '{dimension}' (expected one of: {expected})")]
    InvalidGranularity {
        dimension: String,
        granularity: String,
        expected: String,
    },

    #[error("Invalid filter on '{dimension}': {reason}")]
    InvalidFilter { dimension: String, reason: String },

    #[error("Invalid date range for '{dimension}': {reason}")]
    InvalidDateRange { dimension: String, reason: String },

    #[error("No valid measures or dimensions specified")]
    EmptyQuery,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid dataset schema: {0}")]
    InvalidSchema(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Execution(#[source] BoxError),
}

impl SemqueryError {
    pub fn invalid_filter(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        SemqueryError::InvalidFilter {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_date_range(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        SemqueryError::InvalidDateRange {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SemqueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_messages() {
        let err = SemqueryError::DatasetNotFound("nope".into());
        assert_eq!(err.to_string(), "Dataset 'nope' not found in registry");

        let err = SemqueryError::MeasureNotFound {
            dataset: "orders_ds".into(),
            measure: "invalid_measure".into(),
        };
        assert_eq!(
            err.to_string(),
            "Measure 'invalid_measure' not found in dataset 'orders_ds'"
        );

        assert!(SemqueryError::EmptyQuery
            .to_string()
            .contains("No valid measures or dimensions"));
    }

    #[test]
    fn test_execution_error_is_passed_through() {
        let inner: BoxError = "Catalog Error: Table with name orders_ds does not exist!".into();
        let err = SemqueryError::Execution(inner);
        assert_eq!(
            err.to_string(),
            "Catalog Error: Table with name orders_ds does not exist!"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
