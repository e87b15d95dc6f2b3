//! SemanticLayer: the request-facing entry points
//!
//! Parses raw JSON payloads, resolves them against the registry, compiles
//! SQL, and either returns the SQL (explain mode) or hands it to an
//! [`Executor`].

use std::sync::Arc;

use tracing::debug;

use crate::config::DatasetDefinition;
use crate::core::{Dataset, DatasetRegistry, Dimension, Measure};
use crate::error::{Result, SemqueryError};
use crate::exec::{Executor, QueryResult};
use crate::sql::{validate, SemanticQuery, SqlGenerator};

/// Registration and query entry points over a shared registry
#[derive(Debug, Clone, Default)]
pub struct SemanticLayer {
    registry: Arc<DatasetRegistry>,
}

impl SemanticLayer {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    /// Register a dataset from separate measure and dimension JSON arrays
    pub fn register_dataset(
        &self,
        name: &str,
        measures_json: &str,
        dimensions_json: &str,
    ) -> Result<String> {
        let measures: Vec<Measure> = serde_json::from_str(measures_json)
            .map_err(|e| SemqueryError::InvalidSchema(format!("measures: {e}")))?;
        let dimensions: Vec<Dimension> = serde_json::from_str(dimensions_json)
            .map_err(|e| SemqueryError::InvalidSchema(format!("dimensions: {e}")))?;

        self.registry.register(Dataset {
            name: name.to_string(),
            measures,
            dimensions,
        })
    }

    /// Register a dataset from a single `{measures, dimensions, time_dimensions}`
    /// document; entries under `time_dimensions` become time-typed dimensions
    pub fn register_dataset_json(&self, name: &str, dataset_json: &str) -> Result<String> {
        let mut definition: DatasetDefinition = serde_json::from_str(dataset_json)
            .map_err(|e| SemqueryError::InvalidSchema(e.to_string()))?;
        definition.name = name.to_string();
        self.registry.register(definition.into_dataset())
    }

    /// Parse a JSON semantic query
    pub fn parse_query(&self, query_json: &str) -> Result<SemanticQuery> {
        serde_json::from_str(query_json).map_err(|e| SemqueryError::InvalidJson(e.to_string()))
    }

    /// Compile a JSON semantic query to SQL
    pub fn compile(&self, query_json: &str) -> Result<String> {
        let query = self.parse_query(query_json)?;
        self.compile_query(&query)
    }

    /// Compile an already parsed query to SQL
    pub fn compile_query(&self, query: &SemanticQuery) -> Result<String> {
        let plan = validate(&self.registry, query)?;
        Ok(SqlGenerator::new().generate(&plan))
    }

    /// Run a JSON semantic query.
    ///
    /// With `explain` the result is a single `compiled_sql` row and the
    /// executor is not called. Otherwise the executor's rows are returned as
    /// they come; its errors surface as [`SemqueryError::Execution`] with the
    /// original message.
    pub fn semantic_query(
        &self,
        query_json: &str,
        explain: bool,
        executor: &dyn Executor,
    ) -> Result<QueryResult> {
        let sql = self.compile(query_json)?;

        if explain {
            return Ok(QueryResult::explain(sql));
        }

        debug!(sql = %sql, "Executing compiled semantic query");
        executor.execute(&sql).map_err(SemqueryError::Execution)
    }

    /// Explain-only variant that needs no executor
    pub fn explain(&self, query_json: &str) -> Result<QueryResult> {
        self.compile(query_json).map(QueryResult::explain)
    }
}
