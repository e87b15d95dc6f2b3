//! DatasetRegistry: the shared catalog of registered datasets

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use tracing::info;

use crate::core::model::Dataset;
use crate::error::{Result, SemqueryError};

/// Dataset names are spliced into `FROM`, so they must be plain identifiers
/// (optionally `catalog.schema.table` qualified).
static TABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*){0,2}$")
        .expect("table reference pattern is valid")
});

/// Registry of datasets keyed by name.
///
/// Datasets are immutable once registered; re-registering a name swaps the
/// whole `Arc<Dataset>` under the write lock, so a concurrent lookup sees
/// either the old or the new definition.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: RwLock<HashMap<String, Arc<Dataset>>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a dataset, replacing any previous definition
    pub fn register(&self, dataset: Dataset) -> Result<String> {
        validate_dataset(&dataset)?;

        let name = dataset.name.clone();
        let measures = dataset.measures.len();
        let dimensions = dataset.dimensions.len();

        let previous = self
            .datasets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(dataset));

        info!(
            dataset = %name,
            measures,
            dimensions,
            replaced = previous.is_some(),
            "Dataset registered"
        );

        Ok(format!("Dataset '{}' registered successfully", name))
    }

    /// Look up a dataset by name
    pub fn lookup(&self, name: &str) -> Result<Arc<Dataset>> {
        self.get(name)
            .ok_or_else(|| SemqueryError::DatasetNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dataset>> {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered dataset names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Remove a dataset, returning whether it was registered
    pub fn remove(&self, name: &str) -> bool {
        let removed = self
            .datasets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            info!(dataset = %name, "Dataset removed");
        }
        removed
    }

    pub fn clear(&self) {
        let mut datasets = self.datasets.write().unwrap_or_else(PoisonError::into_inner);
        info!(datasets = datasets.len(), "Registry cleared");
        datasets.clear();
    }

    pub fn len(&self) -> usize {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_dataset(dataset: &Dataset) -> Result<()> {
    if dataset.name.trim().is_empty() {
        return Err(SemqueryError::InvalidSchema(
            "dataset name must not be empty".into(),
        ));
    }
    if !TABLE_REFERENCE.is_match(&dataset.name) {
        return Err(SemqueryError::InvalidSchema(format!(
            "dataset name '{}' is not a valid table reference",
            dataset.name
        )));
    }

    let mut seen = HashSet::new();
    for measure in &dataset.measures {
        validate_member("measure", &measure.name, &measure.sql_expression)?;
        if !seen.insert(measure.name.as_str()) {
            return Err(SemqueryError::InvalidSchema(format!(
                "duplicate measure '{}' in dataset '{}'",
                measure.name, dataset.name
            )));
        }
    }

    let mut seen = HashSet::new();
    for dimension in &dataset.dimensions {
        validate_member("dimension", &dimension.name, &dimension.sql_expression)?;
        if !seen.insert(dimension.name.as_str()) {
            return Err(SemqueryError::InvalidSchema(format!(
                "duplicate dimension '{}' in dataset '{}'",
                dimension.name, dataset.name
            )));
        }
    }

    Ok(())
}

fn validate_member(kind: &str, name: &str, sql_expression: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SemqueryError::InvalidSchema(format!(
            "{kind} name must not be empty"
        )));
    }
    if sql_expression.trim().is_empty() {
        return Err(SemqueryError::InvalidSchema(format!(
            "{kind} '{name}' has an empty sql_expression"
        )));
    }
    check_sql_fragment(sql_expression).map_err(|reason| {
        SemqueryError::InvalidSchema(format!("{kind} '{name}': {reason}"))
    })
}

/// Expressions are spliced into the SELECT list verbatim; reject anything
/// that could end the statement or comment out the rest of it.
fn check_sql_fragment(sql: &str) -> std::result::Result<(), String> {
    let dialect = DuckDbDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| format!("cannot tokenize sql_expression: {e}"))?;

    for token in tokens {
        match token {
            Token::SemiColon => return Err("sql_expression must not contain ';'".into()),
            Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => {
                return Err("sql_expression must not contain comments".into())
            }
            _ => {}
        }
    }
    Ok(())
}
