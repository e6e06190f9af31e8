//! Read access to model objects by name. In k8s the models live in the api server, here the
//! scheduler only needs exact-name lookups, so the store is a trait with an in-memory
//! implementation used by the binary and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::core::model::OpenModel;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("openmodels \"{name}\" not found")]
    NotFound { name: String },
    #[error("failed to decode model object: {0}")]
    Decode(String),
    #[error("model store unavailable: {0}")]
    Unavailable(String),
}

pub trait ModelStore: Send + Sync {
    // Exact-name lookup of a cluster-scoped model. Missing models are an error.
    fn get_model(&self, name: &str) -> Result<OpenModel, StoreError>;
}

#[derive(Default)]
pub struct InMemoryModelStore {
    models: HashMap<String, OpenModel>,
    fetches: AtomicUsize,
}

impl InMemoryModelStore {
    pub fn new(models: Vec<OpenModel>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| (model.metadata.name.clone(), model))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        let models: Vec<OpenModel> =
            serde_yaml::from_str(yaml).map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(Self::new(models))
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of `get_model` calls served so far, found or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl ModelStore for InMemoryModelStore {
    fn get_model(&self, name: &str) -> Result<OpenModel, StoreError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_model_by_exact_name() {
        let store = InMemoryModelStore::new(vec![OpenModel::new("llama3-8b")]);
        assert_eq!(store.get_model("llama3-8b").unwrap().name(), "llama3-8b");
        assert_eq!(
            store.get_model("llama3").unwrap_err(),
            StoreError::NotFound {
                name: "llama3".to_string()
            }
        );
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::NotFound {
            name: "test-model".to_string(),
        };
        assert_eq!(err.to_string(), "openmodels \"test-model\" not found");
    }

    #[test]
    fn test_from_yaml() {
        let store = InMemoryModelStore::from_yaml(
            r#"
        - metadata:
            name: a
        - metadata:
            name: b
        "#,
        )
        .unwrap();
        assert_eq!(store.model_count(), 2);
        assert_eq!(store.fetch_count(), 0);

        assert!(matches!(
            InMemoryModelStore::from_yaml("metadata: 42"),
            Err(StoreError::Decode(_))
        ));
    }
}
