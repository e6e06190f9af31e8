//! Type definitions for the node objects the scheduler evaluates as candidates.

use serde::{Deserialize, Serialize};

use crate::core::common::{Labels, ObjectMeta};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Node {
    pub metadata: ObjectMeta,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .labels
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    // Read-only label snapshot the plugins match flavors against.
    pub fn labels(&self) -> &Labels {
        &self.metadata.labels
    }
}
