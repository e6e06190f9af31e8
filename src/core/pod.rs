//! Type definition for Pod primitive in k8s cluster

use serde::{Deserialize, Serialize};

use crate::core::common::ObjectMeta;

/// Label which selects the scheduling profile for a pod.
pub const SCHEDULER_NAME_LABEL: &str = "scheduler_name";

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Pod {
    pub metadata: ObjectMeta,
}

impl Pod {
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

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .annotations
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn scheduler_name(&self) -> Option<&str> {
        self.metadata
            .labels
            .get(SCHEDULER_NAME_LABEL)
            .map(|name| name.as_str())
    }
}
