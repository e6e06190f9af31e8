use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key-value tags attached to an object. Nodes use them to advertise hardware, workloads use
/// them to name the model they serve.
pub type Labels = HashMap<String, String>;

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl ObjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

// Returns true if every key of `required` is present in `labels` with the same value.
// An empty `required` matches everything.
pub fn labels_match(required: &Labels, labels: &Labels) -> bool {
    required
        .iter()
        .all(|(key, value)| labels.get(key).is_some_and(|v| v == value))
}
