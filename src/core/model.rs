//! Type definitions for the model objects which declare the hardware flavors an inference
//! workload may run on.

use serde::{Deserialize, Serialize};

use crate::core::common::{Labels, ObjectMeta};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Flavor {
    pub name: String,
    // None and an empty selector both mean the flavor fits on any node.
    #[serde(default)]
    pub node_selector: Option<Labels>,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Flavors in preference order, the first one is the most preferred. At most 8 entries,
    /// which is validated by whoever creates the model.
    #[serde(default)]
    pub flavors: Vec<Flavor>,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelSpec {
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub inference_config: Option<InferenceConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OpenModel {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ModelSpec,
}

impl OpenModel {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            spec: Default::default(),
        }
    }

    pub fn with_flavors(mut self, flavors: Vec<Flavor>) -> Self {
        self.spec.inference_config = Some(InferenceConfig { flavors });
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl Flavor {
    pub fn new(name: &str, node_selector: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            node_selector: Some(
                node_selector
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_yaml_keeps_flavor_order() {
        let model: OpenModel = serde_yaml::from_str(
            r#"
        metadata:
          name: llama3-8b
        spec:
          family_name: llama3
          inference_config:
            flavors:
            - name: t4
              node_selector:
                karpenter.k8s.aws/instance-gpu-name: t4
            - name: a100
              node_selector:
                karpenter.k8s.aws/instance-gpu-name: a100
            - name: any
        "#,
        )
        .unwrap();

        let flavors = &model.spec.inference_config.as_ref().unwrap().flavors;
        let names: Vec<&str> = flavors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["t4", "a100", "any"]);
        assert_eq!(flavors[2].node_selector, None);
        assert_eq!(model.name(), "llama3-8b");
    }

    #[test]
    fn test_model_without_inference_config() {
        let model: OpenModel = serde_yaml::from_str(
            r#"
        metadata:
          name: test-model
        "#,
        )
        .unwrap();
        assert_eq!(model.spec.inference_config, None);
    }
}
