//! Represents generic format of the input for the scheduler: the cluster state with nodes and
//! models, and the workload with pods waiting to be scheduled.

use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::core::model::OpenModel;
use crate::core::node::Node;
use crate::core::pod::Pod;

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GenericClusterTrace {
    #[serde(default)]
    pub nodes: Vec<Node>,
    // OpenModel objects the model store serves.
    #[serde(default)]
    pub models: Vec<OpenModel>,
}

/// Pods are scheduled one by one in the order they appear in the trace.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GenericWorkloadTrace {
    #[serde(default)]
    pub pods: Vec<Pod>,
}

impl GenericClusterTrace {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

impl GenericWorkloadTrace {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::model::Flavor;

    #[test]
    fn test_deserialize_empty_traces() {
        assert_eq!(
            GenericClusterTrace::from_yaml("{}").unwrap(),
            GenericClusterTrace::default()
        );
        assert_eq!(
            GenericWorkloadTrace::from_yaml("pods: []").unwrap(),
            GenericWorkloadTrace::default()
        );
    }

    #[test]
    fn test_deserialize_cluster_trace() {
        let trace = GenericClusterTrace::from_yaml(
            r#"
        nodes:
        - metadata:
            name: gpu_node
            labels:
              karpenter.k8s.aws/instance-gpu-name: a100
        - metadata:
            name: cpu_node
        models:
        - metadata:
            name: llama3
          spec:
            inference_config:
              flavors:
              - name: a100
                node_selector:
                  karpenter.k8s.aws/instance-gpu-name: a100
        "#,
        )
        .unwrap();

        assert_eq!(
            trace,
            GenericClusterTrace {
                nodes: vec![
                    Node::new("gpu_node").with_label("karpenter.k8s.aws/instance-gpu-name", "a100"),
                    Node::new("cpu_node"),
                ],
                models: vec![OpenModel::new("llama3").with_flavors(vec![Flavor::new(
                    "a100",
                    &[("karpenter.k8s.aws/instance-gpu-name", "a100")]
                )])],
            }
        );
    }

    #[test]
    fn test_deserialize_workload_trace() {
        let trace = GenericWorkloadTrace::from_yaml(
            r#"
        pods:
        - metadata:
            name: pod_0
            labels:
              llmaz.io/model-name: llama3
            annotations:
              llmaz.io/inference-service-flavors: a100,t4
        "#,
        )
        .unwrap();

        assert_eq!(
            trace.pods,
            vec![Pod::new("pod_0")
                .with_label("llmaz.io/model-name", "llama3")
                .with_annotation("llmaz.io/inference-service-flavors", "a100,t4")]
        );
    }

    #[test]
    fn test_malformed_trace() {
        assert!(matches!(
            GenericClusterTrace::from_yaml("nodes: 42"),
            Err(ConfigError::Parse(_))
        ));
    }
}
