use thiserror::Error;

use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::plugin::PluginError;
use crate::core::scheduler::status::Status;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("no nodes available to schedule pods")]
    NoNodesInCluster,
    #[error("scheduling profile {0:?} not found")]
    UnknownProfile(String),
    #[error("plugin {0:?} is not registered")]
    UnknownPlugin(String),
    #[error("plugin {plugin:?} has score weight {weight}, expected a weight in 1..=100")]
    InvalidWeight { plugin: String, weight: i64 },
    #[error("plugin {plugin:?} does not implement {extension_point}")]
    UnsupportedExtensionPoint {
        plugin: String,
        extension_point: &'static str,
    },
    #[error("0/{total_nodes} nodes are available")]
    NoSufficientNodes {
        total_nodes: usize,
        rejections: Vec<NodeRejection>,
    },
    #[error("total score of node {node:?} overflows")]
    ScoreOverflow { node: String },
    #[error("running {plugin} plugin: {source}")]
    Plugin {
        plugin: &'static str,
        source: PluginError,
    },
}

/// Why a node was excluded from the candidates of a pod.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRejection {
    pub node_name: String,
    pub plugin: &'static str,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeScore {
    pub node_name: String,
    // Sum of weighted scores of all score plugins which ran for the pod.
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleResult {
    pub suggested_host: String,
    pub evaluated_nodes: usize,
    pub feasible_nodes: usize,
    // Feasible nodes in input order.
    pub node_scores: Vec<NodeScore>,
}

// Trait which should implement any scheduler in kubernetriks framework.
pub trait PodSchedulingAlgorithm {
    // A method to assign a node on which the pod will be executed.
    // Returns the chosen node with the scores of all feasible nodes, or a scheduling error.
    fn schedule_one(&self, pod: &Pod, nodes: &[Node]) -> Result<ScheduleResult, ScheduleError>;
}
