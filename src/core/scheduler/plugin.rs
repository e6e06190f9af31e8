//! Scheduling framework plugin interfaces and the registry of known plugins.
//!
//! A plugin implements `Plugin` and exposes the extension points it takes part in through the
//! `as_*` accessors. Within one cycle the host calls PreFilter once, Filter once per node,
//! PreScore once and Score once per feasible node, passing the same `CycleState` through.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::config::PluginArgs;
use crate::core::model_store::{ModelStore, StoreError};
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::cycle_state::{CycleState, CycleStateError};
use crate::core::scheduler::resource_fungibility::{self, ResourceFungibility};
use crate::core::scheduler::status::Status;

pub const MIN_NODE_SCORE: i64 = 0;
pub const MAX_NODE_SCORE: i64 = 100;

/// Errors which abort the whole scheduling cycle of a pod.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PluginError {
    #[error(transparent)]
    Store(#[from] StoreError),
    // The host called a later extension point without running PreFilter in the same cycle.
    #[error(transparent)]
    CycleState(#[from] CycleStateError),
}

/// Everything a plugin factory may need from the host.
#[derive(Clone)]
pub struct Handle {
    pub args: PluginArgs,
    pub model_store: Arc<dyn ModelStore>,
}

pub type PluginFactory = fn(&Handle) -> Box<dyn Plugin>;

lazy_static! {
    pub static ref PLUGIN_REGISTRY: HashMap<&'static str, PluginFactory> = {
        HashMap::from([(
            resource_fungibility::NAME,
            ResourceFungibility::factory as PluginFactory,
        )])
    };
}

pub fn new_plugin(name: &str, handle: &Handle) -> Option<Box<dyn Plugin>> {
    PLUGIN_REGISTRY.get(name).map(|factory| factory(handle))
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        None
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        None
    }

    fn as_pre_score(&self) -> Option<&dyn PreScorePlugin> {
        None
    }

    fn as_score(&self) -> Option<&dyn ScorePlugin> {
        None
    }
}

pub trait PreFilterPlugin: Send + Sync {
    // Computes per-cycle state for the pod and writes it to `state`. A skip status tells the
    // host not to run this plugin's Filter for the pod.
    fn pre_filter(&self, state: &mut CycleState, pod: &Pod) -> Result<Status, PluginError>;
}

pub trait FilterPlugin: Send + Sync {
    fn filter(&self, state: &CycleState, pod: &Pod, node: &Node) -> Result<Status, PluginError>;
}

pub trait PreScorePlugin: Send + Sync {
    // A skip status tells the host not to run this plugin's Score for the pod.
    fn pre_score(
        &self,
        state: &CycleState,
        pod: &Pod,
        nodes: &[&Node],
    ) -> Result<Status, PluginError>;
}

pub trait ScorePlugin: Send + Sync {
    // Returns a score in [MIN_NODE_SCORE, MAX_NODE_SCORE].
    fn score(&self, state: &CycleState, pod: &Pod, node: &Node) -> Result<i64, PluginError>;
}
