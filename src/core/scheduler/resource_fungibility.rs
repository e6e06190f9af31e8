//! ResourceFungibility plugin. Filters out nodes which can't serve any of the hardware flavors
//! declared by the pod's model and prefers nodes matching the flavors declared first.
//!
//! PreFilter resolves the flavors once per cycle and stores them in the cycle state, Filter
//! and Score read them back for every node. PreScore repeats the skip decision so the host
//! can avoid fanning out Score calls for pods which don't use flavors.

use std::sync::Arc;

use log::{debug, error, warn};

use crate::config::ResourceFungibilityArgs;
use crate::core::model_store::ModelStore;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::cycle_state::{CycleState, StateData};
use crate::core::scheduler::flavors::{
    self, first_matching_ordinal, ordinal_score, Resolution, ResolvedFlavors, SCORE_WEIGHTS,
};
use crate::core::scheduler::plugin::{
    FilterPlugin, Handle, Plugin, PluginError, PreFilterPlugin, PreScorePlugin, ScorePlugin,
    MIN_NODE_SCORE,
};
use crate::core::scheduler::status::Status;

pub const NAME: &str = "ResourceFungibility";
const STATE_KEY: &str = NAME;

pub const ERR_REASON_NO_MATCHING_FLAVOR: &str = "node(s) didn't match any inference flavor";

/// What PreFilter learned about the pod, read by the later extension points.
#[derive(Debug, Clone, PartialEq)]
pub struct FungibilityState {
    pub flavors: ResolvedFlavors,
    /// The pod doesn't use flavors; every later extension point is a no-op.
    pub skip: bool,
}

impl StateData for FungibilityState {}

pub struct ResourceFungibility {
    args: ResourceFungibilityArgs,
    model_store: Arc<dyn ModelStore>,
}

impl ResourceFungibility {
    pub fn new(args: ResourceFungibilityArgs, model_store: Arc<dyn ModelStore>) -> Self {
        Self { args, model_store }
    }

    pub fn factory(handle: &Handle) -> Box<dyn Plugin> {
        Box::new(Self::new(
            handle.args.resource_fungibility.clone(),
            handle.model_store.clone(),
        ))
    }

    fn state<'a>(&self, cycle_state: &'a CycleState) -> Result<&'a FungibilityState, PluginError> {
        Ok(cycle_state.read::<FungibilityState>(STATE_KEY)?)
    }
}

impl Plugin for ResourceFungibility {
    fn name(&self) -> &'static str {
        NAME
    }

    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        Some(self)
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        Some(self)
    }

    fn as_pre_score(&self) -> Option<&dyn PreScorePlugin> {
        Some(self)
    }

    fn as_score(&self) -> Option<&dyn ScorePlugin> {
        Some(self)
    }
}

impl PreFilterPlugin for ResourceFungibility {
    fn pre_filter(&self, cycle_state: &mut CycleState, pod: &Pod) -> Result<Status, PluginError> {
        let resolution = flavors::resolve(
            self.model_store.as_ref(),
            &self.args,
            &pod.metadata.labels,
            &pod.metadata.annotations,
        )?;

        let (state, status) = match resolution {
            Resolution::Skip { reason } => {
                let status = match reason {
                    Some(reason) => {
                        debug!("pod {:?} skipped: {}", pod.metadata.name, reason);
                        Status::skip_with_reason(reason)
                    }
                    None => Status::skip(),
                };
                let state = FungibilityState {
                    flavors: ResolvedFlavors::new(vec![]),
                    skip: true,
                };
                (state, status)
            }
            Resolution::Resolved(flavors) => {
                debug!(
                    "pod {:?} resolved flavors {:?}, bypass hardware match: {}",
                    pod.metadata.name,
                    flavors.names(),
                    flavors.bypass_hardware_match
                );
                // Every node passes Filter when some flavor fits anywhere, so let the host
                // skip it. Score still runs.
                let status = if flavors.bypass_hardware_match {
                    Status::skip()
                } else {
                    Status::success()
                };
                let state = FungibilityState {
                    flavors,
                    skip: false,
                };
                (state, status)
            }
        };

        cycle_state.write(STATE_KEY, Box::new(state));
        Ok(status)
    }
}

impl FilterPlugin for ResourceFungibility {
    fn filter(&self, cycle_state: &CycleState, _pod: &Pod, node: &Node) -> Result<Status, PluginError> {
        let state = self.state(cycle_state)?;
        if state.skip || flavors::is_eligible(&state.flavors, node.labels()) {
            return Ok(Status::success());
        }
        Ok(Status::unschedulable_and_unresolvable(
            ERR_REASON_NO_MATCHING_FLAVOR,
        ))
    }
}

impl PreScorePlugin for ResourceFungibility {
    fn pre_score(
        &self,
        cycle_state: &CycleState,
        _pod: &Pod,
        _nodes: &[&Node],
    ) -> Result<Status, PluginError> {
        let state = self.state(cycle_state)?;
        if state.skip {
            return Ok(Status::skip());
        }
        Ok(Status::success())
    }
}

impl ScorePlugin for ResourceFungibility {
    fn score(&self, cycle_state: &CycleState, pod: &Pod, node: &Node) -> Result<i64, PluginError> {
        let state = self.state(cycle_state)?;
        if state.skip {
            return Ok(MIN_NODE_SCORE);
        }

        let Some(ordinal) = first_matching_ordinal(&state.flavors, node.labels()) else {
            // Filter should have rejected this node.
            warn!(
                "node {:?} matches none of the flavors {:?} of pod {:?}, scoring it {}",
                node.name(),
                state.flavors.names(),
                pod.metadata.name,
                MIN_NODE_SCORE
            );
            return Ok(MIN_NODE_SCORE);
        };

        match ordinal_score(ordinal) {
            Some(score) => Ok(score),
            None => {
                error!(
                    "flavor {:?} of pod {:?} is at position {} but only {} score weights exist",
                    state.flavors.flavors[ordinal].name,
                    pod.metadata.name,
                    ordinal,
                    SCORE_WEIGHTS.len()
                );
                Ok(MIN_NODE_SCORE)
            }
        }
    }
}
