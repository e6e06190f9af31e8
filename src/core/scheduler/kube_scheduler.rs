//! Implementation of kube-scheduler component which runs one scheduling cycle per pod through
//! the plugins of the pod's profile.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use log::debug;

use crate::config::{PluginConfig, PluginsConfig, ProfileConfig, SchedulerConfig};
use crate::core::model_store::ModelStore;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::cycle_state::CycleState;
use crate::core::scheduler::interface::{
    NodeRejection, NodeScore, PodSchedulingAlgorithm, ScheduleError, ScheduleResult,
};
use crate::core::scheduler::plugin::{new_plugin, Handle, Plugin};
use crate::core::scheduler::resource_fungibility;
use crate::core::scheduler::status::Status;

pub const MIN_SCORE_PLUGIN_WEIGHT: i64 = 1;
pub const MAX_SCORE_PLUGIN_WEIGHT: i64 = 100;

pub struct KubeScheduler {
    // Profiles are scheduling profiles that kube-scheduler supports. Pods can
    // choose to be scheduled under a particular profile by setting its associated
    // scheduler name in labels. Pods that don't specify any scheduler name are scheduled
    // with the default profile, if present here.
    pub config: KubeSchedulerConfig,
}

pub struct KubeSchedulerConfig {
    pub default_scheduler_name: String,
    // Map from scheduler name to scheduler profile
    pub profiles: HashMap<String, KubeSchedulerProfile>,
    // Number of threads running Filter, each with its own copy of the cycle state.
    pub parallelism: usize,
}

pub struct KubeSchedulerProfile {
    pub scheduler_name: String,
    pub plugins: Plugins,
}

// Plugin instances enabled at each extension point. A plugin enabled at several extension
// points is a single instance shared by all of them.
#[derive(Default)]
pub struct Plugins {
    pub pre_filter: Vec<Arc<dyn Plugin>>,
    pub filter: Vec<Arc<dyn Plugin>>,
    pub pre_score: Vec<Arc<dyn Plugin>>,
    // Score plugins with their weights.
    pub score: Vec<(Arc<dyn Plugin>, i64)>,
}

pub fn default_profile_config(scheduler_name: &str) -> ProfileConfig {
    let enabled = || {
        vec![PluginConfig {
            name: resource_fungibility::NAME.to_string(),
            weight: None,
        }]
    };
    ProfileConfig {
        scheduler_name: scheduler_name.to_string(),
        plugins: PluginsConfig {
            pre_filter: enabled(),
            filter: enabled(),
            pre_score: enabled(),
            score: vec![PluginConfig {
                name: resource_fungibility::NAME.to_string(),
                weight: Some(1),
            }],
        },
    }
}

impl KubeSchedulerProfile {
    fn new(config: &ProfileConfig, handle: &Handle) -> Result<Self, ScheduleError> {
        let mut instances: HashMap<String, Arc<dyn Plugin>> = HashMap::new();
        let mut instance = |name: &str| -> Result<Arc<dyn Plugin>, ScheduleError> {
            if let Some(plugin) = instances.get(name) {
                return Ok(plugin.clone());
            }
            let plugin: Arc<dyn Plugin> = new_plugin(name, handle)
                .ok_or_else(|| ScheduleError::UnknownPlugin(name.to_string()))?
                .into();
            instances.insert(name.to_string(), plugin.clone());
            Ok(plugin)
        };

        let mut plugins = Plugins::default();
        for enabled in config.plugins.pre_filter.iter() {
            let plugin = instance(&enabled.name)?;
            check_extension_point(&*plugin, "PreFilter", plugin.as_pre_filter().is_some())?;
            plugins.pre_filter.push(plugin);
        }
        for enabled in config.plugins.filter.iter() {
            let plugin = instance(&enabled.name)?;
            check_extension_point(&*plugin, "Filter", plugin.as_filter().is_some())?;
            plugins.filter.push(plugin);
        }
        for enabled in config.plugins.pre_score.iter() {
            let plugin = instance(&enabled.name)?;
            check_extension_point(&*plugin, "PreScore", plugin.as_pre_score().is_some())?;
            plugins.pre_score.push(plugin);
        }
        for enabled in config.plugins.score.iter() {
            let plugin = instance(&enabled.name)?;
            check_extension_point(&*plugin, "Score", plugin.as_score().is_some())?;
            let weight = enabled.weight.unwrap_or(MIN_SCORE_PLUGIN_WEIGHT);
            if !(MIN_SCORE_PLUGIN_WEIGHT..=MAX_SCORE_PLUGIN_WEIGHT).contains(&weight) {
                return Err(ScheduleError::InvalidWeight {
                    plugin: enabled.name.clone(),
                    weight,
                });
            }
            plugins.score.push((plugin, weight));
        }

        Ok(Self {
            scheduler_name: config.scheduler_name.clone(),
            plugins,
        })
    }
}

fn check_extension_point(
    plugin: &dyn Plugin,
    extension_point: &'static str,
    implemented: bool,
) -> Result<(), ScheduleError> {
    if implemented {
        return Ok(());
    }
    Err(ScheduleError::UnsupportedExtensionPoint {
        plugin: plugin.name().to_string(),
        extension_point,
    })
}

impl KubeScheduler {
    pub fn new(config: KubeSchedulerConfig) -> Self {
        Self { config }
    }

    pub fn from_config(
        config: &SchedulerConfig,
        model_store: Arc<dyn ModelStore>,
    ) -> Result<Self, ScheduleError> {
        let handle = Handle {
            args: config.plugin_args.clone(),
            model_store,
        };

        let profile_configs = if config.profiles.is_empty() {
            vec![default_profile_config(&config.default_scheduler_name)]
        } else {
            config.profiles.clone()
        };

        let mut profiles = HashMap::new();
        for profile_config in profile_configs.iter() {
            let profile = KubeSchedulerProfile::new(profile_config, &handle)?;
            profiles.insert(profile.scheduler_name.clone(), profile);
        }

        Ok(Self::new(KubeSchedulerConfig {
            default_scheduler_name: config.default_scheduler_name.clone(),
            profiles,
            parallelism: config.parallelism.max(1),
        }))
    }

    fn profile_for(&self, pod: &Pod) -> Result<&KubeSchedulerProfile, ScheduleError> {
        let scheduler_name = pod
            .scheduler_name()
            .unwrap_or(&self.config.default_scheduler_name);
        self.config
            .profiles
            .get(scheduler_name)
            .ok_or_else(|| ScheduleError::UnknownProfile(scheduler_name.to_string()))
    }

    fn run_scheduling_cycle(
        &self,
        pod: &Pod,
        nodes: &[Node],
    ) -> Result<ScheduleResult, ScheduleError> {
        if nodes.is_empty() {
            return Err(ScheduleError::NoNodesInCluster);
        }
        let profile = self.profile_for(pod)?;
        let mut state = CycleState::new();

        let mut skip_filter: HashSet<&'static str> = HashSet::new();
        for plugin in profile.plugins.pre_filter.iter() {
            let Some(pre_filter) = plugin.as_pre_filter() else {
                continue;
            };
            let status = pre_filter
                .pre_filter(&mut state, pod)
                .map_err(|source| ScheduleError::Plugin {
                    plugin: plugin.name(),
                    source,
                })?;
            if status.is_skip() {
                debug!(
                    "{} skips Filter for pod {:?}: {}",
                    plugin.name(),
                    pod.metadata.name,
                    status
                );
                skip_filter.insert(plugin.name());
            }
        }

        let filters: Vec<&Arc<dyn Plugin>> = profile
            .plugins
            .filter
            .iter()
            .filter(|plugin| !skip_filter.contains(plugin.name()))
            .collect();
        let filtered = self.filter_nodes(&state, &filters, pod, nodes)?;

        let mut feasible_nodes = Vec::new();
        let mut rejections = Vec::new();
        for (node, rejection) in nodes.iter().zip(filtered) {
            match rejection {
                None => feasible_nodes.push(node),
                Some(rejection) => rejections.push(rejection),
            }
        }
        if feasible_nodes.is_empty() {
            return Err(ScheduleError::NoSufficientNodes {
                total_nodes: nodes.len(),
                rejections,
            });
        }

        let mut skip_score: HashSet<&'static str> = HashSet::new();
        for plugin in profile.plugins.pre_score.iter() {
            let Some(pre_score) = plugin.as_pre_score() else {
                continue;
            };
            let status = pre_score
                .pre_score(&state, pod, &feasible_nodes)
                .map_err(|source| ScheduleError::Plugin {
                    plugin: plugin.name(),
                    source,
                })?;
            if status.is_skip() {
                skip_score.insert(plugin.name());
            }
        }

        let mut node_scores = Vec::with_capacity(feasible_nodes.len());
        for node in feasible_nodes.iter() {
            let mut total: i64 = 0;
            for (plugin, weight) in profile.plugins.score.iter() {
                if skip_score.contains(plugin.name()) {
                    continue;
                }
                let Some(scorer) = plugin.as_score() else {
                    continue;
                };
                let score = scorer
                    .score(&state, pod, node)
                    .map_err(|source| ScheduleError::Plugin {
                        plugin: plugin.name(),
                        source,
                    })?;
                total = score
                    .checked_mul(*weight)
                    .and_then(|weighted| total.checked_add(weighted))
                    .ok_or_else(|| ScheduleError::ScoreOverflow {
                        node: node.name().to_string(),
                    })?;
            }
            node_scores.push(NodeScore {
                node_name: node.name().to_string(),
                score: total,
            });
        }

        // Ties go to the node listed first.
        let mut best = &node_scores[0];
        for node_score in node_scores.iter().skip(1) {
            if node_score.score > best.score {
                best = node_score;
            }
        }

        debug!(
            "pod {:?} fits {} out of {} nodes, suggested host {:?} with score {}",
            pod.metadata.name,
            feasible_nodes.len(),
            nodes.len(),
            best.node_name,
            best.score
        );

        Ok(ScheduleResult {
            suggested_host: best.node_name.clone(),
            evaluated_nodes: nodes.len(),
            feasible_nodes: feasible_nodes.len(),
            node_scores,
        })
    }

    // Runs the filters over every node, returning the rejection for each node in input order.
    fn filter_nodes(
        &self,
        state: &CycleState,
        filters: &[&Arc<dyn Plugin>],
        pod: &Pod,
        nodes: &[Node],
    ) -> Result<Vec<Option<NodeRejection>>, ScheduleError> {
        let workers = self.config.parallelism.min(nodes.len());
        if workers <= 1 {
            return run_filters(state, filters, pod, nodes);
        }

        let chunk_size = nodes.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = nodes
                .chunks(chunk_size)
                .map(|chunk| {
                    let worker_state = state.clone();
                    scope.spawn(move || run_filters(&worker_state, filters, pod, chunk))
                })
                .collect();

            let mut results = Vec::with_capacity(nodes.len());
            for handle in handles {
                let chunk_result = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                results.extend(chunk_result);
            }
            Ok(results)
        })
    }
}

fn run_filters(
    state: &CycleState,
    filters: &[&Arc<dyn Plugin>],
    pod: &Pod,
    nodes: &[Node],
) -> Result<Vec<Option<NodeRejection>>, ScheduleError> {
    nodes
        .iter()
        .map(|node| run_filters_on_node(state, filters, pod, node))
        .collect()
}

fn run_filters_on_node(
    state: &CycleState,
    filters: &[&Arc<dyn Plugin>],
    pod: &Pod,
    node: &Node,
) -> Result<Option<NodeRejection>, ScheduleError> {
    for plugin in filters {
        let Some(filter) = plugin.as_filter() else {
            continue;
        };
        let status: Status =
            filter
                .filter(state, pod, node)
                .map_err(|source| ScheduleError::Plugin {
                    plugin: plugin.name(),
                    source,
                })?;
        if !status.is_success() {
            return Ok(Some(NodeRejection {
                node_name: node.name().to_string(),
                plugin: plugin.name(),
                status,
            }));
        }
    }
    Ok(None)
}

impl PodSchedulingAlgorithm for KubeScheduler {
    fn schedule_one(&self, pod: &Pod, nodes: &[Node]) -> Result<ScheduleResult, ScheduleError> {
        self.run_scheduling_cycle(pod, nodes)
    }
}
