use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::model::{Flavor, OpenModel};
use crate::core::model_store::InMemoryModelStore;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::kube_scheduler::KubeScheduler;

pub const GPU_LABEL: &str = "karpenter.k8s.aws/instance-gpu-name";

pub fn default_test_scheduler_config(with_suffix: Option<&str>) -> SchedulerConfig {
    let mut default = r#"
    default_scheduler_name: "default_scheduler"
    "#
    .to_string();

    if let Some(suffix) = with_suffix {
        default.push_str(suffix);
    }

    serde_yaml::from_str::<SchedulerConfig>(&default).unwrap()
}

pub fn create_test_scheduler(
    config: &SchedulerConfig,
    models: Vec<OpenModel>,
) -> (KubeScheduler, Arc<InMemoryModelStore>) {
    let model_store = Arc::new(InMemoryModelStore::new(models));
    let scheduler = KubeScheduler::from_config(config, model_store.clone()).unwrap();
    (scheduler, model_store)
}

pub fn gpu_node(name: &str, gpu: &str) -> Node {
    Node::new(name).with_label(GPU_LABEL, gpu)
}

pub fn model_pod(name: &str, model: &str) -> Pod {
    Pod::new(name).with_label("llmaz.io/model-name", model)
}

// A model whose flavors each select nodes with the GPU of the same name.
pub fn gpu_model(name: &str, gpus: &[&str]) -> OpenModel {
    OpenModel::new(name).with_flavors(
        gpus.iter()
            .map(|gpu| Flavor::new(gpu, &[(GPU_LABEL, gpu)]))
            .collect(),
    )
}
