pub mod cycle_state;
pub mod flavors;
pub mod interface;
pub mod kube_scheduler;
pub mod plugin;
pub mod resource_fungibility;
pub mod status;
