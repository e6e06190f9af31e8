use std::env;
use std::fs::File;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use kubernetriks_fungibility::config::SchedulerConfig;
use kubernetriks_fungibility::core::model_store::InMemoryModelStore;
use kubernetriks_fungibility::core::scheduler::interface::{PodSchedulingAlgorithm, ScheduleError};
use kubernetriks_fungibility::core::scheduler::kube_scheduler::KubeScheduler;
use kubernetriks_fungibility::printer::{print_decisions, SchedulingDecision};
use kubernetriks_fungibility::trace::generic::{GenericClusterTrace, GenericWorkloadTrace};

#[derive(Parser)]
struct Args {
    #[clap(short, long)]
    config_file: std::path::PathBuf,
    #[clap(short, long)]
    workload_file: std::path::PathBuf,
    #[clap(long)]
    cluster_file: std::path::PathBuf,
}

fn init_logger(config: &SchedulerConfig) -> anyhow::Result<()> {
    // log level INFO by default
    let mut env_logger_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        env_logger_builder.filter_level(log::LevelFilter::Info);
    }
    if let Some(logs_filepath) = &config.logs_filepath {
        let logs_file = File::create(logs_filepath)
            .with_context(|| format!("could not create log file {:?}", logs_filepath))?;
        env_logger_builder.target(env_logger::Target::Pipe(Box::new(logs_file)));
    }
    env_logger_builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = SchedulerConfig::from_file(&args.config_file)
        .with_context(|| format!("loading config from {:?}", args.config_file))?;
    init_logger(&config)?;

    info!("Path to config file: {:?}", args.config_file);
    info!("Path to cluster file: {:?}", args.cluster_file);
    info!("Path to workload file: {:?}", args.workload_file);

    let cluster = GenericClusterTrace::from_file(&args.cluster_file)
        .with_context(|| format!("loading cluster from {:?}", args.cluster_file))?;
    let workload = GenericWorkloadTrace::from_file(&args.workload_file)
        .with_context(|| format!("loading workload from {:?}", args.workload_file))?;

    info!(
        "Cluster has {} nodes and {} models, workload has {} pods",
        cluster.nodes.len(),
        cluster.models.len(),
        workload.pods.len()
    );

    let model_store = Arc::new(InMemoryModelStore::new(cluster.models));
    let scheduler: Box<dyn PodSchedulingAlgorithm> =
        Box::new(KubeScheduler::from_config(&config, model_store)?);

    let mut decisions = Vec::with_capacity(workload.pods.len());
    for pod in workload.pods {
        let result = scheduler.schedule_one(&pod, &cluster.nodes);
        match &result {
            Ok(result) => {
                info!(
                    "Pod {:?} assigned to node {:?}",
                    pod.metadata.name, result.suggested_host
                );
            }
            Err(err @ ScheduleError::Plugin { .. }) => {
                error!("Scheduling cycle of pod {:?} aborted: {}", pod.metadata.name, err);
            }
            Err(err) => {
                warn!("Pod {:?} is unschedulable: {}", pod.metadata.name, err);
            }
        }
        decisions.push(SchedulingDecision::new(&pod.metadata.name, &result));
    }

    let output = config.output.unwrap_or_default();
    print_decisions(&decisions, &output).context("printing scheduling decisions")?;
    Ok(())
}
