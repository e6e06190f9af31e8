//! Output of the scheduling decisions taken for a workload.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use prettytable::{row, Table};
use serde::{Deserialize, Serialize};

use crate::core::scheduler::interface::{ScheduleError, ScheduleResult};

#[derive(Debug, Default, Deserialize, PartialEq)]
pub enum OutputFormat {
    #[default]
    JSON,
    PrettyTable,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct DecisionPrinterConfig {
    #[serde(default)]
    pub format: OutputFormat,
    // Stdout if not set.
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SchedulingDecision {
    pub pod: String,
    pub assigned_node: Option<String>,
    pub evaluated_nodes: usize,
    pub feasible_nodes: usize,
    pub node_scores: Vec<NodeScoreJSON>,
    // Set when the pod was not scheduled.
    pub error: Option<String>,
    pub rejections: Vec<RejectionJSON>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NodeScoreJSON {
    pub node: String,
    pub score: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RejectionJSON {
    pub node: String,
    pub plugin: String,
    pub reasons: Vec<String>,
}

impl SchedulingDecision {
    pub fn new(pod: &str, result: &Result<ScheduleResult, ScheduleError>) -> Self {
        match result {
            Ok(result) => Self {
                pod: pod.to_string(),
                assigned_node: Some(result.suggested_host.clone()),
                evaluated_nodes: result.evaluated_nodes,
                feasible_nodes: result.feasible_nodes,
                node_scores: result
                    .node_scores
                    .iter()
                    .map(|s| NodeScoreJSON {
                        node: s.node_name.clone(),
                        score: s.score,
                    })
                    .collect(),
                error: None,
                rejections: vec![],
            },
            Err(err) => {
                let (evaluated_nodes, rejections) = match err {
                    ScheduleError::NoSufficientNodes {
                        total_nodes,
                        rejections,
                    } => (
                        *total_nodes,
                        rejections
                            .iter()
                            .map(|r| RejectionJSON {
                                node: r.node_name.clone(),
                                plugin: r.plugin.to_string(),
                                reasons: r.status.reasons().to_vec(),
                            })
                            .collect(),
                    ),
                    _ => (0, vec![]),
                };
                Self {
                    pod: pod.to_string(),
                    assigned_node: None,
                    evaluated_nodes,
                    feasible_nodes: 0,
                    node_scores: vec![],
                    error: Some(err.to_string()),
                    rejections,
                }
            }
        }
    }
}

fn open_output(output_file: &Option<PathBuf>) -> io::Result<Box<dyn Write>> {
    Ok(match output_file {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    })
}

pub fn print_decisions(
    decisions: &[SchedulingDecision],
    config: &DecisionPrinterConfig,
) -> io::Result<()> {
    let mut out = open_output(&config.output_file)?;
    match config.format {
        OutputFormat::PrettyTable => print_decisions_as_pretty_table(decisions, &mut out),
        OutputFormat::JSON => print_decisions_as_json(decisions, &mut out),
    }
}

pub fn print_decisions_as_pretty_table<W: Write>(
    decisions: &[SchedulingDecision],
    out: &mut W,
) -> io::Result<()> {
    let mut summary_table = Table::new();
    summary_table.add_row(row!["Pod", "Node", "Feasible", "Evaluated", "Error"]);
    for decision in decisions {
        summary_table.add_row(row![
            decision.pod,
            decision.assigned_node.as_deref().unwrap_or("-"),
            decision.feasible_nodes,
            decision.evaluated_nodes,
            decision.error.as_deref().unwrap_or("")
        ]);
    }

    let mut scores_table = Table::new();
    scores_table.add_row(row!["Pod", "Node", "Score"]);
    for decision in decisions {
        for node_score in decision.node_scores.iter() {
            scores_table.add_row(row![decision.pod, node_score.node, node_score.score]);
        }
    }

    let mut rejections_table = Table::new();
    rejections_table.add_row(row!["Pod", "Node", "Plugin", "Reasons"]);
    for decision in decisions {
        for rejection in decision.rejections.iter() {
            rejections_table.add_row(row![
                decision.pod,
                rejection.node,
                rejection.plugin,
                rejection.reasons.join("; ")
            ]);
        }
    }

    summary_table.print(out)?;
    scores_table.print(out)?;
    if rejections_table.len() > 1 {
        rejections_table.print(out)?;
    }
    Ok(())
}

pub fn print_decisions_as_json<W: Write>(
    decisions: &[SchedulingDecision],
    out: &mut W,
) -> io::Result<()> {
    let serialized_json = serde_json::to_string_pretty(decisions)?;
    out.write_all(serialized_json.as_bytes())?;
    out.write_all(b"\n")
}
