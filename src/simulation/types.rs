// Core data types for simulated flow runs
//
// Run outcomes, progress updates and errors reported by the execution
// simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::graph::{NodeId, NodeStatus};

/// Unique identifier of one simulated run
pub type RunId = Uuid;

/// Default pause while a node shows as running
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(600);

/// Default pause after a node succeeds, before moving along its edge
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Why a run stopped at a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The node has nothing to hand off to
    NoOutgoingEdge,
    /// The chain came back to a node it already visited
    Cycle,
    /// The outcome policy failed the node
    Injected(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NoOutgoingEdge => write!(f, "no outgoing connection"),
            FailureReason::Cycle => write!(f, "cycle detected"),
            FailureReason::Injected(message) => write!(f, "{}", message),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed { node_id: NodeId, reason: FailureReason },
    /// The graph was replaced while the run was in flight
    Interrupted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Failed { node_id, reason } => write!(f, "failed at {} ({})", node_id, reason),
            RunOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    /// Nodes in the order they were entered
    pub trace: Vec<NodeId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Node to highlight after a failed run
    pub fn failing_node(&self) -> Option<&NodeId> {
        match &self.outcome {
            RunOutcome::Failed { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Progress message emitted while a run is in flight
#[derive(Debug, Clone)]
pub enum SimulationUpdate {
    /// Run started; statuses were reset
    Started { run_id: RunId, triggers: Vec<NodeId> },
    /// A node changed status
    NodeStatus {
        run_id: RunId,
        node_id: NodeId,
        status: NodeStatus,
    },
    /// Run reached a terminal state
    Finished { report: RunReport },
}

/// Step timing for the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    pub step_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl SimulationSettings {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            step_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }
}

/// Errors from starting a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("A run is already in progress")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_node() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            outcome: RunOutcome::Failed {
                node_id: "node-a".to_string(),
                reason: FailureReason::NoOutgoingEdge,
            },
            trace: vec!["node-t".to_string(), "node-a".to_string()],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert!(!report.is_success());
        assert_eq!(report.failing_node().map(String::as_str), Some("node-a"));
        assert_eq!(report.outcome.to_string(), "failed at node-a (no outgoing connection)");
    }

    #[test]
    fn test_duration_spans_run() {
        let started_at = Utc::now();
        let report = RunReport {
            run_id: Uuid::new_v4(),
            outcome: RunOutcome::Success,
            trace: Vec::new(),
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(1500),
        };
        assert_eq!(report.duration().num_milliseconds(), 1500);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(RunOutcome::Failed {
            node_id: "n1".to_string(),
            reason: FailureReason::Cycle,
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "cycle");
    }
}
