// Outcome policies for simulated runs
//
// A policy decides whether a node fails while it is running and what happens
// when a chain reaches a node without an outgoing edge.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

use super::types::FailureReason;
use crate::graph::{Node, NodeId};

/// What to do at the end of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkBehavior {
    /// Mark the sink as failed (nothing to hand off to)
    #[default]
    Fail,
    /// Mark the sink as successful and finish the chain
    Complete,
}

impl std::fmt::Display for SinkBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkBehavior::Fail => write!(f, "fail"),
            SinkBehavior::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for SinkBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(SinkBehavior::Fail),
            "complete" => Ok(SinkBehavior::Complete),
            other => Err(format!("Unknown sink behavior: {}", other)),
        }
    }
}

/// Pluggable failure condition for the simulator
pub trait OutcomePolicy: Send + Sync + Debug {
    /// Called once the node has been running for the step delay. Returning a
    /// reason fails the run at this node.
    fn at_step(&self, _node: &Node) -> Option<FailureReason> {
        None
    }

    /// Called when the node has no outgoing edge
    fn at_sink(&self, node: &Node) -> SinkBehavior;
}

/// Every chain fails at its last node
#[derive(Debug, Clone, Copy, Default)]
pub struct InducedSinkFailure;

impl OutcomePolicy for InducedSinkFailure {
    fn at_sink(&self, _node: &Node) -> SinkBehavior {
        SinkBehavior::Fail
    }
}

/// Chains that reach their last node succeed
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteAtSink;

impl OutcomePolicy for CompleteAtSink {
    fn at_sink(&self, _node: &Node) -> SinkBehavior {
        SinkBehavior::Complete
    }
}

/// Fail exactly the listed nodes; sinks complete
#[derive(Debug, Clone, Default)]
pub struct FailAt {
    nodes: HashSet<NodeId>,
}

impl FailAt {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }
}

impl OutcomePolicy for FailAt {
    fn at_step(&self, node: &Node) -> Option<FailureReason> {
        self.nodes
            .contains(&node.id)
            .then(|| FailureReason::Injected(format!("{} failed", node.descriptor.name)))
    }

    fn at_sink(&self, _node: &Node) -> SinkBehavior {
        SinkBehavior::Complete
    }
}

/// Built-in policy for a configured sink behavior
pub fn policy_for(behavior: SinkBehavior) -> std::sync::Arc<dyn OutcomePolicy> {
    match behavior {
        SinkBehavior::Fail => std::sync::Arc::new(InducedSinkFailure),
        SinkBehavior::Complete => std::sync::Arc::new(CompleteAtSink),
    }
}
