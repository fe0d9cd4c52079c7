// Simulated execution engine for Flow Studio
//
// Walks the live graph from each trigger, one outgoing edge at a time, with
// timed status transitions. Statuses are written straight onto the shared
// graph so the canvas can render them between steps. Locks are never held
// across a delay, so the graph stays editable while a run is in flight.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::policy::{InducedSinkFailure, OutcomePolicy, SinkBehavior};
use super::types::*;
use crate::graph::{GraphModel, NodeId, NodeStatus};

/// Execution simulator over a shared graph
pub struct ExecutionSimulator {
    /// Graph owned by the editor session
    graph: Arc<RwLock<GraphModel>>,
    /// Step timing
    settings: SimulationSettings,
    /// Failure condition
    policy: RwLock<Arc<dyn OutcomePolicy>>,
    /// Set while a run is in flight
    running: AtomicBool,
    /// Progress sender for reporting run updates
    progress_sender: Option<mpsc::UnboundedSender<SimulationUpdate>>,
}

/// Clears the running flag when a run ends or its future is dropped
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Per-run context threaded through the walk
struct RunContext<'a> {
    run_id: RunId,
    generation: u64,
    policy: &'a dyn OutcomePolicy,
    trace: Vec<NodeId>,
}

impl ExecutionSimulator {
    /// Create a simulator with default timing and the induced-failure policy
    pub fn new(graph: Arc<RwLock<GraphModel>>) -> Self {
        Self::with_settings(graph, SimulationSettings::default())
    }

    /// Create a simulator with custom timing
    pub fn with_settings(graph: Arc<RwLock<GraphModel>>, settings: SimulationSettings) -> Self {
        Self {
            graph,
            settings,
            policy: RwLock::new(Arc::new(InducedSinkFailure)),
            running: AtomicBool::new(false),
            progress_sender: None,
        }
    }

    /// Use a specific outcome policy
    pub fn with_policy(mut self, policy: Arc<dyn OutcomePolicy>) -> Self {
        self.policy = RwLock::new(policy);
        self
    }

    /// Set up progress reporting
    pub fn with_progress_reporting(mut self) -> (Self, mpsc::UnboundedReceiver<SimulationUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.progress_sender = Some(sender);
        (self, receiver)
    }

    /// Swap the outcome policy; takes effect from the next run
    pub async fn set_policy(&self, policy: Arc<dyn OutcomePolicy>) {
        debug!("Outcome policy set to {:?}", policy);
        *self.policy.write().await = policy;
    }

    pub fn settings(&self) -> SimulationSettings {
        self.settings
    }

    pub fn graph(&self) -> &Arc<RwLock<GraphModel>> {
        &self.graph
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the graph to a terminal state.
    ///
    /// Statuses are reset to idle first. Triggers are walked in graph order;
    /// the first failing chain ends the run. Only one run may be in flight.
    pub async fn run(&self) -> Result<RunReport, SimulationError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Run requested while another run is in progress");
            return Err(SimulationError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let policy = self.policy.read().await.clone();

        let (generation, triggers) = {
            let mut graph = self.graph.write().await;
            graph.reset_statuses();
            (graph.generation(), graph.triggers())
        };

        info!("Starting run {} from {} trigger(s)", run_id, triggers.len());
        self.send_update(SimulationUpdate::Started {
            run_id,
            triggers: triggers.clone(),
        });

        let mut ctx = RunContext {
            run_id,
            generation,
            policy: policy.as_ref(),
            trace: Vec::new(),
        };

        let mut outcome = RunOutcome::Success;
        for trigger in &triggers {
            if let Some(stopped) = self.walk_chain(&mut ctx, trigger).await {
                outcome = stopped;
                break;
            }
        }

        let report = RunReport {
            run_id,
            outcome,
            trace: ctx.trace,
            started_at,
            finished_at: Utc::now(),
        };

        match &report.outcome {
            RunOutcome::Success => info!("Run {} completed successfully", run_id),
            RunOutcome::Failed { node_id, reason } => {
                warn!("Run {} failed at node {}: {}", run_id, node_id, reason)
            },
            RunOutcome::Interrupted => warn!("Run {} interrupted by a graph replacement", run_id),
        }

        self.send_update(SimulationUpdate::Finished { report: report.clone() });
        Ok(report)
    }

    /// Walk one trigger-rooted chain. Returns `None` when the chain completes.
    async fn walk_chain(&self, ctx: &mut RunContext<'_>, trigger: &NodeId) -> Option<RunOutcome> {
        let mut visited = HashSet::new();
        let mut current = trigger.clone();

        loop {
            if !visited.insert(current.clone()) {
                return Some(self.fail(ctx, current, FailureReason::Cycle).await);
            }

            ctx.trace.push(current.clone());
            if !self.mark(ctx, &current, NodeStatus::Running).await {
                return Some(RunOutcome::Interrupted);
            }
            tokio::time::sleep(self.settings.step_delay).await;

            let (node, next) = {
                let graph = self.graph.read().await;
                if graph.generation() != ctx.generation {
                    return Some(RunOutcome::Interrupted);
                }
                let node = match graph.node(&current) {
                    Some(node) => node.clone(),
                    None => return Some(RunOutcome::Interrupted),
                };
                let next = graph.outgoing_edge(&current).map(|e| e.target.clone());
                (node, next)
            };

            if let Some(reason) = ctx.policy.at_step(&node) {
                return Some(self.fail(ctx, current, reason).await);
            }

            match next {
                None => match ctx.policy.at_sink(&node) {
                    SinkBehavior::Fail => {
                        return Some(self.fail(ctx, current, FailureReason::NoOutgoingEdge).await);
                    },
                    SinkBehavior::Complete => {
                        if !self.mark(ctx, &current, NodeStatus::Success).await {
                            return Some(RunOutcome::Interrupted);
                        }
                        return None;
                    },
                },
                Some(target) => {
                    if !self.mark(ctx, &current, NodeStatus::Success).await {
                        return Some(RunOutcome::Interrupted);
                    }
                    tokio::time::sleep(self.settings.settle_delay).await;
                    debug!("Advancing {} -> {}", current, target);
                    current = target;
                },
            }
        }
    }

    async fn fail(&self, ctx: &RunContext<'_>, node_id: NodeId, reason: FailureReason) -> RunOutcome {
        if !self.mark(ctx, &node_id, NodeStatus::Error).await {
            return RunOutcome::Interrupted;
        }
        RunOutcome::Failed { node_id, reason }
    }

    /// Write a status onto the live graph. Returns false if the graph was
    /// replaced since the run started or the node is gone.
    async fn mark(&self, ctx: &RunContext<'_>, node_id: &NodeId, status: NodeStatus) -> bool {
        let applied = {
            let mut graph = self.graph.write().await;
            graph.generation() == ctx.generation && graph.set_status(node_id, status)
        };

        if applied {
            debug!("Node {} is now {}", node_id, status);
            self.send_update(SimulationUpdate::NodeStatus {
                run_id: ctx.run_id,
                node_id: node_id.clone(),
                status,
            });
        }
        applied
    }

    fn send_update(&self, update: SimulationUpdate) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(update);
        }
    }
}
