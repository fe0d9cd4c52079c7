// Diagnosis coordinator for Flow Studio
//
// Issues diagnosis requests, keeps the latest result for the selected
// workflow and applies proposed fixes. In-flight requests are never
// cancelled; each carries a ticket and its result is dropped if the context
// moved on (another workflow selected, panel dismissed or a newer request
// issued) before it resolved.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::analysis::{default_keywords, parse_analysis, AnalysisSection};
use super::client::InferenceService;
use super::types::*;
use crate::graph::{GraphModel, GraphSnapshot};

/// Default limit for one inference call
pub const DEFAULT_DIAGNOSIS_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Default)]
struct CoordinatorState {
    /// Bumped whenever earlier requests become stale
    generation: u64,
    /// Workflow the panel is showing
    workflow_id: Option<String>,
    pending: bool,
    result: Option<DiagnosisResult>,
    last_failure: Option<String>,
    preview: bool,
}

impl CoordinatorState {
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        self.pending = false;
        self.result = None;
        self.last_failure = None;
        self.preview = false;
        self.generation
    }
}

/// Identity of one diagnosis request; stale once the context moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisTicket {
    generation: u64,
}

/// Coordinates diagnosis requests against an inference service
pub struct DiagnosisCoordinator {
    service: Arc<dyn InferenceService>,
    timeout: Duration,
    keywords: Vec<String>,
    state: Arc<RwLock<CoordinatorState>>,
}

impl DiagnosisCoordinator {
    pub fn new(service: Arc<dyn InferenceService>) -> Self {
        Self {
            service,
            timeout: DEFAULT_DIAGNOSIS_TIMEOUT,
            keywords: default_keywords(),
            state: Arc::new(RwLock::new(CoordinatorState::default())),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keywords that mark the alternatives section of the analysis
    pub fn with_alternatives_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Switch the panel to another workflow. Clears the current result and
    /// supersedes any request still in flight.
    pub async fn select_workflow(&self, workflow_id: Option<String>) {
        let mut state = self.state.write().await;
        state.supersede();
        debug!("Diagnosis panel now on {:?}", workflow_id);
        state.workflow_id = workflow_id;
    }

    /// Close the result panel, superseding any request still in flight
    pub async fn dismiss(&self) {
        self.state.write().await.supersede();
        debug!("Diagnosis dismissed");
    }

    /// Take a ticket for a new request, superseding any request in flight.
    ///
    /// Callers that read the graph themselves must take the ticket first, so
    /// a workflow switch after the read still invalidates the request.
    pub async fn begin(&self) -> DiagnosisTicket {
        let mut state = self.state.write().await;
        let generation = state.supersede();
        state.pending = true;
        DiagnosisTicket { generation }
    }

    /// Diagnose `workflow` for the currently selected workflow.
    ///
    /// Service failures, malformed responses and timeouts resolve to
    /// `Unavailable` with the sentinel result. A result that arrives after the
    /// context changed resolves to `Discarded` and is not stored.
    pub async fn diagnose(&self, workflow: GraphSnapshot, error_context: Option<String>) -> DiagnosisOutcome {
        let ticket = self.begin().await;
        let request = DiagnosisRequest::new(workflow).with_runtime_error(error_context);
        self.diagnose_with(ticket, request).await
    }

    /// Send `request` under a ticket from [`begin`](Self::begin)
    pub async fn diagnose_with(&self, ticket: DiagnosisTicket, request: DiagnosisRequest) -> DiagnosisOutcome {
        let ticket = ticket.generation;

        info!(
            "Requesting diagnosis from {} ({} nodes, {} edges)",
            self.service.name(),
            request.workflow.nodes.len(),
            request.workflow.edges.len()
        );

        let response = match tokio::time::timeout(self.timeout, self.service.diagnose(&request)).await {
            Ok(response) => response,
            Err(_) => Err(DiagnosisError::Timeout(self.timeout)),
        };

        let mut state = self.state.write().await;
        if state.generation != ticket {
            debug!("Discarding stale diagnosis (ticket {}, now {})", ticket, state.generation);
            return DiagnosisOutcome::Discarded;
        }
        state.pending = false;

        match response {
            Ok(result) => {
                info!("Diagnosis ready (fix proposed: {})", result.has_fix());
                state.preview = result.has_fix();
                state.result = Some(result.clone());
                DiagnosisOutcome::Ready(result)
            },
            Err(e) => {
                warn!("Diagnosis unavailable: {}", e);
                let reason = e.to_string();
                state.last_failure = Some(reason.clone());
                DiagnosisOutcome::Unavailable {
                    result: DiagnosisResult::unavailable(),
                    reason,
                }
            },
        }
    }

    /// Replace the live graph with the proposal. Never merges; on error the
    /// live graph is left untouched.
    pub fn apply_fix(live: &mut GraphModel, result: &DiagnosisResult) -> Result<(), DiagnosisError> {
        let proposal = result.proposed_graph.as_ref().ok_or(DiagnosisError::NoProposal)?;
        live.replace_all(proposal.nodes.clone(), proposal.edges.clone())?;
        info!(
            "Applied proposed fix ({} nodes, {} edges)",
            proposal.nodes.len(),
            proposal.edges.len()
        );
        Ok(())
    }

    pub async fn result(&self) -> Option<DiagnosisResult> {
        self.state.read().await.result.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.pending
    }

    pub async fn last_failure(&self) -> Option<String> {
        self.state.read().await.last_failure.clone()
    }

    pub async fn selected_workflow(&self) -> Option<String> {
        self.state.read().await.workflow_id.clone()
    }

    /// Toggle between the original graph and the proposal. Preview can only
    /// be enabled while a proposal is held.
    pub async fn set_preview(&self, enabled: bool) -> bool {
        let mut state = self.state.write().await;
        state.preview = enabled && state.result.as_ref().map(DiagnosisResult::has_fix).unwrap_or(false);
        state.preview
    }

    pub async fn is_previewing(&self) -> bool {
        self.state.read().await.preview
    }

    /// Graph the panel should display
    pub async fn displayed_graph(&self, original: &GraphSnapshot) -> GraphSnapshot {
        let state = self.state.read().await;
        match (&state.result, state.preview) {
            (Some(DiagnosisResult {
                proposed_graph: Some(proposal),
                ..
            }), true) => proposal.clone(),
            _ => original.clone(),
        }
    }

    /// Sections of the current analysis text
    pub async fn sections(&self) -> Vec<AnalysisSection> {
        let state = self.state.read().await;
        state
            .result
            .as_ref()
            .map(|r| parse_analysis(&r.analysis_text, &self.keywords))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeDescriptor, NodeKind, Point};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn proposal() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                Node::new("t", NodeKind::Trigger, Point::new(100.0, 100.0), NodeDescriptor::named("Gmail")),
                Node::new("a", NodeKind::Action, Point::new(400.0, 100.0), NodeDescriptor::named("OpenAI")),
            ],
            edges: vec![Edge::new("e1", "t", "a")],
        }
    }

    fn fixed_result() -> DiagnosisResult {
        DiagnosisResult {
            analysis_text: "# Summary\nok\n# Alternatives\n## Queue\nuse a queue".to_string(),
            proposed_graph: Some(proposal()),
            predicted_outcome: "works".to_string(),
        }
    }

    struct Fixed(Result<DiagnosisResult, ()>);

    #[async_trait]
    impl InferenceService for Fixed {
        async fn diagnose(&self, _request: &DiagnosisRequest) -> Result<DiagnosisResult, DiagnosisError> {
            self.0.clone().map_err(|_| DiagnosisError::EmptyResponse)
        }
    }

    /// Blocks until released, then answers with the given result
    struct Gated {
        release: Arc<Notify>,
        result: DiagnosisResult,
    }

    #[async_trait]
    impl InferenceService for Gated {
        async fn diagnose(&self, _request: &DiagnosisRequest) -> Result<DiagnosisResult, DiagnosisError> {
            self.release.notified().await;
            Ok(self.result.clone())
        }
    }

    #[tokio::test]
    async fn test_ready_result_enables_preview() {
        let coordinator = DiagnosisCoordinator::new(Arc::new(Fixed(Ok(fixed_result()))));
        let original = GraphSnapshot::default();

        let outcome = coordinator.diagnose(original.clone(), Some("Timeout".to_string())).await;

        assert!(outcome.is_ready());
        assert!(coordinator.is_previewing().await);
        assert!(!coordinator.is_pending().await);
        assert_eq!(coordinator.displayed_graph(&original).await, proposal());

        assert!(!coordinator.set_preview(false).await);
        assert_eq!(coordinator.displayed_graph(&original).await, original);

        let sections = coordinator.sections().await;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].alternatives[0].title, "Queue");
    }

    #[tokio::test]
    async fn test_failure_yields_sentinel() {
        let coordinator = DiagnosisCoordinator::new(Arc::new(Fixed(Err(()))));

        let outcome = coordinator.diagnose(GraphSnapshot::default(), None).await;

        match outcome {
            DiagnosisOutcome::Unavailable { result, reason } => {
                assert!(result.is_empty());
                assert!(reason.contains("empty"));
            },
            other => panic!("expected unavailable, got {:?}", other),
        }
        assert!(coordinator.result().await.is_none());
        assert!(coordinator.last_failure().await.is_some());
        assert!(!coordinator.set_preview(true).await);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let gate = Arc::new(Notify::new());
        let service = Gated {
            release: gate.clone(),
            result: fixed_result(),
        };
        let coordinator = DiagnosisCoordinator::new(Arc::new(service)).with_timeout(Duration::from_millis(20));

        let outcome = coordinator.diagnose(GraphSnapshot::default(), None).await;

        assert!(matches!(outcome, DiagnosisOutcome::Unavailable { .. }));
        assert!(!coordinator.is_pending().await);
    }

    #[tokio::test]
    async fn test_superseded_result_is_discarded() {
        let gate = Arc::new(Notify::new());
        let service = Gated {
            release: gate.clone(),
            result: fixed_result(),
        };
        let coordinator = Arc::new(DiagnosisCoordinator::new(Arc::new(service)));
        coordinator.select_workflow(Some("w-first".to_string())).await;

        let pending = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.diagnose(GraphSnapshot::default(), None).await })
        };
        while !coordinator.is_pending().await {
            tokio::task::yield_now().await;
        }

        coordinator.select_workflow(Some("w-second".to_string())).await;
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), DiagnosisOutcome::Discarded);
        assert!(coordinator.result().await.is_none());
        assert!(!coordinator.is_previewing().await);
        assert_eq!(coordinator.selected_workflow().await.as_deref(), Some("w-second"));
    }

    #[tokio::test]
    async fn test_ticket_taken_before_switch_is_stale() {
        let coordinator = DiagnosisCoordinator::new(Arc::new(Fixed(Ok(fixed_result()))));
        coordinator.select_workflow(Some("w-first".to_string())).await;

        let ticket = coordinator.begin().await;
        assert!(coordinator.is_pending().await);
        coordinator.select_workflow(Some("w-second".to_string())).await;

        let request = DiagnosisRequest::new(proposal()).with_title("First");
        let outcome = coordinator.diagnose_with(ticket, request).await;

        assert_eq!(outcome, DiagnosisOutcome::Discarded);
        assert!(coordinator.result().await.is_none());
    }

    #[tokio::test]
    async fn test_dismiss_clears_result() {
        let coordinator = DiagnosisCoordinator::new(Arc::new(Fixed(Ok(fixed_result()))));
        coordinator.diagnose(GraphSnapshot::default(), None).await;
        assert!(coordinator.result().await.is_some());

        coordinator.dismiss().await;
        assert!(coordinator.result().await.is_none());
        assert!(!coordinator.is_previewing().await);
    }

    #[test]
    fn test_apply_fix_replaces_everything() {
        let mut live = GraphModel::new();
        let x = live.add_node(NodeDescriptor::named("Old"), NodeKind::Trigger, Point::ZERO);
        let y = live.add_node(NodeDescriptor::named("Older"), NodeKind::Action, Point::ZERO);
        live.connect(&x, &y);

        DiagnosisCoordinator::apply_fix(&mut live, &fixed_result()).unwrap();

        assert_eq!(live.node_count(), 2);
        assert_eq!(live.edge_count(), 1);
        assert!(!live.contains_node(&x));
        assert!(live.contains_node("t") && live.contains_node("a"));
    }

    #[test]
    fn test_apply_fix_without_proposal() {
        let mut live = GraphModel::new();
        let x = live.add_node(NodeDescriptor::named("Old"), NodeKind::Trigger, Point::ZERO);
        let result = DiagnosisResult {
            proposed_graph: None,
            ..fixed_result()
        };

        assert!(matches!(
            DiagnosisCoordinator::apply_fix(&mut live, &result),
            Err(DiagnosisError::NoProposal)
        ));
        assert!(live.contains_node(&x));
    }

    #[test]
    fn test_apply_fix_rejects_invalid_proposal() {
        let mut live = GraphModel::new();
        let x = live.add_node(NodeDescriptor::named("Old"), NodeKind::Trigger, Point::ZERO);
        let mut bad = proposal();
        bad.edges.push(Edge::new("e2", "a", "ghost"));
        let result = DiagnosisResult {
            proposed_graph: Some(bad),
            ..fixed_result()
        };

        assert!(matches!(
            DiagnosisCoordinator::apply_fix(&mut live, &result),
            Err(DiagnosisError::InvalidProposal(_))
        ));
        assert_eq!(live.node_count(), 1);
        assert!(live.contains_node(&x));
    }
}
