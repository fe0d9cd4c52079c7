// Editor session for Flow Studio
//
// Composition root for one open workflow: the live graph, the canvas
// controller, the execution simulator, the diagnosis coordinator and the
// repository the workflow is saved to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info};

use crate::canvas::CanvasInteractionController;
use crate::config::StudioConfig;
use crate::diagnosis::{DiagnosisCoordinator, DiagnosisError, DiagnosisOutcome, DiagnosisRequest, InferenceService};
use crate::graph::{GraphError, GraphModel, GraphSnapshot, WorkflowExport};
use crate::repository::{
    FolderId, RepositoryError, SavedWorkflow, WorkflowDraft, WorkflowId, WorkflowRepository, WorkflowStatus,
    UNTITLED_WORKFLOW,
};
use crate::simulation::{
    policy_for, ExecutionSimulator, OutcomePolicy, RunOutcome, RunReport, SimulationError, SimulationUpdate,
};

/// Errors surfaced by editor operations
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Diagnosis(#[from] DiagnosisError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Identity of the workflow being edited
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowInfo {
    /// `None` until the workflow is first saved
    pub id: Option<WorkflowId>,
    pub title: String,
    pub folder_id: Option<FolderId>,
    pub status: WorkflowStatus,
}

impl Default for WorkflowInfo {
    fn default() -> Self {
        Self {
            id: None,
            title: UNTITLED_WORKFLOW.to_string(),
            folder_id: None,
            status: WorkflowStatus::default(),
        }
    }
}

/// One editor session over a live graph
pub struct EditorSession {
    /// Live graph shared with the simulator
    graph: Arc<RwLock<GraphModel>>,
    /// Pointer and drag state
    canvas: Mutex<CanvasInteractionController>,
    simulator: Arc<ExecutionSimulator>,
    coordinator: DiagnosisCoordinator,
    repository: Arc<dyn WorkflowRepository>,
    info: RwLock<WorkflowInfo>,
    last_run: RwLock<Option<RunReport>>,
    /// Run updates until taken by the UI
    update_receiver: Option<mpsc::UnboundedReceiver<SimulationUpdate>>,
}

impl EditorSession {
    /// Create a session with an empty graph
    pub fn new(
        config: &StudioConfig,
        service: Arc<dyn InferenceService>,
        repository: Arc<dyn WorkflowRepository>,
    ) -> Self {
        let graph = Arc::new(RwLock::new(GraphModel::new()));

        let (simulator, receiver) = ExecutionSimulator::with_settings(graph.clone(), config.simulation.settings())
            .with_policy(policy_for(config.simulation.sink_behavior))
            .with_progress_reporting();

        let coordinator = DiagnosisCoordinator::new(service)
            .with_timeout(config.inference.timeout)
            .with_alternatives_keywords(config.diagnosis.alternatives_keywords.clone());

        debug!("Editor session created");

        Self {
            graph,
            canvas: Mutex::new(CanvasInteractionController::new()),
            simulator: Arc::new(simulator),
            coordinator,
            repository,
            info: RwLock::new(WorkflowInfo::default()),
            last_run: RwLock::new(None),
            update_receiver: Some(receiver),
        }
    }

    /// Take the run update receiver (can only be called once)
    pub fn take_update_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SimulationUpdate>> {
        self.update_receiver.take()
    }

    pub fn graph(&self) -> &Arc<RwLock<GraphModel>> {
        &self.graph
    }

    pub fn simulator(&self) -> &Arc<ExecutionSimulator> {
        &self.simulator
    }

    pub fn coordinator(&self) -> &DiagnosisCoordinator {
        &self.coordinator
    }

    pub fn repository(&self) -> &Arc<dyn WorkflowRepository> {
        &self.repository
    }

    pub async fn info(&self) -> WorkflowInfo {
        self.info.read().await.clone()
    }

    pub async fn set_title(&self, title: impl Into<String>) {
        self.info.write().await.title = title.into();
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().await.snapshot()
    }

    pub async fn last_run(&self) -> Option<RunReport> {
        self.last_run.read().await.clone()
    }

    /// Swap the simulator's outcome policy
    pub async fn set_outcome_policy(&self, policy: Arc<dyn OutcomePolicy>) {
        self.simulator.set_policy(policy).await;
    }

    /// Apply a canvas interaction to the live graph. The graph stays locked
    /// for the whole handler, so no half-applied edit is ever visible.
    pub async fn interact<R>(&self, handler: impl FnOnce(&mut CanvasInteractionController, &mut GraphModel) -> R) -> R {
        let mut canvas = self.canvas.lock().await;
        let mut graph = self.graph.write().await;
        handler(&mut canvas, &mut graph)
    }

    /// Start a new, unsaved workflow
    pub async fn new_workflow(&self) {
        self.graph.write().await.replace_all(Vec::new(), Vec::new()).ok();
        *self.info.write().await = WorkflowInfo::default();
        *self.last_run.write().await = None;
        self.coordinator.select_workflow(None).await;
        info!("Started a new workflow");
    }

    /// Open a saved workflow in the editor
    pub async fn open(&self, workflow: &SavedWorkflow) -> Result<(), EditorError> {
        self.graph
            .write()
            .await
            .replace_all(workflow.nodes.clone(), workflow.edges.clone())?;

        *self.info.write().await = WorkflowInfo {
            id: Some(workflow.id.clone()),
            title: workflow.title.clone(),
            folder_id: workflow.folder_id.clone(),
            status: workflow.status,
        };
        *self.last_run.write().await = None;
        self.coordinator.select_workflow(Some(workflow.id.clone())).await;

        info!("Opened workflow {} ('{}')", workflow.id, workflow.title);
        Ok(())
    }

    /// Load an unsaved graph, e.g. from a file
    pub async fn load_snapshot(&self, title: &str, snapshot: GraphSnapshot) -> Result<(), EditorError> {
        self.graph.write().await.replace_all(snapshot.nodes, snapshot.edges)?;
        *self.info.write().await = WorkflowInfo {
            title: title.to_string(),
            ..WorkflowInfo::default()
        };
        *self.last_run.write().await = None;
        self.coordinator.select_workflow(None).await;
        Ok(())
    }

    /// Save the live graph as an active workflow, creating it on first save
    pub async fn save(&self) -> Result<SavedWorkflow, EditorError> {
        let info = self.info().await;
        let mut draft = {
            let graph = self.graph.read().await;
            WorkflowDraft::from_graph(&graph)
        }
        .with_title(info.title)
        .with_status(WorkflowStatus::Active);
        if let Some(id) = info.id {
            draft = draft.with_id(id);
        }
        if let Some(folder_id) = info.folder_id {
            draft = draft.in_folder(folder_id);
        }

        let saved = self.repository.save(draft).await?;
        {
            let mut info = self.info.write().await;
            info.id = Some(saved.id.clone());
            info.status = saved.status;
        }
        Ok(saved)
    }

    /// Export the live graph into `dir`, named after the title
    pub async fn export_to_dir(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let title = self.info.read().await.title.clone();
        let export = {
            let graph = self.graph.read().await;
            WorkflowExport::from_graph(&title, &graph)
        };
        export.write_to_dir(dir).await
    }

    /// Run the live graph to completion
    pub async fn run(&self) -> Result<RunReport, EditorError> {
        let report = self.simulator.run().await?;
        *self.last_run.write().await = Some(report.clone());
        Ok(report)
    }

    /// Diagnose the live graph. Without an explicit error context, a failure
    /// from the last run is passed along.
    ///
    /// The ticket is taken before the graph is read: opening another workflow
    /// after this point supersedes the request, so its result is discarded.
    pub async fn diagnose(&self, error_context: Option<String>) -> DiagnosisOutcome {
        let ticket = self.coordinator.begin().await;

        let error_context = match error_context {
            Some(context) => Some(context),
            None => self.last_failure_context().await,
        };
        let snapshot = self.snapshot().await;
        let title = self.info.read().await.title.clone();

        let request = DiagnosisRequest::new(snapshot)
            .with_title(title)
            .with_runtime_error(error_context);
        self.coordinator.diagnose_with(ticket, request).await
    }

    async fn last_failure_context(&self) -> Option<String> {
        let last_run = self.last_run.read().await;
        let report = last_run.as_ref()?;
        if let RunOutcome::Failed { node_id, reason } = &report.outcome {
            let graph = self.graph.read().await;
            let name = graph
                .node(node_id)
                .map(|n| n.descriptor.name.clone())
                .unwrap_or_else(|| node_id.clone());
            return Some(format!("Node '{}' failed: {}", name, reason));
        }
        None
    }

    /// Replace the live graph with the current proposal and save the result
    /// as an active, fixed copy of the workflow
    pub async fn apply_fix(&self) -> Result<SavedWorkflow, EditorError> {
        let result = self.coordinator.result().await.ok_or(DiagnosisError::NoProposal)?;

        {
            let mut graph = self.graph.write().await;
            DiagnosisCoordinator::apply_fix(&mut graph, &result)?;
        }

        {
            let mut info = self.info.write().await;
            info.title = format!("{} (Fixed)", info.title);
        }
        *self.last_run.write().await = None;
        self.coordinator.dismiss().await;

        self.save().await
    }
}
