// Saved workflow types for Flow Studio
//
// Records kept by the workflow repository: saved workflows, their status and
// the folders they are filed under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::graph::{Edge, GraphModel, GraphSnapshot, Node, NodeDescriptor};

/// Unique identifier for a saved workflow
pub type WorkflowId = String;

/// Unique identifier for a folder
pub type FolderId = String;

/// Title used when a workflow is saved without one
pub const UNTITLED_WORKFLOW: &str = "Untitled Workflow";

/// Color tokens given to new folders
pub const DEFAULT_FOLDER_COLOR: &str = "bg-gray-100 text-gray-600";

/// Lifecycle status of a saved workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Active,
    #[default]
    Draft,
    Paused,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Active => write!(f, "Active"),
            WorkflowStatus::Draft => write!(f, "Draft"),
            WorkflowStatus::Paused => write!(f, "Paused"),
        }
    }
}

/// A stored workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWorkflow {
    pub id: WorkflowId,
    pub title: String,
    pub folder_id: Option<FolderId>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub status: WorkflowStatus,
    pub last_modified: DateTime<Utc>,
    /// Distinct apps used by the nodes
    pub apps: Vec<NodeDescriptor>,
}

impl SavedWorkflow {
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Draft that would save this workflow back unchanged, ready for edits
    pub fn to_draft(&self) -> WorkflowDraft {
        WorkflowDraft {
            id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            folder_id: self.folder_id.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            status: Some(self.status),
            apps: Some(self.apps.clone()),
        }
    }
}

/// Partial workflow passed to `save`; missing fields take their defaults
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowDraft {
    /// Existing id to overwrite; `None` creates a new workflow
    pub id: Option<WorkflowId>,
    pub title: Option<String>,
    pub folder_id: Option<FolderId>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub status: Option<WorkflowStatus>,
    /// Explicit app list; derived from `nodes` when `None`
    pub apps: Option<Vec<NodeDescriptor>>,
}

impl WorkflowDraft {
    /// Draft holding the current contents of a graph
    pub fn from_graph(graph: &GraphModel) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            apps: Some(graph.used_apps(false)),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn in_folder(mut self, folder_id: impl Into<FolderId>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

/// Distinct descriptors of `nodes`, in node order
pub fn apps_of(nodes: &[Node]) -> Vec<NodeDescriptor> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|n| seen.insert(n.descriptor.identity().to_string()))
        .map(|n| n.descriptor.clone())
        .collect()
}

/// A folder grouping saved workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub color: String,
}

/// Errors from the workflow repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Workflow not found: {0}")]
    NotFound(WorkflowId),

    #[error("Folder not found: {0}")]
    UnknownFolder(FolderId),

    #[error("Folder name must not be empty")]
    EmptyFolderName,
}
