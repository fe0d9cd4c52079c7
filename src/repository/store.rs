// Workflow repository for Flow Studio
//
// CRUD contract for saved workflows and folders, with a process-lifetime
// in-memory implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::*;

/// Storage for saved workflows and folders
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Upsert by id. A draft without id gets a fresh one and is listed first;
    /// an existing workflow keeps its position.
    async fn save(&self, draft: WorkflowDraft) -> Result<SavedWorkflow, RepositoryError>;

    /// Get a workflow by id
    async fn get(&self, id: &str) -> Option<SavedWorkflow>;

    /// All workflows, most recently created first
    async fn list(&self) -> Vec<SavedWorkflow>;

    /// Workflows filed under a folder
    async fn list_in_folder(&self, folder_id: &str) -> Vec<SavedWorkflow> {
        self.list()
            .await
            .into_iter()
            .filter(|w| w.folder_id.as_deref() == Some(folder_id))
            .collect()
    }

    /// Remove a workflow
    async fn delete(&self, id: &str) -> Result<SavedWorkflow, RepositoryError>;

    /// Create a folder with a fresh id
    async fn create_folder(&self, name: &str) -> Result<Folder, RepositoryError>;

    /// All folders in creation order
    async fn folders(&self) -> Vec<Folder>;
}

#[derive(Debug, Default)]
struct Store {
    workflows: Vec<SavedWorkflow>,
    folders: Vec<Folder>,
}

/// In-memory repository; contents live as long as the process
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, draft: WorkflowDraft) -> Result<SavedWorkflow, RepositoryError> {
        let mut store = self.store.write().await;

        if let Some(folder_id) = &draft.folder_id {
            if !store.folders.iter().any(|f| &f.id == folder_id) {
                return Err(RepositoryError::UnknownFolder(folder_id.clone()));
            }
        }

        let id = draft.id.unwrap_or_else(|| format!("w-{}", Uuid::new_v4()));
        let apps = draft.apps.unwrap_or_else(|| apps_of(&draft.nodes));
        let title = draft
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED_WORKFLOW.to_string());

        let workflow = SavedWorkflow {
            id,
            title,
            folder_id: draft.folder_id,
            nodes: draft.nodes,
            edges: draft.edges,
            status: draft.status.unwrap_or_default(),
            last_modified: Utc::now(),
            apps,
        };

        match store.workflows.iter().position(|w| w.id == workflow.id) {
            Some(index) => {
                debug!("Updating workflow {}", workflow.id);
                store.workflows[index] = workflow.clone();
            },
            None => {
                info!("Created workflow {} ('{}')", workflow.id, workflow.title);
                store.workflows.insert(0, workflow.clone());
            },
        }

        Ok(workflow)
    }

    async fn get(&self, id: &str) -> Option<SavedWorkflow> {
        self.store.read().await.workflows.iter().find(|w| w.id == id).cloned()
    }

    async fn list(&self) -> Vec<SavedWorkflow> {
        self.store.read().await.workflows.clone()
    }

    async fn delete(&self, id: &str) -> Result<SavedWorkflow, RepositoryError> {
        let mut store = self.store.write().await;
        let index = store
            .workflows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        info!("Deleted workflow {}", id);
        Ok(store.workflows.remove(index))
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, RepositoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::EmptyFolderName);
        }

        let folder = Folder {
            id: format!("f-{}", Uuid::new_v4()),
            name: name.to_string(),
            color: DEFAULT_FOLDER_COLOR.to_string(),
        };
        self.store.write().await.folders.push(folder.clone());
        info!("Created folder {} ('{}')", folder.id, folder.name);
        Ok(folder)
    }

    async fn folders(&self) -> Vec<Folder> {
        self.store.read().await.folders.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphModel, NodeDescriptor, NodeKind, Point};

    #[tokio::test]
    async fn test_new_workflow_defaults() {
        let repo = InMemoryWorkflowRepository::new();
        let saved = repo.save(WorkflowDraft::default()).await.unwrap();

        assert!(saved.id.starts_with("w-"));
        assert_eq!(saved.title, UNTITLED_WORKFLOW);
        assert_eq!(saved.status, WorkflowStatus::Draft);
        assert!(saved.folder_id.is_none());
        assert_eq!(repo.get(&saved.id).await, Some(saved.clone()));
    }

    #[tokio::test]
    async fn test_save_is_upsert_by_id() {
        let repo = InMemoryWorkflowRepository::new();
        let first = repo.save(WorkflowDraft::default().with_title("First")).await.unwrap();
        let second = repo.save(WorkflowDraft::default().with_title("Second")).await.unwrap();

        let titles: Vec<_> = repo.list().await.into_iter().map(|w| w.title).collect();
        assert_eq!(titles, vec!["Second", "First"]);

        let updated = repo
            .save(first.to_draft().with_title("First v2").with_status(WorkflowStatus::Active))
            .await
            .unwrap();
        assert_eq!(updated.id, first.id);

        let list = repo.list().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].title, "First v2");
        assert_eq!(list[1].status, WorkflowStatus::Active);
    }

    #[tokio::test]
    async fn test_apps_derived_from_graph() {
        let mut graph = GraphModel::new();
        let a = graph.add_node(NodeDescriptor::named("Gmail"), NodeKind::Trigger, Point::ZERO);
        let b = graph.add_node(NodeDescriptor::named("Gmail"), NodeKind::Action, Point::ZERO);
        graph.connect(&a, &b);

        let repo = InMemoryWorkflowRepository::new();
        let saved = repo.save(WorkflowDraft::from_graph(&graph)).await.unwrap();
        assert_eq!(saved.nodes.len(), 2);
        assert_eq!(saved.edges.len(), 1);
        assert_eq!(saved.apps.len(), 1);

        let draft = WorkflowDraft {
            nodes: graph.nodes().to_vec(),
            ..WorkflowDraft::default()
        };
        assert_eq!(repo.save(draft).await.unwrap().apps.len(), 1);
    }

    #[tokio::test]
    async fn test_folders() {
        let repo = InMemoryWorkflowRepository::new();
        assert_eq!(repo.create_folder("  ").await, Err(RepositoryError::EmptyFolderName));

        let folder = repo.create_folder("Marketing Campaigns").await.unwrap();
        assert!(folder.id.starts_with("f-"));
        assert_eq!(folder.color, DEFAULT_FOLDER_COLOR);
        assert_eq!(repo.folders().await, vec![folder.clone()]);

        repo.save(WorkflowDraft::default().in_folder(folder.id.clone())).await.unwrap();
        repo.save(WorkflowDraft::default()).await.unwrap();
        assert_eq!(repo.list_in_folder(&folder.id).await.len(), 1);

        let missing = repo.save(WorkflowDraft::default().in_folder("f-missing")).await;
        assert_eq!(missing, Err(RepositoryError::UnknownFolder("f-missing".to_string())));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryWorkflowRepository::new();
        let saved = repo.save(WorkflowDraft::default()).await.unwrap();

        assert_eq!(repo.delete(&saved.id).await.unwrap().id, saved.id);
        assert!(repo.get(&saved.id).await.is_none());
        assert_eq!(repo.delete(&saved.id).await, Err(RepositoryError::NotFound(saved.id.clone())));
    }
}
