// Workflow export for Flow Studio
//
// Writes the live graph verbatim into the JSON export document.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::info;

use super::model::GraphModel;
use super::types::{Edge, Node};

/// Current export document version
pub const EXPORT_VERSION: &str = "1.0";

/// Exported workflow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExport {
    pub title: String,
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowExport {
    /// Capture the graph as it is right now
    pub fn from_graph(title: &str, graph: &GraphModel) -> Self {
        Self {
            title: title.to_string(),
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
        }
    }

    /// File name derived from the title: whitespace runs become `_`
    pub fn file_name(&self) -> String {
        let stem = self.title.split_whitespace().collect::<Vec<_>>().join("_");
        let stem = if stem.is_empty() { "workflow".to_string() } else { stem };
        format!("{}.json", stem)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize workflow export")
    }

    /// Write the document into `dir`, returning the written path
    pub async fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        self.write_to(&path).await?;
        Ok(path)
    }

    /// Write the document to an explicit path
    pub async fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_pretty()?;
        async_fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;

        info!("Exported workflow '{}' to {}", self.title, path.display());
        Ok(())
    }
}
