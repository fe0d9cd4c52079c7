// Core data types for workflow diagnosis
//
// Requests sent to the inference service, the structured result it returns and
// the errors that can occur along the way.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::graph::{GraphError, GraphSnapshot};

/// Payload describing the workflow to diagnose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub workflow: GraphSnapshot,
    /// Error reported by the last run, passed as extra context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<String>,
}

impl DiagnosisRequest {
    pub fn new(workflow: GraphSnapshot) -> Self {
        Self {
            title: None,
            workflow,
            runtime_error: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_runtime_error(mut self, error: Option<String>) -> Self {
        self.runtime_error = error.filter(|e| !e.trim().is_empty());
        self
    }
}

/// Analysis report plus an optional replacement graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagnosisResult {
    /// Report sectioned with `#` / `##` headings
    #[serde(rename = "analysis", default)]
    pub analysis_text: String,
    /// Full replacement graph; `None` means no fix is available
    #[serde(rename = "fixedWorkflow", default)]
    pub proposed_graph: Option<GraphSnapshot>,
    /// Expected behavior if the proposal is applied
    #[serde(rename = "predictedOutcome", default)]
    pub predicted_outcome: String,
}

impl DiagnosisResult {
    /// Sentinel for a diagnosis that could not be obtained
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn has_fix(&self) -> bool {
        self.proposed_graph.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.analysis_text.trim().is_empty() && self.proposed_graph.is_none()
    }
}

/// How a diagnose call ended
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosisOutcome {
    /// A usable result, now held by the coordinator
    Ready(DiagnosisResult),
    /// The service failed; carries the sentinel result and the reason
    Unavailable { result: DiagnosisResult, reason: String },
    /// The request was superseded before it resolved; nothing was stored
    Discarded,
}

impl DiagnosisOutcome {
    pub fn result(&self) -> Option<&DiagnosisResult> {
        match self {
            DiagnosisOutcome::Ready(result) | DiagnosisOutcome::Unavailable { result, .. } => Some(result),
            DiagnosisOutcome::Discarded => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DiagnosisOutcome::Ready(_))
    }
}

/// Errors from the inference call or from applying a fix
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Malformed diagnosis response: {0}")]
    MalformedResponse(String),

    #[error("Inference service returned an empty diagnosis")]
    EmptyResponse,

    #[error("Diagnosis timed out after {0:?}")]
    Timeout(Duration),

    #[error("No API key configured for the inference service")]
    MissingApiKey,

    #[error("Failed to encode workflow: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Diagnosis has no proposed graph")]
    NoProposal,

    #[error("Proposed graph is invalid: {0}")]
    InvalidProposal(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeDescriptor, NodeKind, Point};

    #[test]
    fn test_request_payload_shape() {
        let workflow = GraphSnapshot {
            nodes: vec![Node::new("t", NodeKind::Trigger, Point::new(1.0, 2.0), NodeDescriptor::named("Gmail"))],
            edges: vec![Edge::new("e1", "t", "t2")],
        };
        let request = DiagnosisRequest::new(workflow)
            .with_title("Inbox triage")
            .with_runtime_error(Some("Timeout".to_string()));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["title"], "Inbox triage");
        assert_eq!(json["runtimeError"], "Timeout");
        assert_eq!(json["nodes"][0]["type"], "trigger");
        assert_eq!(json["nodes"][0]["x"], 1.0);
        assert_eq!(json["nodes"][0]["data"]["name"], "Gmail");
        assert_eq!(json["edges"][0]["source"], "t");
    }

    #[test]
    fn test_blank_runtime_error_is_dropped() {
        let request = DiagnosisRequest::new(GraphSnapshot::default()).with_runtime_error(Some("  ".to_string()));
        assert!(request.runtime_error.is_none());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("runtimeError").is_none());
    }

    #[test]
    fn test_unavailable_sentinel() {
        let sentinel = DiagnosisResult::unavailable();
        assert!(sentinel.is_empty());
        assert!(!sentinel.has_fix());
        assert_eq!(DiagnosisOutcome::Discarded.result(), None);
    }
}
