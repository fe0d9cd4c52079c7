// Response decoding for the inference service
//
// The service answers with free-form JSON. It is decoded leniently into wire
// structs and then sanitised, so a proposed graph always satisfies the graph
// invariants before anyone can apply it.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{DiagnosisError, DiagnosisResult};
use crate::graph::{Edge, GraphSnapshot, Node, NodeDescriptor, NodeKind, NodeStatus, Point};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDiagnosis {
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    fixed_workflow: Option<WireGraph>,
    #[serde(default)]
    predicted_outcome: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireGraph {
    #[serde(default)]
    nodes: Vec<WireNode>,
    #[serde(default)]
    edges: Vec<WireEdge>,
}

#[derive(Debug, Deserialize)]
struct WireNode {
    id: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    data: WireDescriptor,
}

#[derive(Debug, Default, Deserialize)]
struct WireDescriptor {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    bg: Option<String>,
    #[serde(default)]
    config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireEdge {
    #[serde(default)]
    id: Option<String>,
    source: String,
    target: String,
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // skip the info string (`json`) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode the service's JSON answer into a diagnosis
pub fn parse_diagnosis(text: &str) -> Result<DiagnosisResult, DiagnosisError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(DiagnosisError::EmptyResponse);
    }

    let wire: WireDiagnosis =
        serde_json::from_str(body).map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))?;

    let result = DiagnosisResult {
        analysis_text: wire.analysis.unwrap_or_default(),
        proposed_graph: wire.fixed_workflow.map(sanitize_proposal),
        predicted_outcome: wire.predicted_outcome.unwrap_or_default(),
    };

    if result.is_empty() {
        return Err(DiagnosisError::EmptyResponse);
    }
    Ok(result)
}

fn parse_kind(kind: Option<&str>) -> NodeKind {
    match kind.map(|k| k.trim().to_lowercase()).as_deref() {
        Some("trigger") => NodeKind::Trigger,
        Some("helper") => NodeKind::Helper,
        Some("action") => NodeKind::Action,
        other => {
            if let Some(other) = other {
                debug!("Unknown node type '{}', treating as action", other);
            }
            NodeKind::Action
        },
    }
}

fn into_descriptor(wire: WireDescriptor, fallback_name: &str) -> NodeDescriptor {
    NodeDescriptor {
        key: wire.key,
        name: wire.name.unwrap_or_else(|| fallback_name.to_string()),
        icon: wire.icon.unwrap_or_default(),
        color: wire.color.unwrap_or_default(),
        bg: wire.bg.unwrap_or_default(),
        config: wire.config,
    }
}

/// Turn a proposed graph into one that satisfies the graph invariants.
/// Duplicate nodes and invalid edges are dropped.
fn sanitize_proposal(wire: WireGraph) -> GraphSnapshot {
    let mut node_ids = HashSet::new();
    let mut nodes = Vec::with_capacity(wire.nodes.len());

    for node in wire.nodes {
        if !node_ids.insert(node.id.clone()) {
            warn!("Dropping duplicate node {} from proposed graph", node.id);
            continue;
        }
        let descriptor = into_descriptor(node.data, &node.id);
        nodes.push(Node {
            kind: parse_kind(node.kind.as_deref()),
            position: Point::new(node.x, node.y),
            descriptor,
            status: NodeStatus::Idle,
            id: node.id,
        });
    }

    let mut pairs = HashSet::new();
    let mut edge_ids = HashSet::new();
    let mut edges = Vec::with_capacity(wire.edges.len());

    for edge in wire.edges {
        if !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target) {
            warn!("Dropping dangling edge {} -> {} from proposed graph", edge.source, edge.target);
            continue;
        }
        if edge.source == edge.target {
            warn!("Dropping self-loop on {} from proposed graph", edge.source);
            continue;
        }
        if !pairs.insert((edge.source.clone(), edge.target.clone())) {
            warn!("Dropping duplicate edge {} -> {} from proposed graph", edge.source, edge.target);
            continue;
        }
        let id = edge
            .id
            .filter(|id| !id.is_empty() && !edge_ids.contains(id))
            .unwrap_or_else(|| format!("e-{}", Uuid::new_v4()));
        edge_ids.insert(id.clone());
        edges.push(Edge::new(id, edge.source, edge.target));
    }

    GraphSnapshot { nodes, edges }
}
