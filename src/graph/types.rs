// Core graph types for Flow Studio
//
// This module defines the node, edge and descriptor types shared by the canvas,
// the execution simulator and the diagnosis workflow.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};
use thiserror::Error;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// A point in either world or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift the point by the given offsets
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Role of a node inside a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Starting point of execution, never has incoming edges
    Trigger,
    /// Integration step
    Action,
    /// Logic or utility step
    Helper,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Trigger => write!(f, "trigger"),
            NodeKind::Action => write!(f, "action"),
            NodeKind::Helper => write!(f, "helper"),
        }
    }
}

/// Transient run state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Idle => write!(f, "idle"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Success => write!(f, "success"),
            NodeStatus::Error => write!(f, "error"),
        }
    }
}

/// Display metadata for a node.
///
/// Identity is the stable catalog `key` when one is present. Descriptors that
/// arrive without a key (for example inside a proposed graph) fall back to
/// their display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Stable catalog key (`gmail`, `http`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Human-readable name
    pub name: String,
    /// Icon identifier
    #[serde(default)]
    pub icon: String,
    /// Foreground color token
    #[serde(default)]
    pub color: String,
    /// Background color token
    #[serde(default)]
    pub bg: String,
    /// Free-form node configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl NodeDescriptor {
    /// Create a descriptor bound to a catalog key
    pub fn new(key: &str, name: &str, icon: &str, color: &str, bg: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            bg: bg.to_string(),
            config: None,
        }
    }

    /// Create a descriptor with only a display name
    pub fn named(name: &str) -> Self {
        Self {
            key: None,
            name: name.to_string(),
            icon: String::new(),
            color: String::new(),
            bg: String::new(),
            config: None,
        }
    }

    /// Identity used for deduplication
    pub fn identity(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// Whether two descriptors refer to the same app
    pub fn same_app(&self, other: &NodeDescriptor) -> bool {
        self.identity() == other.identity()
    }
}

/// A unit of work in a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Top-left corner in world coordinates
    #[serde(flatten)]
    pub position: Point,
    #[serde(rename = "data")]
    pub descriptor: NodeDescriptor,
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, position: Point, descriptor: NodeDescriptor) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            descriptor,
            status: NodeStatus::Idle,
        }
    }
}

/// A directed link from the output of `source` to the input of `target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Plain node/edge collections, as exchanged with the inference service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Reasons a graph mutation is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Self-loop on node {0}")]
    SelfLoop(NodeId),

    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge { from: NodeId, to: NodeId },

    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Edge {edge} references missing node {endpoint}")]
    DanglingEdge { edge: EdgeId, endpoint: NodeId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_wire_format() {
        let node = Node::new(
            "1",
            NodeKind::Trigger,
            Point::new(250.0, 300.0),
            NodeDescriptor::new("gmail", "Gmail", "mail", "text-red-600", "bg-red-100"),
        );

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "trigger");
        assert_eq!(json["x"], 250.0);
        assert_eq!(json["y"], 300.0);
        assert_eq!(json["data"]["name"], "Gmail");
        assert_eq!(json["status"], "idle");
    }

    #[test]
    fn test_node_status_defaults_to_idle() {
        let json = r#"{"id":"a","type":"action","x":1,"y":2,"data":{"name":"Slack"}}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.status, NodeStatus::Idle);
        assert_eq!(node.position, Point::new(1.0, 2.0));
        assert!(node.descriptor.key.is_none());
    }

    #[test]
    fn test_descriptor_identity_prefers_key() {
        let mut keyed = NodeDescriptor::new("sheets", "Google Sheets", "table_view", "", "");
        let renamed = NodeDescriptor::new("sheets", "Sheets (renamed)", "table_view", "", "");
        assert!(keyed.same_app(&renamed));

        keyed.key = None;
        assert_eq!(keyed.identity(), "Google Sheets");
        assert!(!keyed.same_app(&renamed));
    }

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(p - Point::new(4.0, 5.0), Point::new(6.0, 15.0));
        assert_eq!(p * 2.0, Point::new(20.0, 40.0));
        assert_eq!(p / 2.0, Point::new(5.0, 10.0));
        assert_eq!(p.offset(-10.0, 0.0), Point::new(0.0, 20.0));
    }
}
