// Node geometry for the Flow Studio canvas
//
// Node bounds, connection handles, hit testing and edge curves, all in world
// coordinates.

use serde::{Deserialize, Serialize};

use crate::graph::{GraphModel, Node, NodeId, NodeKind, Point};

/// Node body width in world units
pub const NODE_WIDTH: f64 = 200.0;

/// Node body height in world units
pub const NODE_HEIGHT: f64 = 80.0;

/// Grab radius of the output handle
pub const HANDLE_RADIUS: f64 = 10.0;

/// Bezier control-point offset as a share of the horizontal distance
const CURVE_TENSION: f64 = 0.4;

/// What lies under a world point, in event-capture priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    /// A node's output handle
    Handle(NodeId),
    /// A node body
    Node(NodeId),
    /// Empty canvas
    Canvas,
}

/// Offset from a node's top-left corner to its visual center
pub fn center_offset() -> Point {
    Point::new(NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0)
}

/// Right-middle anchor where outgoing edges start
pub fn output_anchor(node: &Node) -> Point {
    node.position.offset(NODE_WIDTH, NODE_HEIGHT / 2.0)
}

/// Left-middle anchor where incoming edges end
pub fn input_anchor(node: &Node) -> Point {
    node.position.offset(0.0, NODE_HEIGHT / 2.0)
}

/// Whether nodes of this kind accept incoming connections
pub fn accepts_input(node: &Node) -> bool {
    node.kind != NodeKind::Trigger
}

pub fn body_contains(node: &Node, world: Point) -> bool {
    world.x >= node.position.x
        && world.x <= node.position.x + NODE_WIDTH
        && world.y >= node.position.y
        && world.y <= node.position.y + NODE_HEIGHT
}

pub fn handle_contains(node: &Node, world: Point) -> bool {
    output_anchor(node).distance(world) <= HANDLE_RADIUS
}

/// Find what is under `world`. Later nodes render on top, so they win ties;
/// any handle beats any node body.
pub fn hit_test(graph: &GraphModel, world: Point) -> HitTarget {
    let nodes = graph.nodes();

    if let Some(node) = nodes.iter().rev().find(|n| handle_contains(n, world)) {
        return HitTarget::Handle(node.id.clone());
    }
    if let Some(node) = nodes.iter().rev().find(|n| body_contains(n, world)) {
        return HitTarget::Node(node.id.clone());
    }
    HitTarget::Canvas
}

/// Cubic Bezier curve used to draw an edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl EdgeCurve {
    /// Horizontal S-curve from `start` to `end`
    pub fn between(start: Point, end: Point) -> Self {
        let dist = (start.x - end.x).abs();
        Self {
            start,
            control1: Point::new(start.x + dist * CURVE_TENSION, start.y),
            control2: Point::new(end.x - dist * CURVE_TENSION, end.y),
            end,
        }
    }

    /// SVG path data
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Curve for an existing edge; `None` if either endpoint is missing
pub fn edge_curve(graph: &GraphModel, source: &str, target: &str) -> Option<EdgeCurve> {
    let source = graph.node(source)?;
    let target = graph.node(target)?;
    Some(EdgeCurve::between(output_anchor(source), input_anchor(target)))
}
