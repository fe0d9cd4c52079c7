// Graph model for Flow Studio
//
// Owns the nodes and edges of a flow and enforces the structural invariants:
// every edge references existing nodes, no duplicate (source, target) pairs and
// no self-loops. Invalid edges are rejected when they are created, never
// repaired afterwards.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::*;

/// Owned node/edge graph of a single editor session
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    /// Nodes in insertion (render) order
    nodes: Vec<Node>,
    /// Position of each node in `nodes`
    index: HashMap<NodeId, usize>,
    /// Edges in insertion order
    edges: Vec<Edge>,
    /// Existing (source, target) pairs
    pairs: HashSet<(NodeId, NodeId)>,
    /// Bumped on every wholesale replacement
    generation: u64,
}

impl GraphModel {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from plain collections, rejecting anything that would
    /// break the graph invariants
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        for node in nodes {
            if graph.index.contains_key(&node.id) {
                return Err(GraphError::DuplicateNodeId(node.id));
            }
            graph.index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }

        for edge in edges {
            graph.validate_edge(&edge)?;
            graph.pairs.insert((edge.source.clone(), edge.target.clone()));
            graph.edges.push(edge);
        }

        Ok(graph)
    }

    /// Build a graph from a snapshot
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        Self::from_parts(snapshot.nodes, snapshot.edges)
    }

    fn validate_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.index.contains_key(endpoint) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        if edge.source == edge.target {
            return Err(GraphError::SelfLoop(edge.source.clone()));
        }
        if self.pairs.contains(&(edge.source.clone(), edge.target.clone())) {
            return Err(GraphError::DuplicateEdge {
                from: edge.source.clone(),
                to: edge.target.clone(),
            });
        }
        Ok(())
    }

    /// Add a node with a fresh id
    pub fn add_node(&mut self, descriptor: NodeDescriptor, kind: NodeKind, position: Point) -> NodeId {
        let id = format!("node-{}", Uuid::new_v4());
        debug!("Adding {} node {} ({}) at ({:.1}, {:.1})", kind, id, descriptor.name, position.x, position.y);

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node::new(id.clone(), kind, position, descriptor));
        id
    }

    /// Overwrite a node's position; unknown ids are ignored
    pub fn move_node(&mut self, id: &str, position: Point) {
        if let Some(node) = self.node_mut(id) {
            node.position = position;
        }
    }

    /// Connect two nodes.
    ///
    /// Returns `None` without touching the graph for self-loops, unknown ids
    /// and pairs that are already connected.
    pub fn connect(&mut self, source: &str, target: &str) -> Option<EdgeId> {
        match self.try_connect(source, target) {
            Ok(id) => Some(id),
            Err(e) => {
                debug!("Connection rejected: {}", e);
                None
            },
        }
    }

    /// Connect two nodes, reporting why a connection was rejected
    pub fn try_connect(&mut self, source: &str, target: &str) -> Result<EdgeId, GraphError> {
        let edge = Edge::new(format!("e-{}", Uuid::new_v4()), source, target);
        self.validate_edge(&edge).map_err(|e| match e {
            GraphError::DanglingEdge { endpoint, .. } => GraphError::UnknownNode(endpoint),
            other => other,
        })?;

        debug!("Connected {} -> {} ({})", source, target, edge.id);
        let id = edge.id.clone();
        self.pairs.insert((edge.source.clone(), edge.target.clone()));
        self.edges.push(edge);
        Ok(id)
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let position = self.index.remove(id)?;
        let node = self.nodes.remove(position);

        self.edges.retain(|e| e.source != id && e.target != id);
        self.pairs.retain(|(s, t)| s != id && t != id);
        self.reindex();

        debug!("Removed node {}", id);
        Some(node)
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    /// Atomically swap the entire node/edge collection.
    ///
    /// The replacement is validated as a whole; on error the current graph is
    /// left untouched.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(), GraphError> {
        let replacement = Self::from_parts(nodes, edges)?;
        let generation = self.generation + 1;

        info!(
            "Replacing graph: {} nodes / {} edges -> {} nodes / {} edges",
            self.nodes.len(),
            self.edges.len(),
            replacement.nodes.len(),
            replacement.edges.len()
        );

        *self = replacement;
        self.generation = generation;
        Ok(())
    }

    /// First edge leaving `id`, in edge order
    pub fn outgoing_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.source == id)
    }

    /// All edges leaving `id`
    pub fn outgoing_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// All edges entering `id`
    pub fn incoming_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Trigger node ids in graph order
    pub fn triggers(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Trigger)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Set every node's status to idle
    pub fn reset_statuses(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
        }
    }

    /// Update one node's status; returns false if the node is gone
    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.status = status;
                true
            },
            None => false,
        }
    }

    /// Distinct descriptors used by the graph, in node order.
    ///
    /// With `credentials_only`, pure logic helpers that never need
    /// credentials are left out.
    pub fn used_apps(&self, credentials_only: bool) -> Vec<NodeDescriptor> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(|n| &n.descriptor)
            .filter(|d| !credentials_only || !super::catalog::is_credential_free(d))
            .filter(|d| seen.insert(d.identity().to_string()))
            .cloned()
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let i = *self.index.get(id)?;
        self.nodes.get_mut(i)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Replacement counter, used to detect work started against an older graph
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy of the current nodes and edges
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> NodeDescriptor {
        NodeDescriptor::named(name)
    }

    fn two_node_graph() -> (GraphModel, NodeId, NodeId) {
        let mut graph = GraphModel::new();
        let a = graph.add_node(descriptor("Gmail"), NodeKind::Trigger, Point::new(0.0, 0.0));
        let b = graph.add_node(descriptor("OpenAI"), NodeKind::Action, Point::new(300.0, 0.0));
        (graph, a, b)
    }

    #[test]
    fn test_add_node_assigns_unique_ids() {
        let (graph, a, b) = two_node_graph();
        assert_ne!(a, b);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node(&a).unwrap().status, NodeStatus::Idle);
    }

    #[test]
    fn test_connect_rejects_invalid_pairs() {
        let (mut graph, a, b) = two_node_graph();

        assert!(graph.connect(&a, &b).is_some());
        assert!(graph.connect(&a, &b).is_none());
        assert!(graph.connect(&a, &a).is_none());
        assert!(graph.connect(&a, "missing").is_none());
        assert!(graph.connect("missing", &b).is_none());
        assert_eq!(graph.edge_count(), 1);

        assert_eq!(graph.try_connect(&b, &b), Err(GraphError::SelfLoop(b.clone())));
        assert_eq!(
            graph.try_connect(&a, "ghost"),
            Err(GraphError::UnknownNode("ghost".to_string()))
        );
    }

    #[test]
    fn test_reverse_edge_is_allowed() {
        let (mut graph, a, b) = two_node_graph();
        assert!(graph.connect(&a, &b).is_some());
        assert!(graph.connect(&b, &a).is_some());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_move_node_ignores_unknown_ids() {
        let (mut graph, a, _) = two_node_graph();
        graph.move_node(&a, Point::new(42.0, 7.0));
        graph.move_node("missing", Point::new(1.0, 1.0));
        assert_eq!(graph.node(&a).unwrap().position, Point::new(42.0, 7.0));
    }

    #[test]
    fn test_outgoing_edge_takes_first_in_edge_order() {
        let mut graph = two_node_graph().0;
        let ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id.clone()).collect();
        let c = graph.add_node(descriptor("Slack"), NodeKind::Action, Point::ZERO);

        let first = graph.connect(&ids[0], &c).unwrap();
        graph.connect(&ids[0], &ids[1]).unwrap();

        assert_eq!(graph.outgoing_edge(&ids[0]).unwrap().id, first);
        assert_eq!(graph.outgoing_edges(&ids[0]).count(), 2);
        assert!(graph.outgoing_edge(&c).is_none());
        assert_eq!(graph.incoming_edges(&c).count(), 1);
    }

    #[test]
    fn test_reset_statuses() {
        let (mut graph, a, b) = two_node_graph();
        graph.set_status(&a, NodeStatus::Success);
        graph.set_status(&b, NodeStatus::Error);
        graph.reset_statuses();
        assert!(graph.nodes().iter().all(|n| n.status == NodeStatus::Idle));
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let (mut graph, a, b) = two_node_graph();
        graph.connect(&a, &b).unwrap();

        let removed = graph.remove_node(&a).unwrap();
        assert_eq!(removed.id, a);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(&b).is_some());
        assert!(graph.connect(&b, &a).is_none());
    }

    #[test]
    fn test_replace_all_is_atomic() {
        let (mut graph, a, b) = two_node_graph();
        graph.connect(&a, &b).unwrap();
        let before = graph.snapshot();

        let nodes = vec![
            Node::new("T", NodeKind::Trigger, Point::ZERO, descriptor("Webhook")),
            Node::new("A", NodeKind::Action, Point::ZERO, descriptor("HTTP Request")),
        ];
        let bad_edges = vec![Edge::new("e1", "T", "Z")];
        assert!(graph.replace_all(nodes.clone(), bad_edges).is_err());
        assert_eq!(graph.snapshot(), before);
        assert_eq!(graph.generation(), 0);

        graph
            .replace_all(nodes, vec![Edge::new("e1", "T", "A")])
            .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.node(&a).is_none());
        assert_eq!(graph.generation(), 1);
    }

    #[test]
    fn test_from_parts_rejects_duplicates() {
        let nodes = vec![
            Node::new("A", NodeKind::Trigger, Point::ZERO, descriptor("A")),
            Node::new("A", NodeKind::Action, Point::ZERO, descriptor("B")),
        ];
        assert_eq!(
            GraphModel::from_parts(nodes, vec![]).unwrap_err(),
            GraphError::DuplicateNodeId("A".to_string())
        );

        let nodes = vec![
            Node::new("A", NodeKind::Trigger, Point::ZERO, descriptor("A")),
            Node::new("B", NodeKind::Action, Point::ZERO, descriptor("B")),
        ];
        let edges = vec![Edge::new("e1", "A", "B"), Edge::new("e2", "A", "B")];
        assert!(matches!(
            GraphModel::from_parts(nodes, edges),
            Err(GraphError::DuplicateEdge { .. })
        ));
    }

    #[test]
    fn test_used_apps_dedups_by_identity() {
        let mut graph = GraphModel::new();
        let gmail = NodeDescriptor::new("gmail", "Gmail", "mail", "", "");
        graph.add_node(gmail.clone(), NodeKind::Trigger, Point::ZERO);
        graph.add_node(gmail, NodeKind::Action, Point::ZERO);
        graph.add_node(
            NodeDescriptor::new("wait", "Wait", "hourglass_empty", "", ""),
            NodeKind::Helper,
            Point::ZERO,
        );

        assert_eq!(graph.used_apps(false).len(), 2);
        let credentialed = graph.used_apps(true);
        assert_eq!(credentialed.len(), 1);
        assert_eq!(credentialed[0].identity(), "gmail");
    }

    #[test]
    fn test_used_apps_skips_keyless_helpers() {
        let mut graph = GraphModel::new();
        graph.add_node(NodeDescriptor::named("Wait"), NodeKind::Helper, Point::ZERO);
        graph.add_node(NodeDescriptor::named("Switch"), NodeKind::Helper, Point::ZERO);

        assert_eq!(graph.used_apps(false).len(), 2);
        assert!(graph.used_apps(true).is_empty());
    }
}
