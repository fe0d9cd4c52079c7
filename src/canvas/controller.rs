// Canvas interaction controller for Flow Studio
//
// Interprets pointer, wheel and drag-and-drop events against the graph and the
// viewport. A single drag session is active at a time; handles take priority
// over node bodies, which take priority over the empty canvas.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::geometry::{self, EdgeCurve, HitTarget};
use super::viewport::{self, ViewportState};
use crate::graph::{EdgeId, GraphModel, NodeDescriptor, NodeId, NodeKind, PaletteTab, Point};

/// Screen point used as the anchor when adding a node without a drop position
pub const VIEW_ANCHOR: Point = Point { x: 300.0, y: 300.0 };

/// Current drag session
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// Dragging the empty canvas. `origin` is the pointer position minus the
    /// pan at pointer-down, in screen space.
    Panning { origin: Point },
    /// Moving a node. `grab_offset` is the grab point relative to the node's
    /// top-left corner, in world space.
    DraggingNode { node_id: NodeId, grab_offset: Point },
    /// Drawing a provisional edge out of `source`
    Connecting { source: NodeId },
    /// An external palette drag is hovering the canvas
    PaletteDrop,
}

/// Observable result of an interaction
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasChange {
    Panned,
    NodeMoved(NodeId),
    Connected(EdgeId),
    ConnectionDiscarded,
    NodeCreated(NodeId),
    Zoomed,
    Selected(NodeId),
}

/// Palette drop payload: a node descriptor, optionally carrying its kind
#[derive(Debug, Clone, Deserialize)]
struct DropPayload {
    #[serde(flatten)]
    descriptor: NodeDescriptor,
    #[serde(default, rename = "type")]
    kind: Option<NodeKind>,
}

/// Pointer/drag state machine over a graph and a viewport
#[derive(Debug, Clone, Default)]
pub struct CanvasInteractionController {
    viewport: ViewportState,
    mode: InteractionMode,
    /// Last known cursor position in world space
    cursor: Point,
    palette_tab: PaletteTab,
    selected: Option<NodeId>,
}

impl CanvasInteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: ViewportState) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn palette_tab(&self) -> PaletteTab {
        self.palette_tab
    }

    pub fn set_palette_tab(&mut self, tab: PaletteTab) {
        self.palette_tab = tab;
    }

    pub fn selected_node(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Start a drag session. Ignored while another session is active.
    pub fn pointer_down(&mut self, graph: &GraphModel, screen: Point) -> &InteractionMode {
        if self.mode != InteractionMode::Idle {
            debug!("Pointer down ignored, interaction already active: {:?}", self.mode);
            return &self.mode;
        }

        let world = self.viewport.to_world(screen);
        self.cursor = world;

        self.mode = match geometry::hit_test(graph, world) {
            HitTarget::Handle(source) => {
                debug!("Connecting from {}", source);
                InteractionMode::Connecting { source }
            },
            HitTarget::Node(node_id) => match graph.node(&node_id) {
                Some(node) => InteractionMode::DraggingNode {
                    grab_offset: world - node.position,
                    node_id,
                },
                None => InteractionMode::Idle,
            },
            HitTarget::Canvas => InteractionMode::Panning {
                origin: screen - self.viewport.pan,
            },
        };
        &self.mode
    }

    /// Track the pointer, moving whatever the active session drags
    pub fn pointer_move(&mut self, graph: &mut GraphModel, screen: Point) -> Option<CanvasChange> {
        self.cursor = self.viewport.to_world(screen);

        match &self.mode {
            InteractionMode::Panning { origin } => {
                self.viewport.pan = screen - *origin;
                self.cursor = self.viewport.to_world(screen);
                Some(CanvasChange::Panned)
            },
            InteractionMode::DraggingNode { node_id, grab_offset } => {
                if !graph.contains_node(node_id) {
                    // node vanished mid-drag (graph replaced)
                    self.mode = InteractionMode::Idle;
                    return None;
                }
                graph.move_node(node_id, self.cursor - *grab_offset);
                Some(CanvasChange::NodeMoved(node_id.clone()))
            },
            _ => None,
        }
    }

    /// End the active drag session
    pub fn pointer_up(&mut self, graph: &mut GraphModel, screen: Point) -> Option<CanvasChange> {
        let mode = std::mem::take(&mut self.mode);
        self.cursor = self.viewport.to_world(screen);

        match mode {
            InteractionMode::Connecting { source } => Some(self.finish_connection(graph, &source)),
            InteractionMode::PaletteDrop => {
                // palette drags end with `drop` or `drag_leave`, not pointer-up
                self.mode = InteractionMode::PaletteDrop;
                None
            },
            _ => None,
        }
    }

    fn finish_connection(&self, graph: &mut GraphModel, source: &str) -> CanvasChange {
        let target = match geometry::hit_test(graph, self.cursor) {
            HitTarget::Node(id) | HitTarget::Handle(id) => id,
            HitTarget::Canvas => {
                debug!("Connection from {} released over empty canvas", source);
                return CanvasChange::ConnectionDiscarded;
            },
        };

        if target == source {
            debug!("Connection from {} released over itself", source);
            return CanvasChange::ConnectionDiscarded;
        }
        if !graph.node(&target).map(geometry::accepts_input).unwrap_or(false) {
            debug!("Node {} does not accept incoming connections", target);
            return CanvasChange::ConnectionDiscarded;
        }

        match graph.connect(source, &target) {
            Some(edge_id) => {
                info!("Connected {} -> {}", source, target);
                CanvasChange::Connected(edge_id)
            },
            None => CanvasChange::ConnectionDiscarded,
        }
    }

    /// Curve from the connection source to the live cursor, while connecting
    pub fn provisional_edge(&self, graph: &GraphModel) -> Option<EdgeCurve> {
        match &self.mode {
            InteractionMode::Connecting { source } => {
                let node = graph.node(source)?;
                Some(EdgeCurve::between(geometry::output_anchor(node), self.cursor))
            },
            _ => None,
        }
    }

    /// Wheel gesture; only zooms while the zoom modifier is held
    pub fn wheel(&mut self, delta_y: f64, zoom_modifier: bool) -> Option<CanvasChange> {
        if !zoom_modifier {
            return None;
        }
        self.viewport = viewport::wheel_zoom(delta_y, &self.viewport);
        debug!("Zoom now {:.2}", self.viewport.zoom);
        Some(CanvasChange::Zoomed)
    }

    /// External palette drag entered the canvas
    pub fn drag_enter(&mut self) -> bool {
        if self.mode != InteractionMode::Idle {
            return false;
        }
        self.mode = InteractionMode::PaletteDrop;
        true
    }

    /// External palette drag left the canvas without dropping
    pub fn drag_leave(&mut self) {
        if self.mode == InteractionMode::PaletteDrop {
            self.mode = InteractionMode::Idle;
        }
    }

    /// Create a node from a palette drop payload, centered under the cursor
    pub fn drop(&mut self, graph: &mut GraphModel, screen: Point, payload: &str) -> Option<CanvasChange> {
        match self.mode {
            InteractionMode::PaletteDrop | InteractionMode::Idle => {},
            _ => return None,
        }
        self.mode = InteractionMode::Idle;

        let payload: DropPayload = match serde_json::from_str(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring undecodable drop payload: {}", e);
                return None;
            },
        };

        let world = self.viewport.to_world(screen);
        self.cursor = world;
        let kind = payload.kind.unwrap_or_else(|| self.palette_tab.default_kind());
        let id = graph.add_node(payload.descriptor, kind, world - geometry::center_offset());

        info!("Dropped new {} node {}", kind, id);
        Some(CanvasChange::NodeCreated(id))
    }

    /// Add an action node at the world point under the view anchor
    pub fn add_at_view_anchor(&mut self, graph: &mut GraphModel, descriptor: NodeDescriptor) -> NodeId {
        let position = self.viewport.to_world(VIEW_ANCHOR);
        graph.add_node(descriptor, NodeKind::Action, position)
    }

    /// Select the node under the pointer for the properties panel
    pub fn double_click(&mut self, graph: &GraphModel, screen: Point) -> Option<CanvasChange> {
        match geometry::hit_test(graph, self.viewport.to_world(screen)) {
            HitTarget::Node(id) | HitTarget::Handle(id) => {
                self.selected = Some(id.clone());
                Some(CanvasChange::Selected(id))
            },
            HitTarget::Canvas => None,
        }
    }
}
