// Canvas module for Flow Studio
//
// Screen/world transforms, node geometry and the pointer interaction state
// machine that edits the graph.

pub mod controller;
pub mod geometry;
pub mod viewport;

// Re-export commonly used types
pub use controller::{CanvasChange, CanvasInteractionController, InteractionMode};
pub use geometry::{EdgeCurve, HitTarget};
pub use viewport::ViewportState;
