// Editor module for Flow Studio
//
// This module ties the graph, canvas, simulator, diagnosis coordinator and
// repository together into an editor session.

pub mod session;

// Re-export commonly used types
pub use session::{EditorError, EditorSession, WorkflowInfo};
