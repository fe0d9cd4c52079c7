//! Flow Studio Library
//!
//! This library provides the core of the Flow Studio automation-flow editor:
//! the node graph, canvas interaction, simulated runs, AI-assisted diagnosis
//! and the saved-workflow repository.

pub mod canvas;
pub mod config;
pub mod diagnosis;
pub mod editor;
pub mod graph;
pub mod repository;
pub mod simulation;
pub mod utils;

// Re-export main types for convenience
pub use canvas::CanvasInteractionController;
pub use config::ConfigManager;
pub use diagnosis::DiagnosisCoordinator;
pub use editor::EditorSession;
pub use graph::GraphModel;
pub use repository::InMemoryWorkflowRepository;
pub use simulation::ExecutionSimulator;
