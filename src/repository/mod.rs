// Repository module for Flow Studio
//
// This module keeps saved workflows and folders behind the
// `WorkflowRepository` contract.

pub mod store;
pub mod types;

// Re-export commonly used types
pub use store::{InMemoryWorkflowRepository, WorkflowRepository};
pub use types::*;
