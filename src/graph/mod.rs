// Graph module for Flow Studio
//
// This module owns the flow graph data model: nodes, edges, descriptors,
// the palette catalog and the JSON export document.

pub mod catalog;
pub mod export;
pub mod model;
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogEntry, NodeCatalog, PaletteCategory, PaletteTab};
pub use export::WorkflowExport;
pub use model::GraphModel;
pub use types::*;
