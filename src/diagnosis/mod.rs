// Diagnosis module for Flow Studio
//
// This module obtains AI diagnoses for failing workflows: the inference
// service seam and its HTTP client, response decoding, the analysis text
// parser and the coordinator that tracks request staleness and applies fixes.

pub mod analysis;
pub mod client;
pub mod coordinator;
pub mod prompt;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use analysis::{parse_analysis, AlternativeOption, AnalysisSection};
pub use client::{GeminiClient, InferenceService};
pub use coordinator::{DiagnosisCoordinator, DiagnosisTicket};
pub use types::*;
pub use wire::parse_diagnosis;
