// Configuration module for Flow Studio
//
// This module handles the studio configuration file, environment overrides
// and validation.

pub mod manager;
pub mod types;

// Re-export commonly used types
pub use manager::ConfigManager;
pub use types::{DiagnosisConfig, InferenceConfig, LogLevel, SimulationConfig, StudioConfig, ValidationResult};
