// Simulation module for Flow Studio
//
// This module provides the simulated execution engine that animates a run
// over the live graph, together with the pluggable outcome policies that
// decide where a run fails.

pub mod policy;
pub mod simulator;
pub mod types;

// Re-export commonly used types
pub use policy::{policy_for, CompleteAtSink, FailAt, InducedSinkFailure, OutcomePolicy, SinkBehavior};
pub use simulator::ExecutionSimulator;
pub use types::*;
