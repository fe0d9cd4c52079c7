// Shared utilities for Flow Studio

pub mod serde_helpers;

pub use serde_helpers::{duration_millis, duration_secs};
