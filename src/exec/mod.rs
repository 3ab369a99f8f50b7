//! Execution control
//!
//! Process launch under a wall-clock deadline and resource limits.

pub mod executor;
