//! Configuration and shared types
//!
//! Sandbox limits, file/env configuration, outcome types and the error enum.

pub mod config;
pub mod types;
