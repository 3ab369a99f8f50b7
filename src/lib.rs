//! ctrainer: sandboxed execution and adaptive grading for C practice exercises
//!
//! # Architecture
//!
//! ## Sandbox ([`crate::core`])
//! - [`crate::core::sandbox`]: Write, compile and run one untrusted C program per call
//!
//! ## Execution Control ([`exec`])
//! - [`exec::executor`]: Process launch with deadline, process-group kill and rlimits
//!
//! ## Toolchain Adapters ([`judge`])
//! - [`judge::adapter`]: Compile/syntax/run command contract
//! - [`judge::languages`]: gcc C11 adapter
//!
//! ## Outcome Classification ([`verdict`])
//! - [`verdict::verdict`]: Pure classification of compile and run reports
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Run-scoped working directories, released on drop
//! - [`safety::reaper`]: Run tags and the sweep of descendants that left the process group
//!
//! ## Question Bank ([`bank`])
//! - [`bank::question`]: Question records and type tags
//! - [`bank::repository`]: File-backed bank with an explicit cache
//!
//! ## Grading ([`grading`])
//! - [`grading::engine`]: Dispatch from question type to strategy
//! - [`grading::text`], [`grading::structured`], [`grading::execution`]: the ten strategies
//!
//! ## Planning ([`planner`])
//! - [`planner::session`]: Adaptive session planner and progress summaries
//! - [`planner::progress`]: Category scores, attempts, the `ProgressStore` seam
//!
//! ## Practice ([`practice`])
//! - [`practice::service`]: Sessions, submissions, attempt recording
//! - [`practice::wire`]: Request and response shapes
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: Limits, paths, environment overrides
//! - [`config::types`]: Outcomes, failure taxonomy, error enum
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Bounded output collection

// Sandbox
pub mod core;

// Execution Control
pub mod exec;

// Toolchain adapters
pub mod judge;

// Outcome classification
pub mod verdict;

// Safety & Cleanup
pub mod safety;

// Question bank
pub mod bank;

// Grading
pub mod grading;

// Adaptive planning
pub mod planner;

// Practice orchestration
pub mod practice;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the ctrainer binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;

pub use bank::{FileQuestionRepository, Question, QuestionRepository, QuestionType};
pub use config::config::{SandboxLimits, TrainerConfig};
pub use crate::core::sandbox::{CodeRunner, CodeSandbox};
pub use grading::{GradingEngine, GradingResult};
pub use planner::{AdaptiveSessionPlanner, MemoryProgressStore, ProgressStore, SessionPlan};
pub use practice::{GradeRequest, GradeResponse, PracticeMode, PracticeService};
