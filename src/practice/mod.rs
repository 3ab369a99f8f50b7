//! Practice orchestration.
//!
//! Ties the bank, the grading engine and the progress store together for
//! one learner at a time. Persistence and presentation stay with the caller.

pub mod service;
pub mod wire;

pub use service::{PracticeMode, PracticeService, SessionSummary};
pub use wire::{GradeRequest, GradeResponse, RunRequest};
