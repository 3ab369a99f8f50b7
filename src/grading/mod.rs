//! Answer grading.
//!
//! One strategy per question type, selected by an exhaustive match.
//! Code-based types run learner programs through a `CodeRunner`.

pub mod engine;
pub mod execution;
pub mod normalize;
pub mod result;
pub mod strategy;
pub mod structured;
pub mod text;

pub use engine::GradingEngine;
pub use result::{BlankReport, GradingDetail, GradingResult, TestCaseReport};
pub use strategy::{strategy_for, GradingStrategy};
