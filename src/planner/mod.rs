//! Adaptive practice planning.
//!
//! Per-category accuracy comes from a `ProgressStore`; sessions lean 70/30
//! toward the learner's weakest categories and never repeat a question.

pub mod progress;
pub mod session;

pub use progress::{
    practice_stats, practice_streak, AttemptRecord, CategoryBreakdown, CategoryScore, DayTrend,
    MemoryProgressStore, PracticeStats, ProgressStore,
};
pub use session::{AdaptiveSessionPlanner, ProgressSummary, SessionPlan, CORE_CATEGORIES};
