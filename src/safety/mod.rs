//! Safety and cleanup
//!
//! Run-scoped working directories that are always released, and the sweep
//! of processes that escaped a run's process group.

pub mod reaper;
pub mod workspace;
