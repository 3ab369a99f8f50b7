//! Outcome classification
//!
//! Derives sandbox outcomes as pure functions over process reports.

pub mod verdict;
