//! Question bank.
//!
//! Immutable question records and the repositories that serve them.

pub mod question;
pub mod repository;

/// Category files the file-backed bank reads
pub const BANK_CATEGORIES: [&str; 12] = [
    "memory_management",
    "integer_division",
    "strings",
    "structs",
    "pointers",
    "recursion",
    "control_flow",
    "file_io",
    "fill_blanks",
    "drag_drop",
    "recursive_trace",
    "programming_tasks",
];

pub use question::{Question, QuestionType, TestCase};
pub use repository::{FileQuestionRepository, QuestionRepository};
