use crate::config::types::FailureKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict for one submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradingResult {
    pub correct: bool,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_layout: Option<Value>,
    #[serde(default)]
    pub detail: GradingDetail,
}

impl GradingResult {
    /// Verdict with no type-specific detail
    pub fn simple(correct: bool, explanation: impl Into<String>) -> Self {
        Self {
            correct,
            explanation: explanation.into(),
            expected: None,
            received: None,
            memory_layout: None,
            detail: GradingDetail::None,
        }
    }

    pub fn with_comparison(mut self, expected: impl Into<String>, received: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.received = Some(received.into());
        self
    }

    pub fn with_detail(mut self, detail: GradingDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Per-test-case reports, if this verdict carries any
    pub fn test_results(&self) -> Option<&[TestCaseReport]> {
        match &self.detail {
            GradingDetail::TestCases { results } => Some(results),
            _ => None,
        }
    }

    /// Per-blank reports, if this verdict carries any
    pub fn blank_results(&self) -> Option<&[BlankReport]> {
        match &self.detail {
            GradingDetail::Blanks { results } | GradingDetail::Assembly { results, .. } => {
                Some(results)
            }
            _ => None,
        }
    }
}

/// Type-specific part of a verdict
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingDetail {
    #[default]
    None,
    /// Bug-finding line numbers, both sorted ascending
    Lines {
        expected_lines: Vec<u64>,
        found_lines: Vec<u64>,
    },
    /// Execution-graded and recursive-trace cases, in question order
    TestCases { results: Vec<TestCaseReport> },
    /// Fill-blank comparisons
    Blanks { results: Vec<BlankReport> },
    /// Drag-drop slots plus the reference program with every slot filled in
    Assembly {
        results: Vec<BlankReport>,
        correct_code: String,
    },
}

/// One test case as graded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCaseReport {
    pub input: String,
    pub expected: String,
    pub received: String,
    pub passed: bool,
    /// Sandbox failure that replaced the program output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<Value>,
}

/// One blank or slot as graded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlankReport {
    pub blank_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub correct: bool,
}
