/// Request and response shapes exchanged with the presentation layer
use crate::grading::result::{BlankReport, GradingDetail, GradingResult, TestCaseReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One submitted answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeRequest {
    pub question_id: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub hints_used: u32,
}

/// Verdict as shown to the learner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeResponse {
    pub correct: bool,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<Vec<TestCaseReport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_layout: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank_results: Option<Vec<BlankReport>>,
    /// Drag-drop reference program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_code: Option<String>,
}

impl From<GradingResult> for GradeResponse {
    fn from(result: GradingResult) -> Self {
        let mut response = GradeResponse {
            correct: result.correct,
            explanation: result.explanation,
            expected: result.expected,
            received: result.received,
            test_results: None,
            memory_layout: result.memory_layout,
            blank_results: None,
            correct_code: None,
        };

        match result.detail {
            GradingDetail::None => {}
            GradingDetail::Lines {
                expected_lines,
                found_lines,
            } => {
                response.expected = Some(join_lines(&expected_lines));
                response.received = Some(join_lines(&found_lines));
            }
            GradingDetail::TestCases { results } => response.test_results = Some(results),
            GradingDetail::Blanks { results } => response.blank_results = Some(results),
            GradingDetail::Assembly {
                results,
                correct_code,
            } => {
                // Slots are reported as test rows too.
                response.test_results = Some(results.iter().map(slot_row).collect());
                response.blank_results = Some(results);
                response.correct_code = Some(correct_code);
            }
        }

        response
    }
}

fn join_lines(lines: &[u64]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn slot_row(blank: &BlankReport) -> TestCaseReport {
    TestCaseReport {
        input: blank.blank_id.clone(),
        expected: blank.correct_answer.clone(),
        received: blank.user_answer.clone(),
        passed: blank.correct,
        failure: None,
        trace: Vec::new(),
    }
}

/// Ad-hoc compile-and-run request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub input: String,
}
