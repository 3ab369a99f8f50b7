/// Free-text answer types: compared after normalisation, never executed
use crate::bank::question::Question;
use crate::config::types::Result;
use crate::core::sandbox::CodeRunner;
use crate::grading::normalize::{collapse_whitespace, eq_ignore_case_trimmed, extract_integers};
use crate::grading::result::{GradingDetail, GradingResult};
use crate::grading::strategy::GradingStrategy;

pub const INVALID_NUMBER: &str = "Please enter a valid number";

/// Predicted program output; whitespace runs are insignificant
pub struct OutputPrediction;

impl GradingStrategy for OutputPrediction {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let expected = question.correct_answer_text();
        let correct = collapse_whitespace(&expected) == collapse_whitespace(answer);

        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_comparison(expected.trim(), answer.trim()))
    }
}

/// Line numbers of the bugs, as a set of integers found anywhere in the answer
pub struct BugFinding;

impl GradingStrategy for BugFinding {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let expected = extract_integers(&question.correct_answer_text());
        let found = extract_integers(answer);

        Ok(GradingResult::simple(expected == found, question.explanation.clone()).with_detail(
            GradingDetail::Lines {
                expected_lines: expected.into_iter().collect(),
                found_lines: found.into_iter().collect(),
            },
        ))
    }
}

/// Option letter or text, trimmed and case-insensitive
pub struct MultipleChoice;

impl GradingStrategy for MultipleChoice {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let expected = question.correct_answer_text();
        let correct = eq_ignore_case_trimmed(&expected, answer);

        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_comparison(expected, answer))
    }
}

/// Allocation trace; plain text comparison
pub struct MemoryTracing;

impl GradingStrategy for MemoryTracing {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let expected = question.correct_answer_text();
        let correct = eq_ignore_case_trimmed(&expected, answer);

        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_comparison(expected, answer.trim()))
    }
}

/// `sizeof` of a struct, as an integer
pub struct StructSize;

impl GradingStrategy for StructSize {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let expected_text = question.correct_answer_text();

        let mut result = match answer.trim().parse::<i64>() {
            Ok(submitted) => {
                let correct = expected_text.trim().parse::<i64>() == Ok(submitted);
                GradingResult::simple(correct, question.explanation.clone())
                    .with_comparison(expected_text.trim(), submitted.to_string())
            }
            Err(_) => GradingResult::simple(false, INVALID_NUMBER).with_comparison(expected_text, answer),
        };

        result.memory_layout = question.memory_layout.clone();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ExecutionOutcome;
    use serde_json::json;

    struct NoRunner;

    impl CodeRunner for NoRunner {
        fn compile_and_run(&self, _: &str, _: &str) -> Result<ExecutionOutcome> {
            panic!("text strategies never execute code");
        }
    }

    fn question(value: serde_json::Value) -> Question {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_output_prediction_collapses_whitespace() {
        let q = question(json!({"id": "o1", "correct_answer": "1 2\n3", "explanation": "loop"}));
        let result = OutputPrediction.evaluate(&q, "  1  2 3 \n", &NoRunner).unwrap();
        assert!(result.correct);
        assert_eq!(result.expected.as_deref(), Some("1 2\n3"));
        assert_eq!(result.received.as_deref(), Some("1  2 3"));
        assert_eq!(result.explanation, "loop");

        let result = OutputPrediction.evaluate(&q, "123", &NoRunner).unwrap();
        assert!(!result.correct);
    }

    #[test]
    fn test_bug_finding_sets() {
        let q = question(json!({"id": "b1", "type": "bug_finding", "correct_answer": [12, 4]}));
        let result = BugFinding.evaluate(&q, "line 4 and line 12 (also 4)", &NoRunner).unwrap();
        assert!(result.correct);
        assert_eq!(
            result.detail,
            GradingDetail::Lines {
                expected_lines: vec![4, 12],
                found_lines: vec![4, 12]
            }
        );

        let result = BugFinding.evaluate(&q, "line 4", &NoRunner).unwrap();
        assert!(!result.correct);
    }

    #[test]
    fn test_multiple_choice_case_and_trim() {
        let q = question(json!({"id": "m1", "type": "multiple_choice", "correct_answer": "B"}));
        assert!(MultipleChoice.evaluate(&q, "  b ", &NoRunner).unwrap().correct);
        assert!(!MultipleChoice.evaluate(&q, "c", &NoRunner).unwrap().correct);
    }

    #[test]
    fn test_memory_tracing_is_text() {
        let q = question(json!({"id": "t1", "type": "memory_tracing", "correct_answer": "2 malloc, 1 free"}));
        assert!(MemoryTracing.evaluate(&q, "2 MALLOC, 1 FREE", &NoRunner).unwrap().correct);
        assert!(!MemoryTracing.evaluate(&q, "2 malloc 1 free", &NoRunner).unwrap().correct);
    }

    #[test]
    fn test_struct_size() {
        let q = question(json!({
            "id": "s1", "type": "struct_size", "correct_answer": 16,
            "memory_layout": {"a": "0-3"}, "explanation": "padding"
        }));

        let result = StructSize.evaluate(&q, " 16 ", &NoRunner).unwrap();
        assert!(result.correct);
        assert_eq!(result.memory_layout, Some(json!({"a": "0-3"})));

        let result = StructSize.evaluate(&q, "sixteen", &NoRunner).unwrap();
        assert!(!result.correct);
        assert_eq!(result.explanation, INVALID_NUMBER);
        assert!(result.memory_layout.is_some());

        assert!(!StructSize.evaluate(&q, "12", &NoRunner).unwrap().correct);
    }
}
