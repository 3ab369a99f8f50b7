/// Structured answer types: the submission is a flat JSON object
use crate::bank::question::Question;
use crate::config::types::Result;
use crate::core::sandbox::CodeRunner;
use crate::grading::normalize::{eq_ignore_case_trimmed, parse_answer_map};
use crate::grading::result::{BlankReport, GradingDetail, GradingResult, TestCaseReport};
use crate::grading::strategy::GradingStrategy;

/// `{"blank_<item>_<index>": text}`, each blank trimmed and case-insensitive
pub struct FillBlanks;

impl GradingStrategy for FillBlanks {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let submitted = parse_answer_map(answer);

        let results: Vec<BlankReport> = question
            .questions
            .iter()
            .flat_map(|item| {
                item.blanks.iter().enumerate().map(move |(index, blank)| (item.blank_key(index), blank))
            })
            .map(|(blank_id, blank)| {
                let user_answer = submitted.get(&blank_id).cloned().unwrap_or_default();
                BlankReport {
                    correct: eq_ignore_case_trimmed(&user_answer, &blank.correct),
                    correct_answer: blank.correct.clone(),
                    user_answer,
                    blank_id,
                }
            })
            .collect();

        let correct = !results.is_empty() && results.iter().all(|r| r.correct);
        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_detail(GradingDetail::Blanks { results }))
    }
}

/// `{slot: token}`, each slot compared exactly
pub struct DragDrop;

impl GradingStrategy for DragDrop {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let placements = parse_answer_map(answer);

        let results: Vec<BlankReport> = question
            .blanks
            .iter()
            .map(|(slot, blank)| {
                let user_answer = placements.get(slot).cloned().unwrap_or_default();
                BlankReport {
                    blank_id: slot.clone(),
                    correct: user_answer == blank.correct,
                    correct_answer: blank.correct.clone(),
                    user_answer,
                }
            })
            .collect();

        let correct = !results.is_empty() && results.iter().all(|r| r.correct);
        let expected = summarize(&results, |r| &r.correct_answer);
        let received = summarize(&results, |r| &r.user_answer);

        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_comparison(expected, received)
            .with_detail(GradingDetail::Assembly {
                correct_code: assemble_reference(question),
                results,
            }))
    }
}

/// Template with every `{slot}` replaced by its canonical token
pub fn assemble_reference(question: &Question) -> String {
    let template = question.code_template.clone().unwrap_or_default();
    question.blanks.iter().fold(template, |code, (slot, blank)| {
        code.replace(&format!("{{{}}}", slot), &blank.correct)
    })
}

fn summarize<F>(results: &[BlankReport], pick: F) -> String
where
    F: Fn(&BlankReport) -> &String,
{
    results
        .iter()
        .map(|r| format!("{}: {}", r.blank_id, pick(r)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `{"test_<index>": value}` against each case's canonical value
pub struct RecursiveTrace;

impl GradingStrategy for RecursiveTrace {
    fn evaluate(&self, question: &Question, answer: &str, _: &dyn CodeRunner) -> Result<GradingResult> {
        let submitted = parse_answer_map(answer);

        let results: Vec<TestCaseReport> = question
            .test_cases
            .iter()
            .enumerate()
            .map(|(index, case)| {
                let received = submitted
                    .get(&format!("test_{}", index))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
                let expected = case.trace_answer().trim().to_string();
                TestCaseReport {
                    input: case.input.clone(),
                    passed: received == expected,
                    expected,
                    received,
                    failure: None,
                    trace: case.trace.clone(),
                }
            })
            .collect();

        let correct = !results.is_empty() && results.iter().all(|r| r.passed);
        Ok(GradingResult::simple(correct, question.explanation.clone())
            .with_detail(GradingDetail::TestCases { results }))
    }
}
