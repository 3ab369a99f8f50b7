/// Execution-graded types: the submission is compiled and run against each test case
use crate::bank::question::{Question, TestCase, CODE_PLACEHOLDER};
use crate::config::types::{ExecutionOutcome, Result};
use crate::core::sandbox::CodeRunner;
use crate::grading::result::{GradingDetail, GradingResult, TestCaseReport};
use crate::grading::strategy::GradingStrategy;

pub const NO_TEST_CASES: &str = "This question has no test cases; it cannot be graded";

/// Fragment spliced into the template at `/* YOUR CODE HERE */`
pub struct CodeCompletion;

impl GradingStrategy for CodeCompletion {
    fn evaluate(&self, question: &Question, answer: &str, runner: &dyn CodeRunner) -> Result<GradingResult> {
        let template = question.code_template.as_deref().unwrap_or(CODE_PLACEHOLDER);
        let program = template.replace(CODE_PLACEHOLDER, answer);
        run_test_cases(question, &program, runner)
    }
}

/// Whole program, or a fragment when the question ships a template
pub struct CodeWriting;

impl GradingStrategy for CodeWriting {
    fn evaluate(&self, question: &Question, answer: &str, runner: &dyn CodeRunner) -> Result<GradingResult> {
        let program = match question.code_template.as_deref() {
            Some(template) if template.contains(CODE_PLACEHOLDER) => {
                template.replace(CODE_PLACEHOLDER, answer)
            }
            _ => answer.to_string(),
        };
        run_test_cases(question, &program, runner)
    }
}

/// Run `program` once per test case; every case must match on trimmed stdout
pub fn run_test_cases(
    question: &Question,
    program: &str,
    runner: &dyn CodeRunner,
) -> Result<GradingResult> {
    if question.test_cases.is_empty() {
        log::warn!("Question {} has no test cases", question.id);
        return Ok(GradingResult::simple(false, NO_TEST_CASES)
            .with_detail(GradingDetail::TestCases { results: Vec::new() }));
    }

    let mut results = Vec::with_capacity(question.test_cases.len());
    // The program is identical for every case, so a compile-stage failure repeats.
    let mut build_failure: Option<ExecutionOutcome> = None;

    for case in &question.test_cases {
        let outcome = match &build_failure {
            Some(outcome) => outcome.clone(),
            None => runner.compile_and_run(program, &case.input)?,
        };

        if outcome.failed_before_execution() && build_failure.is_none() {
            log::debug!(
                "Question {}: build failed ({:?}), remaining cases skipped",
                question.id,
                outcome.failure
            );
            build_failure = Some(outcome.clone());
        }

        results.push(report_case(case, &outcome));
    }

    let correct = results.iter().all(|r| r.passed);
    Ok(GradingResult::simple(correct, question.explanation.clone())
        .with_detail(GradingDetail::TestCases { results }))
}

fn report_case(case: &TestCase, outcome: &ExecutionOutcome) -> TestCaseReport {
    let expected = case.expected_output().trim().to_string();

    if !outcome.success {
        return TestCaseReport {
            input: case.input.clone(),
            expected,
            received: outcome.failure_message(),
            passed: false,
            failure: outcome.failure,
            trace: Vec::new(),
        };
    }

    let received = outcome.stdout.trim().to_string();
    TestCaseReport {
        input: case.input.clone(),
        passed: received == expected,
        expected,
        received,
        failure: None,
        trace: Vec::new(),
    }
}
