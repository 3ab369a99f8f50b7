use crate::bank::question::Question;
use crate::config::types::Result;
use crate::core::sandbox::CodeRunner;
use crate::grading::result::GradingResult;
use crate::grading::strategy::strategy_for;
use std::sync::Arc;

/// Grades submissions for every question type.
/// Stateless apart from the shared runner; identical inputs give identical verdicts.
#[derive(Clone)]
pub struct GradingEngine {
    runner: Arc<dyn CodeRunner>,
}

impl GradingEngine {
    pub fn new(runner: Arc<dyn CodeRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &dyn CodeRunner {
        self.runner.as_ref()
    }

    /// Grade `answer` for `question`
    pub fn grade(&self, question: &Question, answer: &str) -> Result<GradingResult> {
        log::debug!(
            "Grading question {} ({}), {} byte answer",
            question.id,
            question.question_type,
            answer.len()
        );

        let result = strategy_for(question.question_type).evaluate(question, answer, self.runner())?;

        log::info!("Question {} graded: correct={}", question.id, result.correct);
        Ok(result)
    }
}
