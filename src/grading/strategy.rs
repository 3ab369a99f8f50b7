use crate::bank::question::{Question, QuestionType};
use crate::config::types::Result;
use crate::core::sandbox::CodeRunner;
use crate::grading::execution::{CodeCompletion, CodeWriting};
use crate::grading::result::GradingResult;
use crate::grading::structured::{DragDrop, FillBlanks, RecursiveTrace};
use crate::grading::text::{BugFinding, MemoryTracing, MultipleChoice, OutputPrediction, StructSize};

/// Grading rule for one question type
pub trait GradingStrategy: Send + Sync {
    /// Grade `answer` against `question`.
    /// Strategies that execute code do so through `runner`; only working-area
    /// failures of the runner propagate as `Err`.
    fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        runner: &dyn CodeRunner,
    ) -> Result<GradingResult>;
}

/// Strategy for a question type. Unknown tags grade as output prediction.
pub fn strategy_for(question_type: QuestionType) -> &'static dyn GradingStrategy {
    match question_type {
        QuestionType::CodeOutput | QuestionType::Unrecognized => &OutputPrediction,
        QuestionType::BugFinding => &BugFinding,
        QuestionType::CodeCompletion => &CodeCompletion,
        QuestionType::CodeWriting => &CodeWriting,
        QuestionType::MultipleChoice => &MultipleChoice,
        QuestionType::MemoryTracing => &MemoryTracing,
        QuestionType::StructSize => &StructSize,
        QuestionType::FillBlanks => &FillBlanks,
        QuestionType::DragDrop => &DragDrop,
        QuestionType::RecursiveTrace => &RecursiveTrace,
    }
}
