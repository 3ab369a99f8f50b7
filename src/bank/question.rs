/// Question bank records
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder in code-completion templates replaced by the learner's fragment
pub const CODE_PLACEHOLDER: &str = "/* YOUR CODE HERE */";

/// Question discriminator - the `type` field of a bank entry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Predict the program's output
    #[default]
    #[serde(alias = "output_prediction")]
    CodeOutput,
    BugFinding,
    CodeCompletion,
    CodeWriting,
    MultipleChoice,
    MemoryTracing,
    StructSize,
    FillBlanks,
    DragDrop,
    RecursiveTrace,
    /// Any tag this build does not know; graded as output prediction
    #[serde(other)]
    Unrecognized,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::CodeOutput => "code_output",
            QuestionType::BugFinding => "bug_finding",
            QuestionType::CodeCompletion => "code_completion",
            QuestionType::CodeWriting => "code_writing",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::MemoryTracing => "memory_tracing",
            QuestionType::StructSize => "struct_size",
            QuestionType::FillBlanks => "fill_blanks",
            QuestionType::DragDrop => "drag_drop",
            QuestionType::RecursiveTrace => "recursive_trace",
            QuestionType::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (input, expected output) pair; recursive traces carry their answer in `correct_answer`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Value>,
    /// Call-by-call trace shown after grading
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<Value>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: Some(expected_output.into()),
            ..Default::default()
        }
    }

    /// Expected program output for execution-graded questions
    pub fn expected_output(&self) -> String {
        self.expected_output.clone().unwrap_or_default()
    }

    /// Canonical value of a recursive-trace case, falling back to `expected_output`
    pub fn trace_answer(&self) -> String {
        match &self.correct_answer {
            Some(value) => value_text(value),
            None => self.expected_output(),
        }
    }
}

/// One fill-in blank
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Blank {
    #[serde(default)]
    pub correct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// A sub-question of a fill-blanks question; blanks are keyed `blank_<id>_<index>`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BlankItem {
    #[serde(default = "default_item_id")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub blanks: Vec<Blank>,
}

fn default_item_id() -> Value {
    Value::from(0)
}

impl BlankItem {
    /// Submission key for blank `index` of this item
    pub fn blank_key(&self, index: usize) -> String {
        format!("blank_{}_{}", value_text(&self.id), index)
    }
}

/// Immutable bank entry
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
    /// Fill-blanks items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<BlankItem>,
    /// Drag-drop slots, keyed by slot id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blanks: BTreeMap<String, Blank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_layout: Option<Value>,
}

impl Question {
    /// Canonical answer rendered as text ("" when absent)
    pub fn correct_answer_text(&self) -> String {
        self.correct_answer
            .as_ref()
            .map(value_text)
            .unwrap_or_default()
    }

    /// First mandatory field missing for this question's type
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("missing 'id'".to_string());
        }

        let missing = match self.question_type {
            QuestionType::CodeOutput
            | QuestionType::Unrecognized
            | QuestionType::BugFinding
            | QuestionType::MultipleChoice
            | QuestionType::MemoryTracing
            | QuestionType::StructSize => self.correct_answer.is_none().then_some("correct_answer"),
            QuestionType::CodeCompletion => {
                if self.code_template.is_none() {
                    Some("code_template")
                } else if self.test_cases.is_empty() {
                    Some("test_cases")
                } else {
                    None
                }
            }
            QuestionType::CodeWriting | QuestionType::RecursiveTrace => {
                self.test_cases.is_empty().then_some("test_cases")
            }
            QuestionType::FillBlanks => {
                if self.questions.is_empty() {
                    Some("questions")
                } else if self.questions.iter().any(|item| item.blanks.is_empty()) {
                    Some("blanks")
                } else {
                    None
                }
            }
            QuestionType::DragDrop => {
                if self.code_template.is_none() {
                    Some("code_template")
                } else if self.blanks.is_empty() {
                    Some("blanks")
                } else {
                    None
                }
            }
        };

        match missing {
            Some(field) => Err(format!(
                "{} question '{}' is missing '{}'",
                self.question_type, self.id, field
            )),
            None => Ok(()),
        }
    }
}

/// Text form of a JSON value: strings verbatim, null empty, everything else as JSON
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
