/// Core types and structures for the ctrainer system
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage a sandbox invocation reached before it finished or failed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionStage {
    /// Source could not be persisted into the working area
    #[serde(rename = "write")]
    Write,
    /// Toolchain invocation (including toolchain discovery)
    #[serde(rename = "compilation")]
    Compilation,
    /// The compiled artifact was started
    #[serde(rename = "execution")]
    Execution,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStage::Write => write!(f, "write"),
            ExecutionStage::Compilation => write!(f, "compilation"),
            ExecutionStage::Execution => write!(f, "execution"),
        }
    }
}

/// Failure taxonomy for one sandbox invocation - closed set.
/// Every variant is reported as data, never as an `Err`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source file could not be written
    WriteFailed,
    /// Compiler executable not found
    ToolchainMissing,
    /// Compiler rejected the source
    CompileError,
    /// Compiler exceeded the compile deadline
    CompileTimeout,
    /// Program exceeded the wall-clock deadline and was killed
    RuntimeTimeout,
    /// Program died against the address-space ceiling
    MemoryLimitExceeded,
    /// Program was terminated by a fatal signal
    RuntimeSignal,
    /// Process could not be started for a reason other than a missing binary
    SpawnFailed,
}

impl FailureKind {
    /// Stage this failure belongs to
    pub fn stage(&self) -> ExecutionStage {
        match self {
            FailureKind::WriteFailed => ExecutionStage::Write,
            FailureKind::ToolchainMissing
            | FailureKind::CompileError
            | FailureKind::CompileTimeout => ExecutionStage::Compilation,
            FailureKind::RuntimeTimeout
            | FailureKind::MemoryLimitExceeded
            | FailureKind::RuntimeSignal
            | FailureKind::SpawnFailed => ExecutionStage::Execution,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::WriteFailed => "write_failed",
            FailureKind::ToolchainMissing => "toolchain_missing",
            FailureKind::CompileError => "compile_error",
            FailureKind::CompileTimeout => "compile_timeout",
            FailureKind::RuntimeTimeout => "runtime_timeout",
            FailureKind::MemoryLimitExceeded => "memory_limit_exceeded",
            FailureKind::RuntimeSignal => "runtime_signal",
            FailureKind::SpawnFailed => "spawn_failed",
        };
        f.write_str(name)
    }
}

/// Result of one sandboxed compile+run.
/// Serializes to the sandbox invocation contract:
/// `{success, stage, stdout, stderr, returncode, error?}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    /// True when the program was compiled and exited on its own
    pub success: bool,
    /// Stage reached
    pub stage: ExecutionStage,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code of the program, if it exited normally
    pub returncode: Option<i32>,
    /// Human-readable failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Compiler warnings from a successful compile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    /// Terminating signal, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    /// Wall time of the execution stage in milliseconds
    #[serde(default)]
    pub wall_time_ms: u64,
    /// Whether stdout or stderr hit the capture cap
    #[serde(default)]
    pub output_truncated: bool,
}

impl ExecutionOutcome {
    /// Build a failed outcome for `kind` with an explanatory message
    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            stage: kind.stage(),
            stdout: String::new(),
            stderr: String::new(),
            returncode: None,
            error: Some(error.into()),
            failure: Some(kind),
            warnings: None,
            signal: None,
            wall_time_ms: 0,
            output_truncated: false,
        }
    }

    /// True when the failure happened before the program could run
    pub fn failed_before_execution(&self) -> bool {
        !self.success && self.stage != ExecutionStage::Execution
    }

    /// Message shown to a learner in place of program output
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Compilation/Runtime error".to_string())
    }
}

/// Syntax-only check result
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SyntaxReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

/// Custom error types for ctrainer
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The ephemeral working area could not be created
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Progress store error: {0}")]
    Store(String),

    #[error("Process error: {0}")]
    Process(String),
}

impl From<nix::errno::Errno> for TrainerError {
    fn from(err: nix::errno::Errno) -> Self {
        TrainerError::Process(err.to_string())
    }
}

/// Result type alias for ctrainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;
