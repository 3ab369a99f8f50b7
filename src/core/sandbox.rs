use crate::config::config::{SandboxLimits, TrainerConfig};
use crate::config::types::{ExecutionOutcome, FailureKind, Result, SyntaxReport};
use crate::exec::executor::{ProcessExecutor, ProcessReport, ProcessSpec};
use crate::judge::adapter::JudgeAdapter;
use crate::judge::languages::c::GccAdapter;
use crate::safety::workspace::{Workspace, WorkspaceManager};
use crate::verdict::verdict::{CompileVerdict, VerdictClassifier};
use std::path::PathBuf;
use std::time::Duration;

/// Anything that can compile and run one C program.
/// The grading engine depends on this seam rather than on `CodeSandbox` directly.
pub trait CodeRunner: Send + Sync {
    /// Compile `source` and run it with `stdin`.
    /// Only a failure to create the working area is an `Err`.
    fn compile_and_run(&self, source: &str, stdin: &str) -> Result<ExecutionOutcome>;
}

/// Compiles and executes untrusted C source under time and memory ceilings.
/// Holds no mutable state; calls may run concurrently from any thread.
pub struct CodeSandbox {
    limits: SandboxLimits,
    workspaces: WorkspaceManager,
    adapter: Box<dyn JudgeAdapter>,
    executor: ProcessExecutor,
}

impl CodeSandbox {
    pub fn new(limits: SandboxLimits, work_root: PathBuf) -> Self {
        let adapter = Box::new(GccAdapter::new(limits.compiler.clone()));
        Self::with_adapter(limits, work_root, adapter)
    }

    pub fn from_config(config: &TrainerConfig) -> Self {
        Self::new(config.sandbox.clone(), config.work_dir.clone())
    }

    pub fn with_adapter(
        limits: SandboxLimits,
        work_root: PathBuf,
        adapter: Box<dyn JudgeAdapter>,
    ) -> Self {
        Self {
            limits,
            workspaces: WorkspaceManager::new(work_root),
            adapter,
            executor: ProcessExecutor::new(),
        }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Write, compile, run. Compile always completes before run; a failed compile never runs.
    pub fn compile_and_run(&self, source: &str, stdin: &str) -> Result<ExecutionOutcome> {
        let workspace = self.workspaces.create_workspace()?;

        let source_path = match workspace.write_source(source) {
            Ok(path) => path,
            Err(e) => {
                return Ok(ExecutionOutcome::failed(
                    FailureKind::WriteFailed,
                    format!("Failed to write code: {}", e),
                ))
            }
        };

        let binary_path = workspace.binary_path();
        let compile = self.spec(
            &workspace,
            self.adapter.compile_command(&source_path, &binary_path),
            "",
            self.limits.compile_timeout(),
            None,
        );

        let warnings = match self.executor.execute(&compile) {
            Err(e) => {
                log::warn!("Compiler could not be started: {}", e);
                return Ok(VerdictClassifier::classify_compiler_spawn_error(
                    self.adapter.compiler(),
                    &e,
                ));
            }
            Ok(report) => match VerdictClassifier::classify_compile(&report) {
                CompileVerdict::Failed(outcome) => {
                    log::debug!(
                        "Run {} stopped at compilation: {:?}",
                        workspace.run_id(),
                        outcome.failure
                    );
                    return Ok(outcome);
                }
                CompileVerdict::Passed { warnings } => warnings,
            },
        };

        // gcc forks its passes, so the process limit only applies to the artifact.
        let run = ProcessSpec {
            process_limit: self.limits.process_limit,
            ..self.spec(
                &workspace,
                self.adapter.run_command(&binary_path),
                stdin,
                self.limits.run_timeout(),
                Some(self.limits.memory_limit_bytes()),
            )
        };

        let outcome = match self.executor.execute(&run) {
            Ok(report) => {
                let relaxed = if VerdictClassifier::needs_ceiling_check(&report) {
                    self.rerun_with_relaxed_ceiling(&workspace, &run)
                } else {
                    None
                };
                VerdictClassifier::classify_run(&report, relaxed.as_ref(), &self.limits, warnings)
            }
            Err(e) => VerdictClassifier::classify_run_spawn_error(&e),
        };

        log::debug!(
            "Run {} finished: success={} failure={:?} wall={}ms",
            workspace.run_id(),
            outcome.success,
            outcome.failure,
            outcome.wall_time_ms
        );

        Ok(outcome)
    }

    /// Syntax-only check; never produces or runs an artifact
    pub fn validate_syntax(&self, source: &str) -> Result<SyntaxReport> {
        let workspace = self.workspaces.create_workspace()?;

        let source_path = match workspace.write_source(source) {
            Ok(path) => path,
            Err(e) => {
                return Ok(SyntaxReport {
                    valid: false,
                    errors: Some(format!("Failed to write code: {}", e)),
                    warnings: None,
                })
            }
        };

        let spec = self.spec(
            &workspace,
            self.adapter.syntax_command(&source_path),
            "",
            self.limits.syntax_timeout(),
            None,
        );

        let report = match self.executor.execute(&spec) {
            Ok(report) => report,
            Err(e) => {
                let outcome =
                    VerdictClassifier::classify_compiler_spawn_error(self.adapter.compiler(), &e);
                return Ok(SyntaxReport {
                    valid: false,
                    errors: outcome.error,
                    warnings: None,
                });
            }
        };

        if report.timed_out {
            return Ok(SyntaxReport {
                valid: false,
                errors: Some("Syntax check timeout".to_string()),
                warnings: None,
            });
        }

        let diagnostics = Some(report.stderr.clone()).filter(|s| !s.trim().is_empty());
        Ok(if report.exit_code == Some(0) {
            SyntaxReport {
                valid: true,
                errors: None,
                warnings: diagnostics,
            }
        } else {
            SyntaxReport {
                valid: false,
                errors: diagnostics.or_else(|| Some("Syntax check failed".to_string())),
                warnings: None,
            }
        })
    }

    /// First line of `<compiler> --version`, or `None` if the toolchain is unavailable
    pub fn toolchain_version(&self) -> Option<String> {
        let spec = ProcessSpec {
            command: self.adapter.version_command(),
            workdir: std::env::temp_dir(),
            stdin_data: String::new(),
            timeout: self.limits.syntax_timeout(),
            memory_limit: None,
            process_limit: None,
            output_limit: 4096,
        };

        match self.executor.execute(&spec) {
            Ok(report) if report.exited_cleanly() => {
                report.stdout.lines().next().map(|l| l.trim().to_string())
            }
            Ok(report) => {
                log::warn!("{} --version exited with {:?}", self.adapter.compiler(), report.exit_code);
                None
            }
            Err(e) => {
                log::warn!("{} unavailable: {}", self.adapter.compiler(), e);
                None
            }
        }
    }

    fn spec(
        &self,
        workspace: &Workspace,
        command: Vec<String>,
        stdin: &str,
        timeout: Duration,
        memory_limit: Option<u64>,
    ) -> ProcessSpec {
        ProcessSpec {
            command,
            workdir: workspace.run_dir().to_path_buf(),
            stdin_data: stdin.to_string(),
            timeout,
            memory_limit,
            process_limit: None,
            output_limit: self.limits.output_limit_bytes,
        }
    }

    /// Same run with the address-space ceiling raised; only its exit status is used
    fn rerun_with_relaxed_ceiling(
        &self,
        workspace: &Workspace,
        run: &ProcessSpec,
    ) -> Option<ProcessReport> {
        let relaxed = ProcessSpec {
            memory_limit: Some(self.limits.relaxed_memory_limit_bytes()),
            ..run.clone()
        };

        match self.executor.execute(&relaxed) {
            Ok(report) => {
                log::debug!(
                    "Run {} under relaxed ceiling: signal={:?} timed_out={}",
                    workspace.run_id(),
                    report.signal,
                    report.timed_out
                );
                Some(report)
            }
            Err(e) => {
                log::debug!("Run {} relaxed rerun failed to start: {}", workspace.run_id(), e);
                None
            }
        }
    }
}

impl CodeRunner for CodeSandbox {
    fn compile_and_run(&self, source: &str, stdin: &str) -> Result<ExecutionOutcome> {
        CodeSandbox::compile_and_run(self, source, stdin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ExecutionStage, TrainerError};

    fn sandbox_with_compiler(compiler: &str, root: &std::path::Path) -> CodeSandbox {
        let limits = SandboxLimits {
            compiler: compiler.to_string(),
            ..SandboxLimits::default()
        };
        CodeSandbox::new(limits, root.to_path_buf())
    }

    #[test]
    fn test_missing_toolchain_outcome() {
        let root = tempfile::tempdir().unwrap();
        let sandbox = sandbox_with_compiler("ctrainer-missing-cc", root.path());

        let outcome = sandbox.compile_and_run("int main(void){return 0;}", "").unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.stage, ExecutionStage::Compilation);
        assert_eq!(outcome.failure, Some(FailureKind::ToolchainMissing));

        let report = sandbox.validate_syntax("int main(void){return 0;}").unwrap();
        assert!(!report.valid);
        assert!(sandbox.toolchain_version().is_none());
    }

    #[test]
    fn test_workspace_released_after_failure() {
        let root = tempfile::tempdir().unwrap();
        let sandbox = sandbox_with_compiler("ctrainer-missing-cc", root.path());
        sandbox.compile_and_run("int main(void){return 0;}", "").unwrap();

        let leftovers = std::fs::read_dir(root.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_unusable_work_root_escalates() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let sandbox = sandbox_with_compiler("gcc", &file);

        let err = sandbox.compile_and_run("int main(void){return 0;}", "").unwrap_err();
        assert!(matches!(err, TrainerError::Workspace(_)));
    }
}
