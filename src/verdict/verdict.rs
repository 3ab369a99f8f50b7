/// Outcome classification for compile and run stages.
/// Pure functions: outcome = f(process report, relaxed rerun, limits).
use crate::config::config::SandboxLimits;
use crate::config::types::{ExecutionOutcome, ExecutionStage, FailureKind};
use crate::exec::executor::ProcessReport;
use nix::sys::signal::Signal;
use std::io::ErrorKind;
use std::time::Duration;

/// Compile stage decision
#[derive(Debug, Clone, PartialEq)]
pub enum CompileVerdict {
    /// Artifact produced; compiler diagnostics kept as warnings
    Passed { warnings: Option<String> },
    /// Nothing may run
    Failed(ExecutionOutcome),
}

/// Verdict classifier - pure functions over process reports
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Classify a compiler process that could not be started
    pub fn classify_compiler_spawn_error(compiler: &str, err: &std::io::Error) -> ExecutionOutcome {
        let message = if err.kind() == ErrorKind::NotFound {
            format!("{} compiler not found. Please install {}.", compiler, compiler)
        } else {
            format!("Failed to start {} compiler: {}", compiler, err)
        };
        ExecutionOutcome::failed(FailureKind::ToolchainMissing, message)
    }

    /// Classify a finished compiler process
    pub fn classify_compile(report: &ProcessReport) -> CompileVerdict {
        if report.timed_out {
            return CompileVerdict::Failed(ExecutionOutcome::failed(
                FailureKind::CompileTimeout,
                "Compilation timeout (code too complex)",
            ));
        }

        if report.exit_code == Some(0) {
            let warnings = non_empty(&report.stderr);
            return CompileVerdict::Passed { warnings };
        }

        let error = match (non_empty(&report.stderr), report.exit_code, report.signal) {
            (Some(diagnostics), _, _) => diagnostics,
            (None, Some(code), _) => format!("Compilation failed with exit code {}", code),
            (None, None, Some(sig)) => format!("Compiler terminated by {}", signal_name(sig)),
            (None, None, None) => "Compilation failed".to_string(),
        };

        let mut outcome = ExecutionOutcome::failed(FailureKind::CompileError, error);
        outcome.stdout = report.stdout.clone();
        outcome.stderr = report.stderr.clone();
        outcome.returncode = report.exit_code;
        CompileVerdict::Failed(outcome)
    }

    /// Classify an artifact that could not be started
    pub fn classify_run_spawn_error(err: &std::io::Error) -> ExecutionOutcome {
        ExecutionOutcome::failed(
            FailureKind::SpawnFailed,
            format!("Runtime error: failed to start program: {}", err),
        )
    }

    /// Crashes that RLIMIT_AS can cause: a refused mmap/brk surfaces as a fault or abort.
    /// These are worth a rerun under `SandboxLimits::relaxed_memory_limit_bytes`.
    pub fn needs_ceiling_check(report: &ProcessReport) -> bool {
        !report.timed_out && report.signal.map_or(false, is_allocation_crash)
    }

    /// Classify a finished (or killed) program.
    /// `relaxed` is the same program rerun under the relaxed ceiling, when one was made.
    pub fn classify_run(
        report: &ProcessReport,
        relaxed: Option<&ProcessReport>,
        limits: &SandboxLimits,
        warnings: Option<String>,
    ) -> ExecutionOutcome {
        let wall_time_ms = report.wall_time.as_millis() as u64;

        if report.timed_out {
            // Partial output of a killed program is not reported.
            let mut outcome = ExecutionOutcome::failed(
                FailureKind::RuntimeTimeout,
                format!(
                    "Program timeout (exceeded {} seconds)",
                    format_secs(limits.run_timeout())
                ),
            );
            outcome.signal = report.signal;
            outcome.wall_time_ms = wall_time_ms;
            outcome.warnings = warnings;
            return outcome;
        }

        let base = ExecutionOutcome {
            success: true,
            stage: ExecutionStage::Execution,
            stdout: report.stdout.clone(),
            stderr: report.stderr.clone(),
            returncode: report.exit_code,
            error: None,
            failure: None,
            warnings,
            signal: report.signal,
            wall_time_ms,
            output_truncated: report.output_truncated,
        };

        match report.signal {
            None => base,
            Some(sig) if Self::points_at_memory_ceiling(sig, relaxed) => ExecutionOutcome {
                success: false,
                error: Some(format!(
                    "Runtime error: memory limit exceeded ({} MB, terminated by {})",
                    limits.memory_limit_mb,
                    signal_name(sig)
                )),
                failure: Some(FailureKind::MemoryLimitExceeded),
                ..base
            },
            Some(sig) => ExecutionOutcome {
                success: false,
                error: Some(format!("Runtime error: program terminated by {}", signal_name(sig))),
                failure: Some(FailureKind::RuntimeSignal),
                ..base
            },
        }
    }

    /// A SIGKILL the sandbox did not send (the kernel OOM killer), or a crash
    /// that goes away once the ceiling is relaxed
    fn points_at_memory_ceiling(sig: i32, relaxed: Option<&ProcessReport>) -> bool {
        if sig == libc::SIGKILL {
            return true;
        }
        is_allocation_crash(sig)
            && relaxed.map_or(false, |rerun| !rerun.timed_out && rerun.signal.is_none())
    }
}

fn is_allocation_crash(sig: i32) -> bool {
    matches!(sig, libc::SIGSEGV | libc::SIGBUS | libc::SIGABRT)
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// "SIGSEGV (11)" style rendering
pub fn signal_name(sig: i32) -> String {
    match Signal::try_from(sig) {
        Ok(signal) => format!("signal {} ({})", sig, signal.as_str()),
        Err(_) => format!("signal {}", sig),
    }
}

/// Whole seconds when exact, one decimal otherwise
fn format_secs(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.1}", duration.as_secs_f64())
    }
}
