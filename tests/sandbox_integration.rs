//! Integration tests for the C sandbox
//!
//! These compile and run real programs. Each test returns early when gcc is
//! not installed on the host.

use ctrainer::{CodeSandbox, ExecutionStage, FailureKind, SandboxLimits};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sandbox_in(root: &std::path::Path, limits: SandboxLimits) -> Option<CodeSandbox> {
    let sandbox = CodeSandbox::new(limits, root.to_path_buf());
    if sandbox.toolchain_version().is_none() {
        println!("gcc not available; skipping");
        return None;
    }
    Some(sandbox)
}

#[test]
fn test_trivial_program_exits_zero() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let outcome = sandbox.compile_and_run("int main(){return 0;}", "").unwrap();
    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.stage, ExecutionStage::Execution);
    assert_eq!(outcome.returncode, Some(0));
    assert!(outcome.stdout.is_empty());
}

#[test]
fn test_stdin_is_delivered() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let source = r#"
#include <stdio.h>
int main(void) {
    int a, b;
    if (scanf("%d %d", &a, &b) != 2) return 1;
    printf("%d\n", a * b);
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "6 7\n").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.stdout.trim(), "42");
}

#[test]
fn test_nonzero_exit_is_still_success() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let outcome = sandbox
        .compile_and_run("#include <stdio.h>\nint main(void){puts(\"bye\");return 3;}", "")
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.returncode, Some(3));
    assert_eq!(outcome.stdout, "bye\n");
}

#[test]
fn test_infinite_loop_times_out() {
    let root = tempfile::tempdir().unwrap();
    let limits = SandboxLimits {
        run_timeout_ms: 1_000,
        ..SandboxLimits::default()
    };
    let Some(sandbox) = sandbox_in(root.path(), limits) else {
        return;
    };

    let start = Instant::now();
    let outcome = sandbox
        .compile_and_run("int main(void){while(1);return 0;}", "")
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::RuntimeTimeout));
    assert_eq!(
        outcome.error.as_deref(),
        Some("Program timeout (exceeded 1 seconds)")
    );
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_missing_semicolon_fails_compilation() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let outcome = sandbox
        .compile_and_run("int main(void){return 0}", "")
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.stage, ExecutionStage::Compilation);
    assert_eq!(outcome.failure, Some(FailureKind::CompileError));
    assert!(!outcome.error.unwrap_or_default().trim().is_empty());
}

#[test]
fn test_warnings_kept_on_success() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let outcome = sandbox
        .compile_and_run("int main(void){int unused; return 0;}", "")
        .unwrap();
    assert!(outcome.success);
    assert!(outcome.warnings.unwrap_or_default().contains("unused"));
}

#[test]
fn test_segfault_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let source = "int main(void){ volatile int *p = 0; *p = 1; return 0; }";
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.stage, ExecutionStage::Execution);
    assert_eq!(outcome.signal, Some(libc::SIGSEGV));
    assert_eq!(outcome.failure, Some(FailureKind::RuntimeSignal));
}

fn tight_memory_sandbox(root: &std::path::Path) -> Option<CodeSandbox> {
    let limits = SandboxLimits {
        memory_limit_mb: 32,
        ..SandboxLimits::default()
    };
    sandbox_in(root, limits)
}

#[test]
fn test_heap_allocation_beyond_ceiling_is_memory_limit() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = tight_memory_sandbox(root.path()) else {
        return;
    };

    // Unchecked malloc: a refused allocation faults on the first write.
    let source = r#"
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
int main(void) {
    size_t n = 128u * 1024u * 1024u;
    char *p = malloc(n);
    memset(p, 1, n);
    puts("allocated");
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::MemoryLimitExceeded));
    assert!(outcome.error.unwrap_or_default().contains("32 MB"));
    assert_ne!(outcome.stdout.trim(), "allocated");
}

#[test]
fn test_stack_array_beyond_ceiling_is_memory_limit() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = tight_memory_sandbox(root.path()) else {
        return;
    };

    let source = r#"
#include <stdio.h>
#include <string.h>
int main(void) {
    volatile char big[64u * 1024u * 1024u];
    memset((char *)big, 1, sizeof big);
    printf("%d\n", big[sizeof big - 1]);
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::MemoryLimitExceeded));
}

#[test]
fn test_static_array_beyond_ceiling_is_memory_limit() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = tight_memory_sandbox(root.path()) else {
        return;
    };

    // The oversized bss cannot even be mapped at exec time.
    let source = r#"
#include <stdio.h>
#include <string.h>
static char big[128u * 1024u * 1024u];
int main(void) {
    memset(big, 1, sizeof big);
    printf("%d\n", big[sizeof big - 1]);
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::MemoryLimitExceeded));
}

#[test]
fn test_checked_allocation_failure_is_ordinary_output() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = tight_memory_sandbox(root.path()) else {
        return;
    };

    let source = r#"
#include <stdio.h>
#include <stdlib.h>
int main(void) {
    char *p = malloc(128u * 1024u * 1024u);
    puts(p ? "allocated" : "denied");
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.stdout.trim(), "denied");
}

fn live_process_mentions(needle: &str) -> bool {
    std::fs::read_dir("/proc")
        .unwrap()
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.bytes().all(|b| b.is_ascii_digit()))
        })
        .filter_map(|entry| std::fs::read(entry.path().join("cmdline")).ok())
        .any(|cmdline| String::from_utf8_lossy(&cmdline).contains(needle))
}

#[test]
fn test_detached_descendants_do_not_survive_timeout() {
    let root = tempfile::tempdir().unwrap();
    // No process limit, so the fork succeeds even for unprivileged users.
    let limits = SandboxLimits {
        run_timeout_ms: 1_000,
        process_limit: None,
        ..SandboxLimits::default()
    };
    let Some(sandbox) = sandbox_in(root.path(), limits) else {
        return;
    };

    let source = r#"
#include <unistd.h>
int main(void) {
    if (fork() == 0) {
        setsid();
        execl("/bin/sleep", "sleep", "61.37", (char *)0);
        _exit(1);
    }
    while (1);
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert_eq!(outcome.failure, Some(FailureKind::RuntimeTimeout));

    let deadline = Instant::now() + Duration::from_secs(2);
    while live_process_mentions("61.37") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert!(
        !live_process_mentions("61.37"),
        "a detached descendant outlived the run"
    );
}

#[test]
fn test_fork_refused_for_unprivileged_runs() {
    // RLIMIT_NPROC does not bind root.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let source = r#"
#include <stdio.h>
#include <unistd.h>
int main(void) {
    pid_t pid = fork();
    if (pid == 0) _exit(0);
    puts(pid < 0 ? "refused" : "forked");
    return 0;
}
"#;
    let outcome = sandbox.compile_and_run(source, "").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.stdout.trim(), "refused");
}

#[test]
fn test_syntax_check_never_runs() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };

    let report = sandbox.validate_syntax("int main(void){return 0;}").unwrap();
    assert!(report.valid);
    let report = sandbox.validate_syntax("int main(void){return 0}").unwrap();
    assert!(!report.valid);
    assert!(report.errors.is_some());
}

#[test]
fn test_concurrent_runs_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let Some(sandbox) = sandbox_in(root.path(), SandboxLimits::default()) else {
        return;
    };
    let sandbox = Arc::new(sandbox);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let sandbox = sandbox.clone();
            thread::spawn(move || {
                let source = format!(
                    "#include <stdio.h>\nint main(void){{printf(\"%d\\n\", {});return 0;}}",
                    i
                );
                let outcome = sandbox.compile_and_run(&source, "").unwrap();
                assert!(outcome.success);
                assert_eq!(outcome.stdout.trim(), i.to_string());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let leftovers = std::fs::read_dir(root.path()).unwrap().count();
    assert_eq!(leftovers, 0, "run directories must be released");
}
