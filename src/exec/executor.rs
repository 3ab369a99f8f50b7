/// Process execution with a wall-clock deadline and an address-space ceiling
use crate::safety::reaper::{self, RunTag, RUN_TAG_VAR};
use crate::utils::output::StreamCollector;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(2);
const COLLECTION_GRACE: Duration = Duration::from_secs(1);
const CPU_LIMIT_SLACK_SECS: u64 = 1;
const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// One process launch
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// argv; the first element is resolved through PATH
    pub command: Vec<String>,
    /// Working directory of the child
    pub workdir: PathBuf,
    /// Data piped to stdin, then closed
    pub stdin_data: String,
    /// Wall-clock deadline
    pub timeout: Duration,
    /// RLIMIT_AS in bytes; the stack may grow up to the same ceiling
    pub memory_limit: Option<u64>,
    /// RLIMIT_NPROC
    pub process_limit: Option<u64>,
    /// Per-stream capture cap
    pub output_limit: usize,
}

/// What happened to a launched process
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Deadline expired and the process group was killed
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub output_truncated: bool,
    pub wall_time: Duration,
    /// Descendants that left the process group and had to be killed separately
    pub escaped: usize,
}

impl ProcessReport {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Stateless launcher; every call is independent
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Launch `spec` and wait for it under its deadline.
    /// `Err` means the process never started (`ErrorKind::NotFound` for a missing binary).
    pub fn execute(&self, spec: &ProcessSpec) -> std::io::Result<ProcessReport> {
        let (program, args) = spec.command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Empty command provided")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&spec.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group so the deadline kill reaches every descendant.
            .process_group(0);

        cmd.env_clear();
        cmd.env("PATH", SANDBOX_PATH);
        cmd.env("LC_ALL", "C");
        cmd.env("TMPDIR", &spec.workdir);
        let tag = RunTag::new();
        cmd.env(RUN_TAG_VAR, tag.value());

        let memory_limit = spec.memory_limit;
        let process_limit = spec.process_limit;
        // CPU ceiling outlives us if we are interrupted before the deadline kill.
        let cpu_limit = spec.timeout.as_secs() + CPU_LIMIT_SLACK_SECS;
        unsafe {
            cmd.pre_exec(move || {
                // Limits are best-effort: a host that refuses them still runs the payload.
                if let Some(limit) = memory_limit {
                    let _ = setrlimit(Resource::RLIMIT_AS, limit, limit);
                    let _ = setrlimit(Resource::RLIMIT_STACK, limit, limit);
                }
                if let Some(limit) = process_limit {
                    let _ = setrlimit(Resource::RLIMIT_NPROC, limit, limit);
                }
                let _ = setrlimit(Resource::RLIMIT_CPU, cpu_limit, cpu_limit);
                let _ = setrlimit(Resource::RLIMIT_CORE, 0, 0);
                Ok(())
            });
        }

        let start = Instant::now();
        let mut child = cmd.spawn()?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .map(|s| StreamCollector::spawn(s, spec.output_limit));
        let stderr = child
            .stderr
            .take()
            .map(|s| StreamCollector::spawn(s, spec.output_limit));

        if let Some(mut stdin) = child.stdin.take() {
            let data = spec.stdin_data.clone();
            // The payload may never read stdin; a broken pipe here is not an error.
            thread::spawn(move || {
                let _ = stdin.write_all(data.as_bytes());
            });
        }

        let (status, timed_out) = wait_with_deadline(&mut child, pid, spec.timeout)?;
        let wall_time = start.elapsed();

        // Reap anything the payload forked into the background, then whatever left the group.
        kill_group(pid);
        let escaped = reaper::sweep_escaped(&tag, pid);

        let stdout = stdout.map(|c| c.finish(COLLECTION_GRACE)).unwrap_or_default();
        let stderr = stderr.map(|c| c.finish(COLLECTION_GRACE)).unwrap_or_default();

        Ok(ProcessReport {
            exit_code: if timed_out { None } else { status.code() },
            signal: if timed_out { Some(libc::SIGKILL) } else { status.signal() },
            timed_out,
            output_truncated: stdout.truncated || stderr.truncated,
            stdout: stdout.into_string(),
            stderr: stderr.into_string(),
            wall_time,
            escaped,
        })
    }
}

/// Poll the child until it exits or `timeout` elapses; on expiry the group is SIGKILLed and reaped
fn wait_with_deadline(
    child: &mut Child,
    pid: u32,
    timeout: Duration,
) -> std::io::Result<(ExitStatus, bool)> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }

        if Instant::now() >= deadline {
            log::debug!("Deadline of {:?} expired for pid {}, killing group", timeout, pid);
            kill_group(pid);
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_group(pid: u32) {
    // ESRCH just means the group is already gone.
    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
}
