/// Configuration loading from a JSON file plus environment overrides
use crate::config::types::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Upper bound for every deadline
pub const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Ceiling multiplier for the second run that tells memory crashes from plain crashes
pub const RELAXED_CEILING_FACTOR: u64 = 8;

/// Resource envelope for one sandbox invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxLimits {
    /// Compiler executable (resolved through PATH)
    pub compiler: String,
    /// Compile deadline in milliseconds
    pub compile_timeout_ms: u64,
    /// Execution wall-clock deadline in milliseconds
    pub run_timeout_ms: u64,
    /// Syntax-only check deadline in milliseconds
    pub syntax_timeout_ms: u64,
    /// Address-space ceiling for the compiled program (MB)
    pub memory_limit_mb: u64,
    /// Per-stream capture cap (bytes)
    pub output_limit_bytes: usize,
    /// RLIMIT_NPROC for the compiled program; 1 forbids fork for unprivileged users
    pub process_limit: Option<u64>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            compiler: "gcc".to_string(),
            compile_timeout_ms: 3_000,
            run_timeout_ms: 3_000,
            syntax_timeout_ms: 2_000,
            memory_limit_mb: 50,
            output_limit_bytes: 1024 * 1024,
            process_limit: Some(1),
        }
    }
}

impl SandboxLimits {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn syntax_timeout(&self) -> Duration {
        Duration::from_millis(self.syntax_timeout_ms)
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Ceiling for the diagnostic rerun of a crashed program
    pub fn relaxed_memory_limit_bytes(&self) -> u64 {
        self.memory_limit_bytes().saturating_mul(RELAXED_CEILING_FACTOR)
    }

    /// Same compile and run deadline, in whole seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.compile_timeout_ms = secs.saturating_mul(1000);
        self.run_timeout_ms = self.compile_timeout_ms;
        self
    }
}

/// Full config file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Sandbox resource envelope
    pub sandbox: SandboxLimits,
    /// Directory holding `<category>.json` question files
    pub questions_dir: PathBuf,
    /// Root under which run-scoped working directories are created
    pub work_dir: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxLimits::default(),
            questions_dir: PathBuf::from("questions"),
            work_dir: Self::runtime_root_dir(),
        }
    }
}

impl TrainerConfig {
    /// Runtime root directory scoped by effective UID.
    /// Prevents root and non-root runs from colliding on a shared temp dir.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("ctrainer-uid-{}", euid))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TrainerError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: TrainerConfig = serde_json::from_str(&content)
            .map_err(|e| TrainerError::Config(format!("Failed to parse config JSON: {}", e)))?;

        Ok(config)
    }

    /// Load from `path` when given (defaults otherwise), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MAX_CODE_EXECUTION_TIME`, `MAX_MEMORY_MB`, `QUESTIONS_DIR` and `TEMP_CODE_DIR`.
    /// The lookup is injected so tests don't touch process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MAX_CODE_EXECUTION_TIME") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                TrainerError::Config(format!("MAX_CODE_EXECUTION_TIME must be an integer, got '{}'", raw))
            })?;
            if secs.checked_mul(1000).is_none() {
                return Err(TrainerError::Config(format!(
                    "MAX_CODE_EXECUTION_TIME is out of range: {}",
                    secs
                )));
            }
            self.sandbox = self.sandbox.clone().with_timeout_secs(secs);
        }

        if let Some(raw) = lookup("MAX_MEMORY_MB") {
            self.sandbox.memory_limit_mb = raw.trim().parse().map_err(|_| {
                TrainerError::Config(format!("MAX_MEMORY_MB must be an integer, got '{}'", raw))
            })?;
        }

        if let Some(dir) = lookup("QUESTIONS_DIR") {
            self.questions_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("TEMP_CODE_DIR") {
            self.work_dir = PathBuf::from(dir);
        }

        self.validate()
    }

    /// Reject envelopes that would make every run fail
    pub fn validate(&self) -> Result<()> {
        if self.sandbox.compiler.trim().is_empty() {
            return Err(TrainerError::Config("compiler must not be empty".to_string()));
        }
        if self.sandbox.compile_timeout_ms == 0 || self.sandbox.run_timeout_ms == 0 {
            return Err(TrainerError::Config("timeouts must be positive".to_string()));
        }
        let deadlines = [
            self.sandbox.compile_timeout_ms,
            self.sandbox.run_timeout_ms,
            self.sandbox.syntax_timeout_ms,
        ];
        if deadlines.iter().any(|ms| *ms > MAX_TIMEOUT_MS) {
            return Err(TrainerError::Config(format!(
                "timeouts must not exceed {} ms",
                MAX_TIMEOUT_MS
            )));
        }
        if self.sandbox.memory_limit_mb == 0 {
            return Err(TrainerError::Config("memory limit must be positive".to_string()));
        }
        let relaxed = self
            .sandbox
            .memory_limit_mb
            .checked_mul(BYTES_PER_MB)
            .and_then(|bytes| bytes.checked_mul(RELAXED_CEILING_FACTOR));
        if relaxed.is_none() {
            return Err(TrainerError::Config(format!(
                "memory limit of {} MB is out of range",
                self.sandbox.memory_limit_mb
            )));
        }
        if self.sandbox.process_limit == Some(0) {
            return Err(TrainerError::Config("process limit must be positive".to_string()));
        }
        Ok(())
    }
}
