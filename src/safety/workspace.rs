/// Run-scoped working directories for sandbox invocations.
/// Each invocation owns one directory; it is removed when the `Workspace` drops,
/// whichever path (success, compile failure, timeout kill, panic) left the scope.

use crate::config::types::{Result, TrainerError};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

const SOURCE_FILE: &str = "code.c";
const BINARY_FILE: &str = "program";

/// Exclusively-owned working area for one run
#[derive(Debug)]
pub struct Workspace {
    /// Unique run ID
    run_id: String,
    /// Run-specific directory
    run_dir: PathBuf,
    /// Set once `cleanup` succeeded
    released: bool,
}

impl Workspace {
    /// Create a fresh workspace under `base_dir`.
    /// This is the only sandbox failure that escalates as an error.
    pub fn new(base_dir: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let run_dir = base_dir.join(format!("run-{}", run_id));

        fs::create_dir_all(&run_dir).map_err(|e| {
            TrainerError::Workspace(format!(
                "Failed to create workspace directory {}: {}",
                run_dir.display(),
                e
            ))
        })?;

        log::debug!("Created workspace {}", run_dir.display());

        Ok(Self {
            run_id,
            run_dir,
            released: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Path the source is written to
    pub fn source_path(&self) -> PathBuf {
        self.run_dir.join(SOURCE_FILE)
    }

    /// Path the compiled artifact is written to
    pub fn binary_path(&self) -> PathBuf {
        self.run_dir.join(BINARY_FILE)
    }

    /// Persist C source into the workspace.
    /// Write failures are returned raw so the caller can report them as a `write` stage outcome.
    pub fn write_source(&self, source: &str) -> std::io::Result<PathBuf> {
        let path = self.source_path();
        fs::write(&path, source.as_bytes())?;
        Ok(path)
    }

    /// Remove the workspace (idempotent)
    pub fn cleanup(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }

        if self.run_dir.exists() {
            fs::remove_dir_all(&self.run_dir).map_err(|e| {
                TrainerError::Workspace(format!(
                    "Failed to remove workspace {}: {}",
                    self.run_dir.display(),
                    e
                ))
            })?;
        }

        self.released = true;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("{}", e);
        }
    }
}

/// Owner of the workspace root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create new workspace for a run
    pub fn create_workspace(&self) -> Result<Workspace> {
        Workspace::new(&self.base_dir)
    }

    /// Remove run directories older than `max_age`.
    /// Only needed after a hard crash of the host process, since drops cover every other exit.
    pub fn cleanup_stale_workspaces(&self, max_age: Duration) -> Result<usize> {
        if !self.base_dir.exists() {
            return Ok(0);
        }

        let now = SystemTime::now();
        let mut cleaned = 0;

        for entry in fs::read_dir(&self.base_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let is_run_dir = path.is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .map_or(false, |name| name.starts_with("run-"));
            if !is_run_dir {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            match age {
                Some(age) if age >= max_age => {
                    log::info!("Cleaning up stale workspace: {}", path.display());
                    match fs::remove_dir_all(&path) {
                        Ok(()) => cleaned += 1,
                        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
                    }
                }
                _ => {}
            }
        }

        Ok(cleaned)
    }
}
