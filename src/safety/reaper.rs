/// Sweep of processes that left a run's process group.
///
/// Every launch carries a unique tag in its environment. Descendants inherit
/// it across fork, exec and setsid, so a tagged process outside the run's
/// group after the group kill is an escapee.
use crate::config::types::Result;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::fs;
use std::thread;
use std::time::Duration;

/// Environment variable holding the run tag
pub const RUN_TAG_VAR: &str = "CTRAINER_RUN_TAG";

const SWEEP_ROUNDS: usize = 5;
const SWEEP_PAUSE: Duration = Duration::from_millis(5);

/// Identity stamped on every process of one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTag(String);

impl RunTag {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Whether a NUL-separated `/proc/<pid>/environ` blob carries this tag
    pub fn matches_environ(&self, environ: &[u8]) -> bool {
        let entry = format!("{}={}", RUN_TAG_VAR, self.0);
        environ
            .split(|b| *b == 0)
            .any(|var| var == entry.as_bytes())
    }
}

impl Default for RunTag {
    fn default() -> Self {
        Self::new()
    }
}

/// Live processes carrying `tag`. Zombies expose an empty environment and never match.
pub fn tagged_processes(tag: &RunTag) -> Vec<u32> {
    let own = std::process::id();
    let entries = match fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot scan /proc for escaped processes: {}", e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok()?.parse::<u32>().ok())
        .filter(|pid| *pid != own)
        // Other users' environments are unreadable; they cannot carry our tag anyway.
        .filter(|pid| {
            fs::read(format!("/proc/{}/environ", pid))
                .map(|environ| tag.matches_environ(&environ))
                .unwrap_or(false)
        })
        .collect()
}

/// Process group of `pid` from `/proc/<pid>/stat`
pub fn process_group(pid: u32) -> Option<u32> {
    let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // comm may contain spaces and parentheses; fields resume after the last ')'
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(2)?.parse().ok()
}

/// Tagged processes that are no longer members of `group`
pub fn escaped_processes(tag: &RunTag, group: u32) -> Vec<u32> {
    tagged_processes(tag)
        .into_iter()
        .filter(|pid| matches!(process_group(*pid), Some(pgid) if pgid != group))
        .collect()
}

pub fn kill_process(pid: u32) -> Result<()> {
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)?;
    Ok(())
}

/// SIGKILL every escapee of `group` carrying `tag`, repeating while new ones show up.
/// Members of `group` are left to the group kill. Returns how many distinct processes were killed.
pub fn sweep_escaped(tag: &RunTag, group: u32) -> usize {
    let mut killed = HashSet::new();

    for _ in 0..SWEEP_ROUNDS {
        let found = escaped_processes(tag, group);
        if found.is_empty() {
            break;
        }
        for pid in found {
            match kill_process(pid) {
                Ok(()) => {
                    killed.insert(pid);
                }
                Err(e) => log::debug!("Escaped pid {} not killed: {}", pid, e),
            }
        }
        thread::sleep(SWEEP_PAUSE);
    }

    if !killed.is_empty() {
        log::warn!(
            "Killed {} process(es) that escaped run {}",
            killed.len(),
            tag.value()
        );
    }
    killed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::TrainerError;
    use std::os::unix::process::{CommandExt, ExitStatusExt};
    use std::process::Command;

    #[test]
    fn test_environ_matching_is_exact() {
        let tag = RunTag::new();
        let environ = format!("PATH=/bin\0{}={}\0LC_ALL=C\0", RUN_TAG_VAR, tag.value());
        assert!(tag.matches_environ(environ.as_bytes()));

        let other = RunTag::new();
        assert!(!other.matches_environ(environ.as_bytes()));

        let prefix = format!("{}={}x\0", RUN_TAG_VAR, tag.value());
        assert!(!tag.matches_environ(prefix.as_bytes()));
        assert!(!tag.matches_environ(b""));
    }

    #[test]
    fn test_sweep_kills_process_outside_group() {
        let tag = RunTag::new();
        // Inherits the test runner's group, so it sits outside a group led by itself.
        let mut child = Command::new("sleep")
            .arg("30")
            .env(RUN_TAG_VAR, tag.value())
            .spawn()
            .unwrap();

        assert_eq!(tagged_processes(&tag), vec![child.id()]);
        assert_eq!(sweep_escaped(&tag, child.id()), 1);

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
        assert!(tagged_processes(&tag).is_empty());
    }

    #[test]
    fn test_sweep_leaves_group_members() {
        let tag = RunTag::new();
        let mut child = Command::new("sleep")
            .arg("30")
            .env(RUN_TAG_VAR, tag.value())
            .process_group(0)
            .spawn()
            .unwrap();

        assert_eq!(process_group(child.id()), Some(child.id()));
        assert_eq!(sweep_escaped(&tag, child.id()), 0);

        kill_process(child.id()).unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_sweep_without_matches_is_noop() {
        assert_eq!(sweep_escaped(&RunTag::new(), std::process::id()), 0);
    }

    #[test]
    fn test_kill_missing_process_is_process_error() {
        // PIDs above pid_max (at most 2^22) never exist.
        let err = kill_process(i32::MAX as u32).unwrap_err();
        assert!(matches!(err, TrainerError::Process(_)));
    }
}
