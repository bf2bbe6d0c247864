use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// The filesystem-visible single-instance guarantee: a file at a well-known
/// path holding the owner's pid. A second live owner is a hard collision; a
/// dead owner marks the lock stale and reclaimable.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock or fail fast with `AlreadyRunning`. A retry here
    /// would let two instances double-dispatch commands, so collisions are
    /// fatal to the new instance by design of the caller.
    pub fn acquire(path: &Path) -> CoreResult<Self> {
        match read_owner_pid(path) {
            Some(owner_pid) if pid_alive(owner_pid) => {
                return Err(CoreError::AlreadyRunning {
                    lock_path: path.display().to_string(),
                    owner_pid,
                });
            }
            Some(owner_pid) => {
                tracing::warn!(
                    lock_path = %path.display(),
                    owner_pid,
                    "reclaiming stale instance lock"
                );
                let _ = std::fs::remove_file(path);
            }
            None if path.exists() => {
                tracing::warn!(
                    lock_path = %path.display(),
                    "replacing unreadable instance lock"
                );
                let _ = std::fs::remove_file(path);
            }
            None => {}
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|error| {
                if error.kind() == std::io::ErrorKind::AlreadyExists {
                    CoreError::AlreadyRunning {
                        lock_path: path.display().to_string(),
                        owner_pid: read_owner_pid(path).unwrap_or_default(),
                    }
                } else {
                    CoreError::Internal(format!(
                        "failed to create lock {}: {error}",
                        path.display()
                    ))
                }
            })?;
        write!(file, "{}", std::process::id()).map_err(|error| {
            CoreError::Internal(format!("failed to write lock {}: {error}", path.display()))
        })?;

        tracing::info!(lock_path = %path.display(), "instance lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file. Called only when the supervisor reaches
    /// `Stopped`; a crash leaves the file behind for stale reclamation.
    pub fn release(self) -> CoreResult<()> {
        std::fs::remove_file(&self.path).map_err(|error| {
            CoreError::Internal(format!(
                "failed to remove lock {}: {error}",
                self.path.display()
            ))
        })?;
        tracing::info!(lock_path = %self.path.display(), "instance lock released");
        Ok(())
    }
}

fn read_owner_pid(path: &Path) -> Option<u32> {
    let raw = std::fs::read_to_string(path).ok()?;
    raw.trim().parse().ok()
}

/// Liveness probe for the recorded owner. On Linux this checks procfs;
/// elsewhere an existing lock is conservatively treated as live.
pub(crate) fn pid_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    #[cfg(target_os = "linux")]
    {
        Path::new(&format!("/proc/{pid}")).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        true
    }
}
