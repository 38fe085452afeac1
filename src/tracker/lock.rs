use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::util::now_utc_string;

#[derive(Debug, Serialize, Deserialize)]
struct LockOwner {
    pid: u32,
    acquired_at: String,
}

/// Single-writer guard for one output target's run log. The lock file is
/// removed when the guard drops.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    /// A lock left behind by a process that is no longer running is removed
    /// and taken over.
    pub fn acquire(path: &Path) -> Result<Self> {
        match Self::try_create(path)? {
            Some(lock) => Ok(lock),
            None => {
                let Some(owner) = read_owner(path) else {
                    bail!(
                        "output target is locked by another writer (remove {} if no run is active)",
                        path.display()
                    );
                };
                if pid_is_alive(owner.pid) {
                    bail!(
                        "output target is locked by another writer (pid {}, since {}; remove {} if no run is active)",
                        owner.pid,
                        owner.acquired_at,
                        path.display()
                    );
                }

                warn!(
                    path = %path.display(),
                    pid = owner.pid,
                    acquired_at = %owner.acquired_at,
                    "removing stale output lock"
                );
                fs::remove_file(path)
                    .with_context(|| format!("failed to remove stale lock {}", path.display()))?;
                match Self::try_create(path)? {
                    Some(lock) => Ok(lock),
                    None => bail!(
                        "output target is locked by another writer (remove {} if no run is active)",
                        path.display()
                    ),
                }
            }
        }
    }

    fn try_create(path: &Path) -> Result<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let owner = LockOwner {
                    pid: std::process::id(),
                    acquired_at: now_utc_string(),
                };
                if let Ok(payload) = serde_json::to_vec(&owner) {
                    let _ = file.write_all(&payload);
                    let _ = file.sync_all();
                }
                debug!(path = %path.display(), "acquired output lock");
                Ok(Some(Self {
                    path: path.to_path_buf(),
                }))
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to create lock {}", path.display()))
            }
        }
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_owner(path: &Path) -> Option<LockOwner> {
    let raw = fs::read(path).ok()?;
    serde_json::from_slice(&raw).ok()
}

#[cfg(unix)]
fn pid_is_alive(pid: u32) -> bool {
    use std::process::{Command, Stdio};

    if pid == std::process::id() {
        return true;
    }
    match Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}
