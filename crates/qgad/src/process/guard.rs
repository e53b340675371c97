use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Owns the pidfile for the lifetime of the agent.
///
/// Acquisition refuses to proceed while the recorded process is alive and
/// clears pidfiles left behind by dead agents. The file is removed on drop
/// once a pid has been written.
#[derive(Debug)]
pub(super) struct PidFileGuard {
    path: PathBuf,
    written: bool,
}

impl PidFileGuard {
    pub(super) fn acquire(path: &Path) -> Result<Self, LaunchError> {
        if let Some(pid) = read_pid(path)
            && pid != 0
        {
            if check_process(pid)? {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    file = %path.display(),
                    "refusing to start: existing agent alive"
                );
                return Err(LaunchError::AlreadyRunning { pid });
            }
            warn!(
                target: PROCESS_TARGET,
                pid,
                file = %path.display(),
                "existing agent not detected; removing stale pid file"
            );
        }
        remove_file(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            written: false,
        })
    }

    /// Records `pid`. Called after daemonising so the child's pid is stored.
    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                LaunchError::PidFileExists {
                    path: self.path.clone(),
                }
            } else {
                LaunchError::PidWrite {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        self.written = true;
        writeln!(file, "{pid}")
            .and_then(|()| file.sync_all())
            .map_err(|source| LaunchError::PidWrite {
                path: self.path.clone(),
                source,
            })?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path.display(),
            "pid file written"
        );
        Ok(())
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if !self.written {
            return;
        }
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_file(path: &Path) -> Result<(), LaunchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn check_process(pid: u32) -> Result<bool, LaunchError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(LaunchError::CheckProcess { pid, source: errno }),
    }
}
