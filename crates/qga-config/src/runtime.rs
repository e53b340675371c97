//! Derives runtime artefact paths used by the agent supervisor.
//!
//! The state directory doubles as the working directory of a daemonised
//! agent; the pidfile guards against two agents driving the same channel.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// Canonical paths for runtime artefacts written by the agent.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    state_dir: PathBuf,
    pid_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the configuration, creating the state
    /// directory and the pidfile's parent when missing.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError`] when the pidfile has no parent or a
    /// directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let state_dir = config.state_dir().as_std_path().to_path_buf();
        create_directory(&state_dir)?;
        let pid_path = config.pid_file().as_std_path().to_path_buf();
        let pid_parent = pid_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| RuntimePathsError::MissingPidParent {
                path: pid_path.clone(),
            })?;
        create_directory(pid_parent)?;
        Ok(Self {
            state_dir,
            pid_path,
        })
    }

    /// Directory holding agent state.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        self.state_dir.as_path()
    }

    /// Path to the PID file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }
}

fn create_directory(path: &Path) -> Result<(), RuntimePathsError> {
    fs::create_dir_all(path).map_err(|source| RuntimePathsError::StateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors raised while deriving agent runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The pidfile path lacked a parent directory.
    #[error("pid file '{}' has no parent directory", path.display())]
    MissingPidParent { path: PathBuf },
    /// Creating a runtime directory failed.
    #[error("failed to prepare directory '{}': {source}", path.display())]
    StateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn utf8(path: PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).expect("utf8 path")
    }

    #[test]
    fn derives_and_creates_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            state_dir: utf8(dir.path().join("state")),
            pid_file: utf8(dir.path().join("run").join("qemu-ga.pid")),
            ..Config::default()
        };
        let paths = RuntimePaths::from_config(&config).expect("paths should derive");
        assert!(paths.state_dir().is_dir());
        assert!(paths.pid_path().ends_with("run/qemu-ga.pid"));
        assert!(dir.path().join("run").is_dir());
    }

    #[test]
    fn rejects_pid_file_without_parent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            state_dir: utf8(dir.path().to_path_buf()),
            pid_file: Utf8PathBuf::from("qemu-ga.pid"),
            ..Config::default()
        };
        let error = RuntimePaths::from_config(&config)
            .expect_err("paths should fail for pidfiles without parents");
        assert!(matches!(error, RuntimePathsError::MissingPidParent { .. }));
    }
}
