//! Test configuration loaders for scenarios covering success and failure paths.

use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use qga_config::{Config, ConfigError, TransportMethod};

use crate::bootstrap::ConfigLoader;

/// Loader that places the unix socket, state directory, and pidfile under a
/// temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    blacklist: Vec<String>,
    dial_timeout: Duration,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
            blacklist: Vec::new(),
            dial_timeout: Duration::from_secs(5),
        }
    }

    /// Disables the named commands.
    #[must_use]
    pub fn with_blacklist(mut self, entries: &[&str]) -> Self {
        self.blacklist = entries.iter().map(|entry| (*entry).to_owned()).collect();
        self
    }

    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join("qga.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.dir.path().join("run").join("qemu-ga.pid")
    }

    fn utf8(path: PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).expect("temporary path was not valid UTF-8")
    }

    /// Configuration handed out by [`ConfigLoader::load`].
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            method: TransportMethod::UnixListen,
            path: Some(Self::utf8(self.socket_path())),
            state_dir: Self::utf8(self.dir.path().join("state")),
            pid_file: Self::utf8(self.pid_path()),
            blacklist: self.blacklist.clone(),
            dial_timeout_ms: u64::try_from(self.dial_timeout.as_millis())
                .expect("dial timeout fits in u64"),
            ..Config::default()
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config())
    }
}

/// Loader that intentionally fails by passing an unknown transport method.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_iter(["qemu-ga", "--method", "carrier-pigeon"])
    }
}
