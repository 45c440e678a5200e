//! Worker CLI client
//!
//! Drives the external farming binary through its command-line contract:
//! an installed probe, payout-address configuration, and construction of
//! the farm spawn arguments. The binary itself is opaque; resolving its
//! platform-specific path is the embedding shell's concern.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::StorageConfig;

use super::WorkerError;

/// Command name used when the shell does not override it
pub const DEFAULT_WORKER_COMMAND: &str = "dataserv-client";

/// Handle on the worker binary's CLI
#[derive(Debug, Clone)]
pub struct WorkerClient {
    command: String,
}

impl WorkerClient {
    /// Create a client driving the given command name or path
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Probe that the worker binary is installed and runnable.
    pub async fn validate_installed(&self) -> Result<(), WorkerError> {
        let status = Command::new(&self.command)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| WorkerError::NotInstalled(format!("{}: {}", self.command, e)))?;

        if !status.success() {
            return Err(WorkerError::NotInstalled(format!(
                "{}: version probe exited with {}",
                self.command, status
            )));
        }

        debug!("Worker binary {} is installed", self.command);
        Ok(())
    }

    /// Write the payout address into the worker's own configuration.
    ///
    /// Runs to completion before any farm spawn; the spawned process picks
    /// the address up from the worker's config.
    pub async fn set_address(&self, address: &str) -> Result<(), WorkerError> {
        let status = Command::new(&self.command)
            .arg("config")
            .arg(format!("--set_payout_address={}", address))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| WorkerError::ConfigureFailed(format!("{}: {}", self.command, e)))?;

        if !status.success() {
            return Err(WorkerError::ConfigureFailed(format!(
                "config exited with {}",
                status
            )));
        }

        info!("Worker payout address configured");
        Ok(())
    }

    /// Spawn arguments for farming the given storage settings
    pub fn farm_args(&self, storage: &StorageConfig) -> Vec<String> {
        vec![
            format!("--store_path={}", storage.path.display()),
            format!("--max_size={}{}", format_size(storage.size), storage.unit),
            "farm".to_string(),
        ]
    }
}

impl Default for WorkerClient {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COMMAND)
    }
}

// The worker CLI rejects trailing ".0"; whole numbers go out bare
fn format_size(size: f64) -> String {
    if size.fract() == 0.0 && size.abs() < u64::MAX as f64 {
        format!("{}", size as u64)
    } else {
        size.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageUnit;
    use std::path::PathBuf;

    #[test]
    fn test_default_command_name() {
        assert_eq!(WorkerClient::default().command(), "dataserv-client");
    }

    #[test]
    fn test_farm_args_whole_size() {
        let client = WorkerClient::default();
        let storage = StorageConfig {
            path: PathBuf::from("/srv/share"),
            size: 10.0,
            unit: StorageUnit::GB,
        };
        assert_eq!(
            client.farm_args(&storage),
            vec!["--store_path=/srv/share", "--max_size=10GB", "farm"]
        );
    }

    #[test]
    fn test_farm_args_fractional_size() {
        let client = WorkerClient::default();
        let storage = StorageConfig {
            path: PathBuf::from("/srv/share"),
            size: 1.5,
            unit: StorageUnit::TB,
        };
        assert_eq!(client.farm_args(&storage)[1], "--max_size=1.5TB");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_installed_missing_binary() {
        let client = WorkerClient::new("/no/such/worker-binary");
        assert!(matches!(
            client.validate_installed().await,
            Err(WorkerError::NotInstalled(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_installed_accepts_clean_exit() {
        // `true` ignores its arguments and exits 0, standing in for the probe
        let client = WorkerClient::new("true");
        assert!(client.validate_installed().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_installed_rejects_failing_probe() {
        let client = WorkerClient::new("false");
        assert!(matches!(
            client.validate_installed().await,
            Err(WorkerError::NotInstalled(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_address_failure_is_configure_failed() {
        let client = WorkerClient::new("false");
        assert!(matches!(
            client.set_address("1Addr").await,
            Err(WorkerError::ConfigureFailed(_))
        ));
    }
}
