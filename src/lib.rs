//! DriveFarm
//!
//! Orchestration core of a desktop control panel for drive-space farming.
//! Owns the per-session tab configurations, validates and persists them,
//! and supervises one external worker process per tab. A presentation
//! shell embeds a [`SessionController`] and talks to it over two
//! unidirectional message channels: [`HostIntent`]s in, [`HostEvent`]s
//! out.

pub mod config;
pub mod panel;
pub mod worker;

use std::path::PathBuf;

pub use config::{
    ConfigError, ConfigStore, StorageConfig, StorageUnit, Tab, TabSnapshot, ValidationError,
};
pub use panel::{HostEvent, HostIntent, PanelError, SessionController, TabUpdate};
pub use worker::{ExitOutcome, WorkerClient, WorkerError, WorkerEvent, WorkerSupervisor};

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("drivefarm").join("logs"))
}

/// Initialize logging for the embedding shell.
///
/// Console output always; a daily-rolling file under [`log_dir`] when the
/// platform exposes one. The returned guard must stay alive for file
/// logging to keep flushing.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "drivefarm.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}
