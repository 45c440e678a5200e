//! Worker process supervision
//!
//! Owns at most one live worker process per tab, monitors each child for
//! exit, and reports natural terminations on a single event channel handed
//! out at construction. Operator-initiated stops discard the handle
//! immediately and emit nothing.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WorkerError;

/// Terminal outcome of a worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own, with any exit code
    Exited { code: Option<i32> },
    /// Waiting on the process failed
    Errored { message: String },
}

/// Lifecycle events emitted by the supervisor.
///
/// Only natural terminations are reported; an operator stop never produces
/// an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Terminated { tab: Uuid, outcome: ExitOutcome },
}

/// Live worker bound to one tab. Owned exclusively by the supervisor.
struct WorkerHandle {
    // Scopes terminated events to this spawn; a newer start for the same
    // tab invalidates events from the old child
    generation: u64,
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
    monitor: JoinHandle<()>,
}

/// Supervises at most one worker process per tab
pub struct WorkerSupervisor {
    workers: Arc<DashMap<Uuid, WorkerHandle>>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    generation: AtomicU64,
}

impl WorkerSupervisor {
    /// Create a supervisor and the receiving half of its event channel.
    ///
    /// The receiver is the single subscription; dropping it tears the
    /// delivery path down with the owner.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            workers: Arc::new(DashMap::new()),
            events,
            generation: AtomicU64::new(0),
        };
        (supervisor, rx)
    }

    /// Spawn a worker for the given tab.
    ///
    /// The worker counts as running as soon as the spawn succeeds; there is
    /// no readiness handshake. Rejects with `AlreadyRunning` while a handle
    /// exists for the tab. Same-tab calls serialize on the handle map's
    /// entry lock; different tabs never contend.
    pub fn start(&self, tab: Uuid, command: &str, args: &[String]) -> Result<(), WorkerError> {
        match self.workers.entry(tab) {
            Entry::Occupied(_) => Err(WorkerError::AlreadyRunning),
            Entry::Vacant(slot) => {
                let child = Command::new(command)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|e| WorkerError::SpawnFailed(format!("{}: {}", command, e)))?;

                let pid = child.id();
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                let (kill_tx, kill_rx) = oneshot::channel();

                let monitor = tokio::spawn(monitor_worker(
                    tab,
                    generation,
                    child,
                    kill_rx,
                    Arc::clone(&self.workers),
                    self.events.clone(),
                ));

                slot.insert(WorkerHandle {
                    generation,
                    pid,
                    kill: Some(kill_tx),
                    monitor,
                });

                info!("Worker spawned for tab {} (pid {:?})", tab, pid);
                Ok(())
            }
        }
    }

    /// Stop the worker for a tab, fire-and-forget.
    ///
    /// The handle is discarded immediately and no terminated event follows;
    /// the process may outlive this call briefly while the kill lands.
    /// Returns `false` (a no-op, not an error) when no worker is bound.
    pub fn stop(&self, tab: Uuid) -> bool {
        match self.workers.remove(&tab) {
            Some((_, mut handle)) => {
                if let Some(kill) = handle.kill.take() {
                    let _ = kill.send(());
                }
                info!("Stop signalled for tab {} worker (pid {:?})", tab, handle.pid);
                true
            }
            None => {
                debug!("Stop for tab {} ignored, no worker bound", tab);
                false
            }
        }
    }

    /// Whether a worker is currently bound to the tab
    pub fn is_running(&self, tab: Uuid) -> bool {
        self.workers.contains_key(&tab)
    }

    /// Number of live workers across all tabs
    pub fn running_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop every worker and wait for the monitor tasks to wind down.
    pub async fn shutdown(&self) {
        let tabs: Vec<Uuid> = self.workers.iter().map(|entry| *entry.key()).collect();

        let mut monitors = Vec::with_capacity(tabs.len());
        for tab in tabs {
            if let Some((_, mut handle)) = self.workers.remove(&tab) {
                if let Some(kill) = handle.kill.take() {
                    let _ = kill.send(());
                }
                monitors.push(handle.monitor);
            }
        }

        join_all(monitors).await;
        info!("All workers stopped");
    }
}

/// Waits on one child until it exits or the supervisor signals a kill.
async fn monitor_worker(
    tab: Uuid,
    generation: u64,
    mut child: Child,
    kill: oneshot::Receiver<()>,
    workers: Arc<DashMap<Uuid, WorkerHandle>>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    tokio::select! {
        // Operator stop: the handle is already discarded, just reap the child
        _ = kill => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill worker for tab {}: {}", tab, e);
            }
            debug!("Worker for tab {} stopped", tab);
        }
        status = child.wait() => {
            let outcome = match status {
                Ok(status) => {
                    info!("Worker for tab {} exited with {}", tab, status);
                    ExitOutcome::Exited { code: status.code() }
                }
                Err(e) => {
                    warn!("Worker for tab {} errored: {}", tab, e);
                    ExitOutcome::Errored { message: e.to_string() }
                }
            };

            // Drop the handle only while it is still this generation's; a
            // concurrent stop or a replacement start wins the race instead
            let still_ours = workers
                .remove_if(&tab, |_, handle| handle.generation == generation)
                .is_some();
            if still_ours {
                let _ = events.send(WorkerEvent::Terminated { tab, outcome });
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn expect_terminated(
        rx: &mut mpsc::UnboundedReceiver<WorkerEvent>,
        tab: Uuid,
    ) -> ExitOutcome {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no terminated event within 5s")
            .expect("event channel closed");
        match event {
            WorkerEvent::Terminated { tab: got, outcome } => {
                assert_eq!(got, tab);
                outcome
            }
        }
    }

    async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<WorkerEvent>) {
        assert!(
            timeout(Duration::from_millis(300), rx.recv()).await.is_err(),
            "unexpected event"
        );
    }

    #[tokio::test]
    async fn test_start_marks_running_and_stop_emits_nothing() {
        let (supervisor, mut rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        supervisor.start(tab, "sleep", &args(&["30"])).unwrap();
        assert!(supervisor.is_running(tab));

        assert!(supervisor.stop(tab));
        assert!(!supervisor.is_running(tab));

        // Operator stop: the exit must not surface as a terminated event
        expect_silence(&mut rx).await;
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let (supervisor, _rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        supervisor.start(tab, "sleep", &args(&["30"])).unwrap();
        assert!(matches!(
            supervisor.start(tab, "sleep", &args(&["30"])),
            Err(WorkerError::AlreadyRunning)
        ));
        assert_eq!(supervisor.running_count(), 1);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_natural_exit_emits_one_terminated() {
        let (supervisor, mut rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        supervisor.start(tab, "true", &[]).unwrap();
        let outcome = expect_terminated(&mut rx, tab).await;

        assert_eq!(outcome, ExitOutcome::Exited { code: Some(0) });
        assert!(!supervisor.is_running(tab));
        expect_silence(&mut rx).await;
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_terminates() {
        let (supervisor, mut rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        supervisor.start(tab, "false", &[]).unwrap();
        let outcome = expect_terminated(&mut rx, tab).await;

        assert_eq!(outcome, ExitOutcome::Exited { code: Some(1) });
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_tab_idle() {
        let (supervisor, _rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        let result = supervisor.start(tab, "/no/such/worker-binary", &[]);
        assert!(matches!(result, Err(WorkerError::SpawnFailed(_))));
        assert!(!supervisor.is_running(tab));

        // The slot is free again after the failure
        supervisor.start(tab, "sleep", &args(&["30"])).unwrap();
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_without_worker_is_noop() {
        let (supervisor, _rx) = WorkerSupervisor::new();
        assert!(!supervisor.stop(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_tabs_are_independent() {
        let (supervisor, _rx) = WorkerSupervisor::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        supervisor.start(first, "sleep", &args(&["30"])).unwrap();
        supervisor.start(second, "sleep", &args(&["30"])).unwrap();
        assert_eq!(supervisor.running_count(), 2);

        supervisor.stop(first);
        assert!(!supervisor.is_running(first));
        assert!(supervisor.is_running(second));

        supervisor.shutdown().await;
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_restart_does_not_see_stale_events() {
        let (supervisor, mut rx) = WorkerSupervisor::new();
        let tab = Uuid::new_v4();

        supervisor.start(tab, "true", &[]).unwrap();
        expect_terminated(&mut rx, tab).await;

        // The replacement keeps running; the old generation's event is spent
        supervisor.start(tab, "sleep", &args(&["30"])).unwrap();
        expect_silence(&mut rx).await;
        assert!(supervisor.is_running(tab));

        supervisor.shutdown().await;
    }
}
