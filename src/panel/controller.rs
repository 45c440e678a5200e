//! Session controller
//!
//! Aggregates the config store, tab validation, and the worker supervisor
//! into the panel's public operations: add/select/remove tabs and
//! start/stop farming on the current one. Runs on a single logical thread
//! of control; worker outcomes arrive through the supervisor's event
//! channel and never block an operation.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{self, ConfigError, ConfigStore, Tab, TabSnapshot, ValidationError};
use crate::worker::{ExitOutcome, WorkerClient, WorkerError, WorkerEvent, WorkerSupervisor};

use super::host::{HostEvent, HostIntent, TabUpdate};

/// Errors surfaced by the controller's operations
#[derive(Error, Debug)]
pub enum PanelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persist(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl From<PanelError> for String {
    fn from(err: PanelError) -> String {
        err.to_string()
    }
}

/// Orchestrates the tab set and the worker bound to the current tab.
///
/// Constructed explicitly and passed to whatever layer embeds it; there is
/// no shared global instance. After construction the controller always
/// holds at least one tab, exactly one of them active, with the cursor on
/// it.
pub struct SessionController {
    store: ConfigStore,
    client: WorkerClient,
    supervisor: WorkerSupervisor,
    worker_events: mpsc::UnboundedReceiver<WorkerEvent>,
    events: mpsc::UnboundedSender<HostEvent>,
    tabs: Vec<Tab>,
    current: usize,
    // Derived running view by tab position; the supervisor owns the handles
    running: Vec<bool>,
}

impl SessionController {
    /// Build a controller and the receiving half of its outbound event
    /// channel.
    ///
    /// Loads the persisted tab list, falling back to an empty one when the
    /// store is unreadable, then guarantees at least one tab with exactly
    /// one active marker.
    pub fn new(
        store: ConfigStore,
        client: WorkerClient,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (supervisor, worker_events) = WorkerSupervisor::new();

        let snapshot = match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Starting with an empty tab list: {}", e);
                TabSnapshot::default()
            }
        };

        let running = vec![false; snapshot.tabs.len()];
        let mut controller = Self {
            store,
            client,
            supervisor,
            worker_events,
            events,
            tabs: snapshot.tabs,
            current: 0,
            running,
        };

        if controller.tabs.is_empty() {
            if let Err(e) = controller.add_tab() {
                warn!("Failed to persist the initial tab: {}", e);
            }
        } else {
            controller.repair_active_marker();
        }

        (controller, events_rx)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_tab(&self) -> &Tab {
        &self.tabs[self.current]
    }

    /// Whether the tab at `index` has a live worker
    pub fn is_running(&self, index: usize) -> bool {
        self.running.get(index).copied().unwrap_or(false)
    }

    pub fn is_current_running(&self) -> bool {
        self.is_running(self.current)
    }

    /// Append an empty tab, activate it, and persist.
    pub fn add_tab(&mut self) -> Result<usize, PanelError> {
        self.tabs.push(Tab::new());
        self.running.push(false);

        let index = self.tabs.len() - 1;
        self.activate(index);
        self.persist()?;
        Ok(index)
    }

    /// Switch the current tab.
    ///
    /// `None` (and any out-of-range index) falls back to the first tab,
    /// creating one when the set is empty. Emits `TabChanged` with the new
    /// tab's running state.
    pub fn select_tab(&mut self, index: Option<usize>) -> Result<(), PanelError> {
        match index {
            Some(i) if i < self.tabs.len() => {
                self.activate(i);
                self.persist()?;
            }
            _ => {
                if let Some(i) = index {
                    warn!("Tab index {} out of range, selecting first tab", i);
                }
                if self.tabs.is_empty() {
                    self.add_tab()?;
                } else {
                    self.activate(0);
                    self.persist()?;
                }
            }
        }
        Ok(())
    }

    /// Remove the current tab, stopping its worker first.
    ///
    /// Selection falls back to the previous tab (clamped at the first); an
    /// empty set gets a fresh tab. The in-memory removal stands even when
    /// the persist fails, so disk can lag memory until the next successful
    /// save.
    pub fn remove_current_tab(&mut self) -> Result<(), PanelError> {
        self.stop_farming();

        let removed = self.tabs.remove(self.current);
        self.running.remove(self.current);
        info!("Removed tab {}", removed.id);

        self.select_tab(self.current.checked_sub(1))
    }

    /// Validate, persist, and spawn the worker for the current tab.
    ///
    /// A tab that is already farming makes this a no-op, not an error.
    pub async fn start_farming(&mut self) -> Result<(), PanelError> {
        if self.is_current_running() {
            debug!("Tab {} is already farming", self.current);
            return Ok(());
        }

        let tab = self.current_tab().clone();
        config::validate(&tab)?;
        self.persist()?;

        self.client.validate_installed().await?;
        self.client.set_address(&tab.address).await?;

        let args = self.client.farm_args(&tab.storage);
        match self.supervisor.start(tab.id, self.client.command(), &args) {
            Ok(()) => {
                self.running[self.current] = true;
                info!("Farming started for tab {}", tab.id);
                Ok(())
            }
            // Guard, not a user-visible error
            Err(WorkerError::AlreadyRunning) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stop the current tab's worker, fire-and-forget.
    ///
    /// The running flag clears immediately; no `ProcessTerminated` follows
    /// an operator stop.
    pub fn stop_farming(&mut self) {
        if self.is_current_running() {
            let id = self.current_tab().id;
            self.supervisor.stop(id);
            self.running[self.current] = false;
            info!("Farming stopped for tab {}", id);
        }
    }

    /// Write the shell's directory-picker result into the current tab.
    pub fn storage_directory_selected(&mut self, path: PathBuf) -> Result<(), PanelError> {
        self.tabs[self.current].storage.path = path;
        self.persist()?;
        Ok(())
    }

    /// Apply field edits to the current tab and persist.
    pub fn update_current_tab(&mut self, update: TabUpdate) -> Result<(), PanelError> {
        let tab = &mut self.tabs[self.current];
        if let Some(address) = update.address {
            tab.address = address;
        }
        if let Some(size) = update.size {
            tab.storage.size = size;
        }
        if let Some(unit) = update.unit {
            tab.storage.unit = unit;
        }
        self.persist()?;
        Ok(())
    }

    /// Apply one inbound intent; failures are logged, state stays
    /// consistent.
    pub async fn handle_intent(&mut self, intent: HostIntent) {
        let result = match intent {
            HostIntent::AddTab => self.add_tab().map(|_| ()),
            HostIntent::SelectTab { index } => self.select_tab(index),
            HostIntent::RemoveCurrentTab => self.remove_current_tab(),
            HostIntent::StartFarming => self.start_farming().await,
            HostIntent::StopFarming => {
                self.stop_farming();
                Ok(())
            }
            HostIntent::SelectStorageDirectory => {
                self.emit(HostEvent::StorageDirectoryRequested);
                Ok(())
            }
            HostIntent::StorageDirectorySelected { path } => {
                self.storage_directory_selected(path)
            }
            HostIntent::UpdateCurrentTab(update) => self.update_current_tab(update),
        };

        if let Err(e) = result {
            warn!("Intent failed: {}", e);
        }
    }

    /// Wait for and apply the next supervisor event.
    ///
    /// [`run`](Self::run) pumps this internally; shells that drive the
    /// controller method-by-method pump it themselves. Returns `false`
    /// once the supervisor side has closed.
    pub async fn process_next_worker_event(&mut self) -> bool {
        match self.worker_events.recv().await {
            Some(event) => {
                self.handle_worker_event(event);
                true
            }
            None => false,
        }
    }

    /// Drive the controller from the host channel until the intent side
    /// closes, then stop every worker.
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<HostIntent>) {
        info!("Session controller running with {} tabs", self.tabs.len());

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent).await,
                    None => break,
                },
                Some(event) = self.worker_events.recv() => {
                    self.handle_worker_event(event);
                }
            }
        }

        self.supervisor.shutdown().await;
        info!("Session controller stopped");
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Terminated { tab, outcome } => {
                match &outcome {
                    ExitOutcome::Exited { code } => {
                        info!("Worker for tab {} terminated (code {:?})", tab, code);
                    }
                    ExitOutcome::Errored { message } => {
                        warn!("Worker for tab {} errored: {}", tab, message);
                    }
                }

                if let Some(position) = self.tabs.iter().position(|t| t.id == tab) {
                    if let Some(flag) = self.running.get_mut(position) {
                        *flag = false;
                    }
                }
                self.emit(HostEvent::ProcessTerminated);
            }
        }
    }

    // Deactivate the old current tab, activate `index`, move the cursor,
    // and tell the shell. Callers keep `index` in range.
    fn activate(&mut self, index: usize) {
        if let Some(tab) = self.tabs.get_mut(self.current) {
            tab.active = false;
        }
        self.tabs[index].active = true;
        self.current = index;

        let is_running = self.is_running(index);
        self.emit(HostEvent::TabChanged { is_running });
    }

    // Re-derive the cursor from the persisted active marker, repairing to
    // exactly one active tab
    fn repair_active_marker(&mut self) {
        let active = self.tabs.iter().position(|t| t.active).unwrap_or(0);

        let mut changed = false;
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            if tab.active != (i == active) {
                tab.active = i == active;
                changed = true;
            }
        }
        self.current = active;

        if changed {
            if let Err(e) = self.persist() {
                warn!("Failed to persist repaired tab list: {}", e);
            }
        }
    }

    fn persist(&self) -> Result<(), ConfigError> {
        self.store.save(&TabSnapshot {
            tabs: self.tabs.clone(),
        })
    }

    fn emit(&self, event: HostEvent) {
        // The shell may already have dropped its receiver during teardown
        let _ = self.events.send(event);
    }
}
