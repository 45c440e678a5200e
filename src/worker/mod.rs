//! Worker process module
//!
//! Launches and supervises the external farming worker, one opaque child
//! process per tab, and wraps the worker binary's CLI contract.

mod client;
mod errors;
mod supervisor;

pub use client::{WorkerClient, DEFAULT_WORKER_COMMAND};
pub use errors::WorkerError;
pub use supervisor::{ExitOutcome, WorkerEvent, WorkerSupervisor};
