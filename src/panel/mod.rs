//! Control panel module
//!
//! The session controller and the host channel message types it speaks
//! with the presentation shell.

mod controller;
mod host;

pub use controller::{PanelError, SessionController};
pub use host::{HostEvent, HostIntent, TabUpdate};
