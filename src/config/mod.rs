//! Tab configuration module
//!
//! Holds the tab data model, durable persistence of the tab list, and the
//! per-tab validation rules.

mod store;
mod tab;
mod validate;

pub use store::{ConfigError, ConfigStore, TabSnapshot};
pub use tab::{StorageConfig, StorageUnit, Tab};
pub use validate::{validate, ValidationError};
