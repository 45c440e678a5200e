//! Tab validation
//!
//! Pure checks run before a tab is persisted for farming; never mutates the
//! tab and touches nothing on disk beyond metadata reads.

use std::fs;

use thiserror::Error;

use super::tab::Tab;

/// A user-input defect in one tab field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `storage.path`
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Payout addresses are Base58Check strings, 26-35 chars, version prefix 1 or 3
fn is_payout_address(s: &str) -> bool {
    (26..=35).contains(&s.len())
        && s.starts_with(['1', '3'])
        && s.chars().all(|c| BASE58.contains(c))
}

/// Validate one tab's configuration.
///
/// Checks run in field order and stop at the first defect so the error
/// always names a single field. `storage.unit` is valid by construction.
pub fn validate(tab: &Tab) -> Result<(), ValidationError> {
    if tab.address.is_empty() {
        return Err(ValidationError::new("address", "payout address is required"));
    }
    if !is_payout_address(&tab.address) {
        return Err(ValidationError::new(
            "address",
            "not a valid payout address",
        ));
    }

    if tab.storage.path.as_os_str().is_empty() {
        return Err(ValidationError::new(
            "storage.path",
            "storage directory is required",
        ));
    }
    match fs::metadata(&tab.storage.path) {
        Err(_) => {
            return Err(ValidationError::new(
                "storage.path",
                "storage directory does not exist",
            ));
        }
        Ok(meta) if !meta.is_dir() => {
            return Err(ValidationError::new(
                "storage.path",
                "storage path is not a directory",
            ));
        }
        Ok(meta) if meta.permissions().readonly() => {
            return Err(ValidationError::new(
                "storage.path",
                "storage directory is not writable",
            ));
        }
        Ok(_) => {}
    }

    if !tab.storage.size.is_finite() || tab.storage.size <= 0.0 {
        return Err(ValidationError::new(
            "storage.size",
            "storage size must be a positive number",
        ));
    }

    Ok(())
}
