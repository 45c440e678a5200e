//! Host channel messages
//!
//! Explicit message types for the two unidirectional channels between the
//! controller and the presentation shell: user intents flow in, state
//! events flow out. Transport mechanics are the shell's concern.

use std::path::PathBuf;

use crate::config::StorageUnit;

/// Field edits applied to the current tab.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    pub address: Option<String>,
    pub size: Option<f64>,
    pub unit: Option<StorageUnit>,
}

/// Inbound user intents, delivered one at a time
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostIntent {
    AddTab,
    /// `index: None` is the "none" selection: fall back to the first tab,
    /// creating one when the set is empty
    SelectTab { index: Option<usize> },
    RemoveCurrentTab,
    StartFarming,
    StopFarming,
    /// Ask the shell to open its directory picker; answered later with
    /// `StorageDirectorySelected`
    SelectStorageDirectory,
    StorageDirectorySelected { path: PathBuf },
    UpdateCurrentTab(TabUpdate),
}

/// Outbound events to the presentation shell
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostEvent {
    /// The current tab changed; carries whether it has a live worker
    TabChanged { is_running: bool },
    /// A worker terminated on its own (never sent for operator stops)
    ProcessTerminated,
    /// The shell should open its directory picker for the current tab
    StorageDirectoryRequested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_string(&HostEvent::TabChanged { is_running: true }).unwrap();
        assert_eq!(json, r#"{"type":"tabChanged","isRunning":true}"#);

        let json = serde_json::to_string(&HostEvent::ProcessTerminated).unwrap();
        assert_eq!(json, r#"{"type":"processTerminated"}"#);
    }

    #[test]
    fn test_intent_roundtrip() {
        let intents = vec![
            HostIntent::AddTab,
            HostIntent::SelectTab { index: Some(2) },
            HostIntent::SelectTab { index: None },
            HostIntent::RemoveCurrentTab,
            HostIntent::StartFarming,
            HostIntent::StopFarming,
            HostIntent::SelectStorageDirectory,
            HostIntent::StorageDirectorySelected {
                path: PathBuf::from("/srv/share"),
            },
            HostIntent::UpdateCurrentTab(TabUpdate {
                address: Some("1Addr".to_string()),
                size: Some(2.0),
                unit: Some(StorageUnit::TB),
            }),
        ];

        for intent in intents {
            let json = serde_json::to_string(&intent).unwrap();
            let back: HostIntent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, intent);
        }
    }

    #[test]
    fn test_intent_tag_is_camel_case() {
        let json = serde_json::to_string(&HostIntent::RemoveCurrentTab).unwrap();
        assert_eq!(json, r#"{"type":"removeCurrentTab"}"#);
    }
}
