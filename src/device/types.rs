use serde::{Deserialize, Serialize};

/// A device reported by the radio during a scan.
///
/// The same address may be reported many times while a scan is running, once per
/// advertisement the radio receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: Option<String>,
    pub address: String,
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Permission::BluetoothScan => "BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "BLUETOOTH_CONNECT",
        };

        write!(f, "{}", result)
    }
}

/// What `ScanSession::start` does when a scan is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatStartPolicy {
    /// Leave the running scan and its timer untouched.
    #[default]
    Ignore,
    /// Stop the running scan and start a new one with a fresh timer.
    Restart,
    /// Fail with `ScanError::AlreadyScanning`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyScanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    AlreadyEnabled,
    PromptLaunched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Device(DiscoveredDevice),
    Stopped,
}
