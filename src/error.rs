use std::io;
use std::str::Utf8Error;
use thiserror::Error;
use btleplug;
use serde_json;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },

    #[error("The scan period must be greater than zero")]
    InvalidScanPeriod,
}

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("The bluetooth adapter is disabled")]
    Disabled,

    #[error("Permission to use bluetooth was denied")]
    PermissionDenied,

    #[error("Error communicating with adapter (btleplug): {source}")]
    Btle { source: btleplug::Error },

    #[error("Enabling bluetooth is not supported on this platform")]
    Unsupported,

    #[error("Failed to open the bluetooth settings: {source}")]
    Open { source: io::Error },
}

impl From<btleplug::Error> for RadioError {
    fn from(source: btleplug::Error) -> Self {
        match source {
            btleplug::Error::PermissionDenied => RadioError::PermissionDenied,
            source => RadioError::Btle { source },
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Permission to scan for bluetooth devices has not been granted")]
    PermissionDenied,

    #[error("Bluetooth discovery is unavailable: {source}")]
    DiscoveryUnavailable { source: RadioError },

    #[error("A scan is already running")]
    AlreadyScanning,

    #[error("The scan duration must be greater than zero")]
    InvalidDuration,
}

impl From<RadioError> for ScanError {
    fn from(source: RadioError) -> Self {
        match source {
            RadioError::PermissionDenied => ScanError::PermissionDenied,
            source => ScanError::DiscoveryUnavailable { source },
        }
    }
}

#[derive(Error, Debug)]
#[error("Unknown command: {input}")]
pub struct UnknownCommand {
    pub input: String,
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Scan failed: {source}")]
    ScanError { #[from] source: ScanError },

    #[error("Failed to read console input: {source}")]
    IOError { #[from] source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_permission_denial_becomes_scan_permission_denial() {
        let err: ScanError = RadioError::from(btleplug::Error::PermissionDenied).into();
        assert!(matches!(err, ScanError::PermissionDenied));
    }

    #[test]
    fn other_radio_errors_make_discovery_unavailable() {
        let err: ScanError = RadioError::NoAdapter.into();
        assert!(matches!(err, ScanError::DiscoveryUnavailable { source: RadioError::NoAdapter }));

        let err: ScanError = RadioError::from(btleplug::Error::DeviceNotFound).into();
        assert!(matches!(err, ScanError::DiscoveryUnavailable { source: RadioError::Btle { .. } }));
    }
}
