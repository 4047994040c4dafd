use crate::device::types::Permission;

/**
 * How long (milliseconds) a scan runs before it is stopped automatically.
 */
pub const SCAN_PERIOD: u64 = 10000;

/**
 * Log target used for scan start/stop and discovered device lines.
 */
pub const SCAN_LOG_TARGET: &str = "ble_scan";

/**
 * Permissions requested before a scan may be started.
 */
pub const SCAN_PERMISSIONS: [Permission; 2] = [
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
];

/**
 * Settings page opened when the user asks to enable bluetooth.
 */
#[cfg(target_os = "windows")]
pub const BLUETOOTH_SETTINGS_URI: Option<&str> = Some("ms-settings:bluetooth");

#[cfg(target_os = "macos")]
pub const BLUETOOTH_SETTINGS_URI: Option<&str> = Some("x-apple.systempreferences:com.apple.preferences.Bluetooth");

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const BLUETOOTH_SETTINGS_URI: Option<&str> = None;
