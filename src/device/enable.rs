use log::info;

use crate::device::radio::{PermissionGate, RadioAdapter};
use crate::device::types::{EnableOutcome, Permission};
use crate::error::ScanError;

/// Ask the user to turn bluetooth on, unless it already is.
///
/// Launching the prompt needs `BluetoothConnect`. Without it the permission is requested
/// and `PermissionDenied` is returned so that the user can try again.
pub async fn enable_adapter<R: RadioAdapter, P: PermissionGate>(radio: &R, permissions: &P) -> Result<EnableOutcome, ScanError> {
    if radio.is_enabled().await {
        return Ok(EnableOutcome::AlreadyEnabled);
    }

    if !permissions.is_granted(Permission::BluetoothConnect) {
        permissions.request(&[Permission::BluetoothConnect]).await;
        return Err(ScanError::PermissionDenied);
    }

    radio.request_enable().await?;
    info!("Launched prompt to enable bluetooth");
    Ok(EnableOutcome::PromptLaunched)
}
