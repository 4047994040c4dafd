use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;

use crate::device::types::{DiscoveredDevice, Permission};
use crate::error::RadioError;

/// Devices pushed by the platform while discovery is running, one item per report.
pub type DeviceStream = Pin<Box<dyn Stream<Item = DiscoveredDevice> + Send>>;

/// The platform bluetooth radio.
#[async_trait]
pub trait RadioAdapter: Send + Sync + 'static {
    /// Identifies a running discovery operation so that it can be stopped again.
    type Handle: Send + 'static;

    async fn is_enabled(&self) -> bool;

    /// Ask the user to turn the radio on. The outcome is delivered out-of-band; call
    /// `is_enabled` again later.
    async fn request_enable(&self) -> Result<(), RadioError>;

    async fn start_discovery(&self) -> Result<(Self::Handle, DeviceStream), RadioError>;

    async fn stop_discovery(&self, handle: Self::Handle) -> Result<(), RadioError>;
}

/// Runtime permission checks.
#[async_trait]
pub trait PermissionGate: Send + Sync + 'static {
    fn is_granted(&self, permission: Permission) -> bool;

    /// Ask for the given permissions. Callers re-check with `is_granted` before retrying.
    async fn request(&self, permissions: &[Permission]);
}
