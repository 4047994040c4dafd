use std::sync::Mutex;
use async_trait::async_trait;
use indexmap::IndexSet;
use log::info;

use crate::device::radio::PermissionGate;
use crate::device::types::Permission;

/// Permission state for desktop platforms.
///
/// Desktop operating systems ask the user themselves the first time the radio is used, so
/// a request is recorded as granted. A denial by the operating system surfaces later as a
/// radio error.
pub struct DesktopPermissions {
    granted: Mutex<IndexSet<Permission>>,
}

impl DesktopPermissions {
    pub fn new<I: IntoIterator<Item = Permission>>(granted: I) -> Self {
        DesktopPermissions {
            granted: Mutex::new(granted.into_iter().collect()),
        }
    }
}

#[async_trait]
impl PermissionGate for DesktopPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        let granted = self.granted.lock().expect("Failed to lock granted permissions");
        granted.contains(&permission)
    }

    async fn request(&self, permissions: &[Permission]) {
        let mut granted = self.granted.lock().expect("Failed to lock granted permissions");
        for permission in permissions {
            if granted.insert(*permission) {
                info!("Requested permission {}", permission);
            }
        }
    }
}
