use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};

use crate::device::radio::{DeviceStream, RadioAdapter};
use crate::device::types::DiscoveredDevice;
use crate::error::RadioError;

pub fn device(name: Option<&str>, address: &str) -> DiscoveredDevice {
    DiscoveredDevice {
        name: name.map(String::from),
        address: address.to_string(),
        rssi: Some(-60),
    }
}

/// In-memory radio; devices are pushed into the running discovery with `emit`.
pub struct MockRadio {
    pub enabled: AtomicBool,
    pub fail_discovery: AtomicBool,
    pub fail_enable: AtomicBool,
    pub deny_permission: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub enable_requests: AtomicUsize,
    sender: Mutex<Option<UnboundedSender<DiscoveredDevice>>>,
}

impl MockRadio {
    pub fn new() -> Self {
        MockRadio {
            enabled: AtomicBool::new(true),
            fail_discovery: AtomicBool::new(false),
            fail_enable: AtomicBool::new(false),
            deny_permission: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            enable_requests: AtomicUsize::new(0),
            sender: Mutex::new(None),
        }
    }

    pub fn emit(&self, device: DiscoveredDevice) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            // the receiver is gone once discovery was stopped
            let _ = sender.unbounded_send(device);
        }
    }
}

#[async_trait]
impl RadioAdapter for MockRadio {
    type Handle = usize;

    async fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn request_enable(&self) -> Result<(), RadioError> {
        self.enable_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(RadioError::Unsupported);
        }
        Ok(())
    }

    async fn start_discovery(&self) -> Result<(usize, DeviceStream), RadioError> {
        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(RadioError::PermissionDenied);
        }
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(RadioError::NoAdapter);
        }

        let (sender, receiver) = unbounded();
        *self.sender.lock().unwrap() = Some(sender);
        let handle = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((handle, Box::pin(receiver)))
    }

    async fn stop_discovery(&self, _handle: usize) -> Result<(), RadioError> {
        self.sender.lock().unwrap().take();
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
