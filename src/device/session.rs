use std::sync::Arc;
use std::time::Duration;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::spawn;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::device::constants::SCAN_LOG_TARGET;
use crate::device::radio::{DeviceStream, PermissionGate, RadioAdapter};
use crate::device::types::{DiscoveredDevice, Permission, RepeatStartPolicy, StartOutcome};
use crate::error::{RadioError, ScanError};

type StoppedCallback = Box<dyn FnOnce() + Send>;

struct ActiveScan<H> {
    generation: u64,
    handle: H,
    // cancels both the stop timer and the device forwarding task
    cancel: CancellationToken,
    on_stopped: StoppedCallback,
}

struct SessionState<H> {
    // Some while scanning; the stop timer lives exactly as long as this value
    active: Option<ActiveScan<H>>,
    generation: u64,
}

/// A timed BLE scan.
///
/// At most one discovery operation runs at a time. It is stopped when the duration passed
/// to `start` elapses, or earlier by `stop`. Either way the `on_stopped` callback of that
/// scan runs exactly once.
pub struct ScanSession<R: RadioAdapter, P: PermissionGate> {
    radio: Arc<R>,
    permissions: Arc<P>,
    policy: RepeatStartPolicy,
    state: Arc<Mutex<SessionState<R::Handle>>>,
}

impl<R: RadioAdapter, P: PermissionGate> Clone for ScanSession<R, P> {
    fn clone(&self) -> Self {
        ScanSession {
            radio: self.radio.clone(),
            permissions: self.permissions.clone(),
            policy: self.policy,
            state: self.state.clone(),
        }
    }
}

async fn finish_scan<R: RadioAdapter>(radio: &R, active: ActiveScan<R::Handle>) {
    let ActiveScan { handle, cancel, on_stopped, .. } = active;

    cancel.cancel();
    if let Err(err) = radio.stop_discovery(handle).await {
        warn!("Failed to stop discovery: {}", err);
    }

    info!(target: SCAN_LOG_TARGET, "stop");
    on_stopped();
}

fn forward_devices_task<D>(cancel: CancellationToken, mut devices: DeviceStream, mut on_device: D)
where
    D: FnMut(DiscoveredDevice) + Send + 'static,
{
    spawn(async move {
        'mainloop: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                device = devices.next() => match device {
                    // the scan may have been stopped while this device was in flight
                    Some(_) if cancel.is_cancelled() => break 'mainloop,
                    Some(device) => {
                        info!(
                            target: SCAN_LOG_TARGET,
                            "name: {}, address: {}",
                            device.display_name(),
                            device.address,
                        );
                        on_device(device);
                    },
                    None => {
                        debug!("Discovery stream ended");
                        break 'mainloop;
                    },
                },
            }
        }
    });
}

impl<R: RadioAdapter, P: PermissionGate> ScanSession<R, P> {
    pub fn new(radio: Arc<R>, permissions: Arc<P>, policy: RepeatStartPolicy) -> Self {
        ScanSession {
            radio,
            permissions,
            policy,
            state: Arc::new(Mutex::new(SessionState { active: None, generation: 0 })),
        }
    }

    pub fn radio(&self) -> &Arc<R> {
        &self.radio
    }

    pub fn permissions(&self) -> &Arc<P> {
        &self.permissions
    }

    pub async fn is_scanning(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Start discovery and stop it again after `duration`.
    ///
    /// Every device the radio reports is passed to `on_device` until the scan stops. Fails
    /// with `PermissionDenied` without touching the radio if the scan permission has not
    /// been granted.
    pub async fn start<D, S>(&self, duration: Duration, on_device: D, on_stopped: S) -> Result<StartOutcome, ScanError>
    where
        D: FnMut(DiscoveredDevice) + Send + 'static,
        S: FnOnce() + Send + 'static,
    {
        if duration.is_zero() {
            return Err(ScanError::InvalidDuration);
        }

        if !self.permissions.is_granted(Permission::BluetoothScan) {
            return Err(ScanError::PermissionDenied);
        }

        let mut state = self.state.lock().await;

        if state.active.is_some() {
            match self.policy {
                RepeatStartPolicy::Ignore => {
                    debug!("Scan already running, ignoring start request");
                    return Ok(StartOutcome::AlreadyScanning);
                },
                RepeatStartPolicy::Reject => return Err(ScanError::AlreadyScanning),
                RepeatStartPolicy::Restart => {
                    if let Some(active) = state.active.take() {
                        debug!("Scan already running, restarting");
                        finish_scan(self.radio.as_ref(), active).await;
                    }
                },
            }
        }

        if !self.radio.is_enabled().await {
            return Err(ScanError::DiscoveryUnavailable { source: RadioError::Disabled });
        }

        let (handle, devices) = self.radio.start_discovery().await?;
        info!(target: SCAN_LOG_TARGET, "start");

        state.generation += 1;
        let generation = state.generation;
        let cancel = CancellationToken::new();

        forward_devices_task(cancel.clone(), devices, on_device);

        // the deadline is fixed now, not when the task is first polled
        let expiry = sleep(duration);
        let timer_cancel = cancel.clone();
        let timer_state = self.state.clone();
        let timer_radio = self.radio.clone();

        spawn(async move {
            tokio::select! {
                _ = timer_cancel.cancelled() => {},
                _ = expiry => {
                    let mut state = timer_state.lock().await;
                    // a stop or restart may have won the race for the lock
                    let is_current = matches!(&state.active, Some(active) if active.generation == generation);

                    if is_current {
                        if let Some(active) = state.active.take() {
                            debug!("Scan period of {} elapsed", humantime::format_duration(duration));
                            finish_scan(timer_radio.as_ref(), active).await;
                        }
                    }
                },
            }
        });

        state.active = Some(ActiveScan {
            generation,
            handle,
            cancel,
            on_stopped: Box::new(on_stopped),
        });

        Ok(StartOutcome::Started)
    }

    /// Stop the running scan, if any. Returns whether a scan was stopped.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;

        match state.active.take() {
            Some(active) => {
                finish_scan(self.radio.as_ref(), active).await;
                true
            },
            None => false,
        }
    }
}
