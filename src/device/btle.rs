use std::fmt::Display;
use std::sync::{Arc, OnceLock};
use async_trait::async_trait;
use btleplug::api::{BDAddr, Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::device::constants::BLUETOOTH_SETTINGS_URI;
use crate::device::radio::{DeviceStream, RadioAdapter};
use crate::device::types::DiscoveredDevice;
use crate::error::RadioError;

struct BtleState {
    // kept alive for as long as the adapter is in use
    manager: Option<Manager>,
    adapter: Option<Adapter>,
}

fn btle_state() -> &'static Mutex<BtleState> {
    static STATE: OnceLock<Mutex<BtleState>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(BtleState { manager: None, adapter: None }))
}

// Returns the first adapter of the process wide btleplug manager, creating both on first use.
// Nothing is cached while no adapter is present, so one that shows up later is still found.
async fn default_adapter() -> Result<Adapter, RadioError> {
    let mut state = btle_state().lock().await;

    if let Some(adapter) = &state.adapter {
        return Ok(adapter.clone());
    }

    let manager = match state.manager.take() {
        Some(manager) => manager,
        None => Manager::new().await?,
    };
    let adapters = state.manager.insert(manager).adapters().await?;

    let adapter = adapters.into_iter().next().ok_or(RadioError::NoAdapter)?;
    info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));

    state.adapter = Some(adapter.clone());
    Ok(adapter)
}

fn is_powered_on(state: CentralState) -> bool {
    matches!(state, CentralState::PoweredOn)
}

// CoreBluetooth hides hardware addresses and reports all zeros, so the platform id has to
// stand in for it.
fn device_address<I: Display>(address: BDAddr, id: &I) -> String {
    if address == BDAddr::default() {
        id.to_string()
    } else {
        address.to_string()
    }
}

fn matches_service_filter(filter: &[Uuid], advertised: &[Uuid]) -> bool {
    filter.is_empty() || advertised.iter().any(|uuid| filter.contains(uuid))
}

async fn lookup_device(adapter: &Adapter, id: &PeripheralId, services: &[Uuid]) -> Option<DiscoveredDevice> {
    let peripheral = match adapter.peripheral(id).await {
        Ok(v) => v,
        Err(err) => {
            warn!("Failed to query BLE adapter for peripheral: {}", err);
            return None;
        },
    };

    match peripheral.properties().await {
        Err(err) => {
            warn!("Could not query peripheral for properties: {:?}", err);
            None
        },
        Ok(None) => {
            debug!("Peripheral has no properties");
            None
        },
        Ok(Some(properties)) => {
            // Some environments ignore the filter, so make sure to check the service uuid again
            if !matches_service_filter(services, &properties.services) {
                return None;
            }

            Some(DiscoveredDevice {
                name: properties.local_name,
                address: device_address(properties.address, id),
                rssi: properties.rssi,
            })
        },
    }
}

/// The host's bluetooth radio, through btleplug.
pub struct BtleRadio {
    services: Arc<[Uuid]>,
}

impl BtleRadio {
    /// `services` limits discovery to devices advertising one of these services; an empty
    /// list reports every device.
    pub fn new(services: Vec<Uuid>) -> Self {
        BtleRadio { services: services.into() }
    }
}

#[async_trait]
impl RadioAdapter for BtleRadio {
    type Handle = Adapter;

    async fn is_enabled(&self) -> bool {
        match default_adapter().await {
            Ok(adapter) => match adapter.adapter_state().await {
                Ok(state) => {
                    debug!("Bluetooth adapter state {:?}", state);
                    is_powered_on(state)
                },
                Err(err) => {
                    warn!("Failed to query bluetooth adapter state: {}", err);
                    false
                },
            },
            Err(err) => {
                debug!("Bluetooth adapter not available: {}", err);
                false
            },
        }
    }

    async fn request_enable(&self) -> Result<(), RadioError> {
        let uri = BLUETOOTH_SETTINGS_URI.ok_or(RadioError::Unsupported)?;

        spawn_blocking(move || {
            open::that(uri)
        }).await.expect("Failed to join open settings task").map_err(|source| RadioError::Open { source })
    }

    async fn start_discovery(&self) -> Result<(Adapter, DeviceStream), RadioError> {
        let adapter = default_adapter().await?;
        let events = adapter.events().await?;

        adapter.start_scan(ScanFilter { services: self.services.to_vec() }).await?;

        let lookup_adapter = adapter.clone();
        let services = self.services.clone();

        let devices = events.filter_map(move |event| {
            let adapter = lookup_adapter.clone();
            let services = services.clone();

            async move {
                match event {
                    // every advertisement counts as a report, not only the first one per device
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        lookup_device(&adapter, &id, &services).await
                    },
                    _ => None,
                }
            }
        }).boxed();

        Ok((adapter, devices))
    }

    async fn stop_discovery(&self, handle: Adapter) -> Result<(), RadioError> {
        handle.stop_scan().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches_service_filter(&[], &[]));
        assert!(matches_service_filter(&[], &[Uuid::from_u128(1)]));
    }

    #[test]
    fn only_powered_on_counts_as_enabled() {
        assert!(is_powered_on(CentralState::PoweredOn));
        assert!(!is_powered_on(CentralState::PoweredOff));
        assert!(!is_powered_on(CentralState::Unknown));
    }

    #[test]
    fn hardware_address_is_preferred() {
        let address = BDAddr::from([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert_eq!(device_address(address, &"5F1A0C2E-unused"), "12:34:56:78:9A:BC");
    }

    #[test]
    fn hidden_address_falls_back_to_platform_id() {
        let first = Uuid::from_u128(0x5f1a0c2e_8b7d_4c21_9e0f_0123456789ab);
        let second = Uuid::from_u128(0x0a1b2c3d_4e5f_4a6b_8c7d_8e9fa0b1c2d3);

        let first_address = device_address(BDAddr::default(), &first);
        let second_address = device_address(BDAddr::default(), &second);

        assert_eq!(first_address, first.to_string());
        assert_ne!(first_address, second_address);
    }

    #[test]
    fn filter_needs_one_advertised_service() {
        let heart_rate = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);
        let battery = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

        assert!(matches_service_filter(&[heart_rate], &[battery, heart_rate]));
        assert!(!matches_service_filter(&[heart_rate], &[battery]));
        assert!(!matches_service_filter(&[heart_rate], &[]));
    }
}
