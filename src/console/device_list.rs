use indexmap::IndexMap;

use crate::device::types::DiscoveredDevice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub device: DiscoveredDevice,
    pub reports: usize,
}

/// Devices seen so far, in order of first report, one entry per address.
#[derive(Debug, Default)]
pub struct DeviceList {
    entries: IndexMap<String, DeviceEntry>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the address had not been seen before.
    pub fn record(&mut self, device: DiscoveredDevice) -> bool {
        match self.entries.get_mut(&device.address) {
            Some(entry) => {
                // not every advertisement carries the local name
                if device.name.is_some() {
                    entry.device.name = device.name;
                }
                if device.rssi.is_some() {
                    entry.device.rssi = device.rssi;
                }
                entry.reports += 1;
                false
            },
            None => {
                self.entries.insert(device.address.clone(), DeviceEntry { device, reports: 1 });
                true
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.values()
    }

    pub fn render(&self) -> Vec<String> {
        self.entries()
            .enumerate()
            .map(|(index, entry)| format_entry(index + 1, entry))
            .collect()
    }
}

pub fn format_device(device: &DiscoveredDevice) -> String {
    let name = match device.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => "<unnamed>",
    };

    match device.rssi {
        Some(rssi) => format!("{:<24} {}  {} dBm", name, device.address, rssi),
        None => format!("{:<24} {}", name, device.address),
    }
}

fn format_entry(position: usize, entry: &DeviceEntry) -> String {
    format!("{:>3}. {}  ({}x)", position, format_device(&entry.device), entry.reports)
}
