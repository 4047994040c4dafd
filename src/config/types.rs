use std::time::Duration;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{SCAN_PERIOD, SCAN_PERMISSIONS};
use crate::device::types::{Permission, RepeatStartPolicy};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Milliseconds after which a scan stops by itself.
    pub scan_period_ms: u64,
    pub repeat_start: RepeatStartPolicy,
    /// Only report devices advertising one of these services. Empty reports everything.
    pub service_filter: Vec<Uuid>,
    pub granted_permissions: Vec<Permission>,
}

impl Config {
    pub fn scan_period(&self) -> Duration {
        Duration::from_millis(self.scan_period_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_period_ms == 0 {
            return Err(ConfigError::InvalidScanPeriod);
        }

        Ok(())
    }

    pub fn normalize(&mut self) {
        self.service_filter = self.service_filter
            .drain(..)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan_period_ms: SCAN_PERIOD,
            repeat_start: RepeatStartPolicy::default(),
            service_filter: Vec::new(),
            granted_permissions: SCAN_PERMISSIONS.to_vec(),
        }
    }
}
