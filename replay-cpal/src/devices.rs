//! Input device listing for diagnostics and device pickers.

use cpal::traits::{DeviceTrait, HostTrait};
use log::{debug, warn};

/// Names of all input devices on the default host, in cpal's order.
///
/// Devices that fail to report a name are skipped; an enumeration
/// failure logs a warning and yields an empty list.
pub fn input_device_names() -> Vec<String> {
    let host = cpal::default_host();
    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!("cannot list input devices: {e}");
            return Vec::new();
        }
    };

    let names: Vec<String> = devices.filter_map(|device| device.name().ok()).collect();
    debug!("found {} input device(s)", names.len());
    names
}

/// Name of the default input device, if the host has one.
pub fn default_input_device_name() -> Option<String> {
    cpal::default_host()
        .default_input_device()
        .and_then(|device| device.name().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hosts without audio hardware (CI) yield an empty list; the call
    // itself must never panic.
    #[test]
    fn listing_devices_never_panics() {
        let names = input_device_names();
        for name in &names {
            assert!(!name.is_empty());
        }
    }
}
