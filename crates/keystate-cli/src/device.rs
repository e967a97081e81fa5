//! Input device enumeration

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use evdev::Device;

/// Information about an input device
#[derive(Debug)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub keyboard: bool,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "3434:0361")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// Enumerate all input devices under /dev/input, sorted by path
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").context("Failed to read /dev/input")? {
        let entry = entry?;
        let path = entry.path();

        // Only look at event* devices
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let id = device.input_id();
                devices.push(DeviceInfo {
                    name: device.name().unwrap_or("Unknown").to_string(),
                    vendor: id.vendor(),
                    product: id.product(),
                    keyboard: is_keyboard(&device),
                    path,
                });
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device
        .supported_events()
        .contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false)
}

/// Pick the device to read from: the explicit path, then the configured one,
/// then the first keyboard found.
pub fn resolve_device(explicit: Option<PathBuf>, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(shellexpand::tilde(&path.to_string_lossy()).into_owned().into());
    }
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    match enumerate_devices()?.into_iter().find(|d| d.keyboard) {
        Some(device) => {
            tracing::info!("Using keyboard '{}' at {}", device.name, device.path.display());
            Ok(device.path)
        }
        None => bail!("No keyboard found under /dev/input; pass --device <path>"),
    }
}

/// Open a device for reading. The device is not grabbed, so input still
/// reaches the rest of the system.
pub fn open_device(path: &Path) -> Result<Device> {
    let device = Device::open(path)
        .with_context(|| format!("Failed to open input device {}", path.display()))?;

    if !is_keyboard(&device) {
        tracing::warn!(
            "{} ({}) does not look like a keyboard",
            path.display(),
            device.name().unwrap_or("Unknown")
        );
    }
    Ok(device)
}
