//! Disk detection and device size queries

use crate::disk::size::Size;
use crate::utils::command::run_command_output;
use crate::utils::error::{Result, ZaiError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// sysfs reports block device sizes in 512-byte sectors regardless of the
/// device's logical block size
const SYSFS_SECTOR_BYTES: u64 = 512;

/// Information about a block device
#[derive(Debug, Clone)]
pub struct BlockDevice {
    /// Device path (e.g., /dev/sda)
    pub path: String,
    /// Device name (e.g., sda)
    pub name: String,
    pub size: Size,
    /// Device model (if available)
    pub model: Option<String>,
    /// Device type (disk, usb, nvme, etc.)
    pub device_type: String,
    pub removable: bool,
    pub read_only: bool,
}

impl BlockDevice {
    /// Comma-separated attribute flags for listings, `-` when there are none
    pub fn flags(&self) -> String {
        let flags: Vec<&str> = [(self.removable, "removable"), (self.read_only, "ro")]
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag))
            .collect();
        if flags.is_empty() {
            "-".to_string()
        } else {
            flags.join(",")
        }
    }
}

/// Source of a device's total capacity.
///
/// The value returned is treated as authoritative for a whole planning
/// session, so implementations must fail rather than guess.
pub trait DeviceSizeQuery {
    fn device_size(&self, device: &str) -> Result<Size>;
}

/// Queries the running system: sysfs first, then `blockdev --getsize64`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSizeQuery;

impl DeviceSizeQuery for SystemSizeQuery {
    fn device_size(&self, device: &str) -> Result<Size> {
        let path = Path::new(device);
        if !path.exists() {
            return Err(ZaiError::DeviceNotFound(device.to_string()));
        }

        // Resolve /dev/disk/by-* symlinks to the kernel name
        let name = fs::canonicalize(path)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()));

        if let Some(bytes) = name.as_deref().and_then(sysfs_size_bytes) {
            debug!("{} reports {} bytes via sysfs", device, bytes);
            return Ok(Size::from_bytes(bytes));
        }

        debug!("sysfs size unavailable for {}, asking blockdev", device);
        let output = run_command_output("blockdev", &["--getsize64", device]).map_err(|e| {
            ZaiError::DeviceQueryFailed {
                device: device.to_string(),
                reason: e.to_string(),
            }
        })?;
        parse_blockdev_output(device, &output)
    }
}

/// Parse the byte count printed by `blockdev --getsize64`
fn parse_blockdev_output(device: &str, output: &str) -> Result<Size> {
    let bytes: u64 = output
        .trim()
        .parse()
        .map_err(|_| ZaiError::DeviceQueryFailed {
            device: device.to_string(),
            reason: format!("unexpected blockdev output '{}'", output.trim()),
        })?;

    if bytes == 0 {
        return Err(ZaiError::DeviceQueryFailed {
            device: device.to_string(),
            reason: "device reports zero bytes".to_string(),
        });
    }

    Ok(Size::from_bytes(bytes))
}

/// Read a sysfs attribute, returning None if not available
fn read_sysfs_attr(device: &str, attr: &str) -> Option<String> {
    let path = format!("/sys/class/block/{}/{}", device, attr);
    fs::read_to_string(&path).ok().map(|s| s.trim().to_string())
}

/// Read a numeric sysfs attribute
fn read_sysfs_u64(device: &str, attr: &str) -> Option<u64> {
    read_sysfs_attr(device, attr).and_then(|s| s.parse().ok())
}

fn sysfs_size_bytes(device: &str) -> Option<u64> {
    read_sysfs_u64(device, "size")
        .filter(|sectors| *sectors > 0)
        .and_then(|sectors| sectors.checked_mul(SYSFS_SECTOR_BYTES))
}

/// Determine device type from sysfs
fn determine_device_type(device: &str) -> String {
    if device.starts_with("nvme") {
        return "nvme".to_string();
    }
    if device.starts_with("mmcblk") {
        return "mmc".to_string();
    }
    if device.starts_with("loop") {
        return "loop".to_string();
    }

    if read_sysfs_u64(device, "removable").unwrap_or(0) == 1 {
        return "usb".to_string();
    }

    match read_sysfs_u64(device, "queue/rotational") {
        Some(0) => "ssd".to_string(),
        Some(_) => "hdd".to_string(),
        None => "disk".to_string(),
    }
}

/// Check if a device is mounted
fn is_device_mounted(device: &str) -> bool {
    let mounts = fs::read_to_string("/proc/mounts").unwrap_or_default();
    mounts.lines().any(|line| line.starts_with(device))
}

/// List available block devices
///
/// If `all` is false, filters to only show suitable partitioning targets
/// (excludes mounted devices, read-only devices, loop devices, etc.)
pub fn list_block_devices(all: bool) -> Result<Vec<BlockDevice>> {
    let mut devices = Vec::new();

    for entry in fs::read_dir("/sys/block")? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        let device_type = determine_device_type(&name);
        if !all && device_type == "loop" {
            continue;
        }

        let Some(bytes) = sysfs_size_bytes(&name) else {
            continue;
        };

        // Skip very small devices (< 1GiB) unless showing all
        if !all && bytes < 1024 * 1024 * 1024 {
            continue;
        }

        let removable = read_sysfs_u64(&name, "removable").unwrap_or(0) == 1;
        let read_only = read_sysfs_u64(&name, "ro").unwrap_or(0) == 1;
        if !all && read_only {
            continue;
        }

        let model = read_sysfs_attr(&name, "device/model")
            .or_else(|| read_sysfs_attr(&name, "device/name"));

        let path = format!("/dev/{}", name);
        if !all && is_device_mounted(&path) {
            continue;
        }

        devices.push(BlockDevice {
            path,
            name,
            size: Size::from_bytes(bytes),
            model,
            device_type,
            removable,
            read_only,
        });
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(devices)
}

/// Get the partition naming prefix for a device
/// e.g., /dev/sda -> /dev/sda, /dev/nvme0n1 -> /dev/nvme0n1p
pub fn partition_prefix(device: &str) -> String {
    if device.contains("nvme") || device.contains("mmcblk") || device.contains("loop") {
        format!("{}p", device)
    } else {
        device.to_string()
    }
}

/// Get partition path for a device and partition number
pub fn partition_path(device: &str, partition_num: usize) -> String {
    format!("{}{}", partition_prefix(device), partition_num)
}
