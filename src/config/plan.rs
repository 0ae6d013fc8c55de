//! Partition plan configuration

use crate::disk::detection::{list_block_devices, DeviceSizeQuery};
use crate::disk::planner::{Layout, LayoutPlanner, PartitionTable};
use crate::disk::size::Size;
use crate::utils::error::{Result, ZaiError};
use crate::utils::prompt::*;
use serde::{Deserialize, Serialize};
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use tracing::debug;

/// Top-level plan file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanConfig {
    pub partitioning: PartitioningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitioningConfig {
    /// Target device path (e.g., /dev/nvme0n1)
    pub block_device: String,
    /// Partition table written by `mklabel`
    #[serde(default)]
    pub table: PartitionTable,
    /// Size of the first (boot) partition; 1 MiB is reserved ahead of it
    pub first_partition: Size,
    /// Sizes of the following partitions, in order
    #[serde(default)]
    pub partitions: Vec<Size>,
    /// Stretch the last partition to this percentage of the disk (0 = off)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_percentage: Option<u8>,
}

impl PlanConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Render as the TOML a plan file holds
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Create configuration interactively
    pub fn from_wizard(device: Option<String>) -> Result<Self> {
        println!("\nzai partition planner\n");

        let block_device = if let Some(d) = device {
            d
        } else {
            let devices = list_block_devices(false)?;
            if devices.is_empty() {
                return Err(ZaiError::ConfigError(
                    "No suitable disks found".to_string(),
                ));
            }
            let items: Vec<String> = devices
                .iter()
                .map(|d| {
                    format!(
                        "{} - {} {}",
                        d.path,
                        d.size.human(),
                        d.model.as_deref().unwrap_or("")
                    )
                })
                .collect();
            let idx = prompt_select("Select target disk", &items, 0)?;
            devices[idx].path.clone()
        };

        let tables = [PartitionTable::Gpt, PartitionTable::Mbr];
        let table_idx = prompt_select("Partition table", &tables, 0)?;
        let table = tables[table_idx];

        let first_partition = prompt_size("Boot partition size", Some("1GiB"))?;

        println!("  Add the remaining partitions in order; leave empty to finish.");
        let mut partitions = Vec::new();
        loop {
            let prompt = format!("Partition {} size", partitions.len() + 2);
            let Some(input) = prompt_optional(&prompt)? else {
                break;
            };
            match input.parse::<Size>() {
                Ok(size) => partitions.push(size),
                Err(e) => println!("  {}", e),
            }
        }

        let end_percentage = loop {
            let input = prompt_input(
                "Stretch the last partition to % of disk (0 keeps its size)",
                Some("100"),
            )?;
            match input.trim().parse::<u8>() {
                Ok(pct) if pct <= 100 => break Some(pct),
                _ => println!("  Enter a whole number between 0 and 100"),
            }
        };

        let config = PlanConfig {
            partitioning: PartitioningConfig {
                block_device,
                table,
                first_partition,
                partitions,
                end_percentage,
            },
        };
        config.validate_plan()?;
        Ok(config)
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        PlanConfig {
            partitioning: PartitioningConfig {
                block_device: "/dev/nvme0n1".to_string(),
                table: PartitionTable::Gpt,
                first_partition: Size::from_bytes(1 << 30),
                partitions: vec![Size::from_bytes(32 << 30), Size::from_bytes(64 << 30)],
                end_percentage: Some(100),
            },
        }
    }

    /// Percentage handed to `finalize`; `0` means the last size stays fixed
    pub fn remainder_percentage(&self) -> Option<u8> {
        self.partitioning.end_percentage.filter(|pct| *pct > 0)
    }

    /// Validate the plan values without touching the device
    pub fn validate_plan(&self) -> Result<()> {
        let part = &self.partitioning;

        if part.block_device.trim().is_empty() {
            return Err(ZaiError::ValidationError(
                "block_device cannot be empty".to_string(),
            ));
        }

        if let Some(pos) = part.partitions.iter().position(|s| s.is_zero()) {
            return Err(ZaiError::ValidationError(format!(
                "partition {} has a size of zero",
                pos + 2
            )));
        }

        if let Some(pct) = part.end_percentage {
            if pct > 100 {
                return Err(ZaiError::ValidationError(format!(
                    "end_percentage must be between 0 and 100, got {}",
                    pct
                )));
            }
        }

        Ok(())
    }

    /// Validate the configuration, including the target device
    pub fn validate(&self) -> Result<()> {
        self.validate_plan()?;

        let device = &self.partitioning.block_device;
        if !Path::new(device).exists() {
            return Err(ZaiError::DeviceNotFound(device.clone()));
        }

        let metadata = std::fs::metadata(device)?;
        if !metadata.file_type().is_block_device() {
            return Err(ZaiError::NotBlockDevice(device.clone()));
        }

        Ok(())
    }

    /// Query the device size and run the planner over every configured partition
    pub fn build_layout(&self, query: &impl DeviceSizeQuery) -> Result<Layout> {
        let part = &self.partitioning;
        let device_size = query.device_size(&part.block_device)?;
        debug!(
            "{} is {} ({} bytes)",
            part.block_device,
            device_size.human(),
            device_size.to_bytes()
        );

        let mut planner = LayoutPlanner::new(device_size, part.table, part.first_partition)?;
        for size in &part.partitions {
            planner.append(*size)?;
        }

        Ok(planner.finalize(self.remainder_percentage())?)
    }
}

fn prompt_size(prompt: &str, default: Option<&str>) -> Result<Size> {
    loop {
        let input = prompt_input(prompt, default)?;
        match input.parse::<Size>() {
            Ok(size) => return Ok(size),
            Err(e) => println!("  {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::planner::Offset;
    use crate::utils::error::PlannerError;

    struct FixedSize(Size);

    impl DeviceSizeQuery for FixedSize {
        fn device_size(&self, _device: &str) -> Result<Size> {
            Ok(self.0)
        }
    }

    struct Missing;

    impl DeviceSizeQuery for Missing {
        fn device_size(&self, device: &str) -> Result<Size> {
            Err(ZaiError::DeviceNotFound(device.to_string()))
        }
    }

    const SAMPLE_TOML: &str = r#"
[partitioning]
block_device = "/dev/nvme0n1"
table = "gpt"
first_partition = "1GiB"
partitions = ["32GiB", "64GiB"]
end_percentage = 100
"#;

    #[test]
    fn parses_plan_file() {
        let config: PlanConfig = toml::from_str(SAMPLE_TOML).unwrap();
        assert_eq!(config, PlanConfig::sample());
    }

    #[test]
    fn defaults_apply_to_optional_fields() {
        let config: PlanConfig = toml::from_str(
            "[partitioning]\nblock_device = \"/dev/sda\"\nfirst_partition = \"512MiB\"\n",
        )
        .unwrap();
        assert_eq!(config.partitioning.table, PartitionTable::Gpt);
        assert!(config.partitioning.partitions.is_empty());
        assert_eq!(config.remainder_percentage(), None);
    }

    #[test]
    fn msdos_and_mbr_both_select_mbr() {
        for token in ["msdos", "mbr"] {
            let text = format!(
                "[partitioning]\nblock_device = \"/dev/sda\"\ntable = \"{}\"\nfirst_partition = \"1GiB\"\n",
                token
            );
            let config: PlanConfig = toml::from_str(&text).unwrap();
            assert_eq!(config.partitioning.table, PartitionTable::Mbr);
        }
    }

    #[test]
    fn bad_size_fails_to_parse() {
        let text = SAMPLE_TOML.replace("\"32GiB\"", "\"32 furlongs\"");
        assert!(toml::from_str::<PlanConfig>(&text).is_err());
    }

    #[test]
    fn sample_serializes_back_to_same_plan() {
        let text = PlanConfig::sample().to_toml().unwrap();
        assert!(text.contains("first_partition = \"1GiB\""));
        assert_eq!(toml::from_str::<PlanConfig>(&text).unwrap(), PlanConfig::sample());
    }

    #[test]
    fn zero_end_percentage_means_no_remainder() {
        let mut config = PlanConfig::sample();
        config.partitioning.end_percentage = Some(0);
        assert_eq!(config.remainder_percentage(), None);
        assert!(config.validate_plan().is_ok());
    }

    #[test]
    fn validate_plan_rejects_bad_values() {
        let mut config = PlanConfig::sample();
        config.partitioning.end_percentage = Some(150);
        assert!(matches!(config.validate_plan(), Err(ZaiError::ValidationError(_))));

        let mut config = PlanConfig::sample();
        config.partitioning.partitions.push(Size::ZERO);
        assert!(matches!(config.validate_plan(), Err(ZaiError::ValidationError(_))));

        let mut config = PlanConfig::sample();
        config.partitioning.block_device = String::new();
        assert!(matches!(config.validate_plan(), Err(ZaiError::ValidationError(_))));
    }

    #[test]
    fn validate_rejects_missing_device() {
        let mut config = PlanConfig::sample();
        config.partitioning.block_device = "/dev/zai-test-no-such-device".to_string();
        assert!(matches!(config.validate(), Err(ZaiError::DeviceNotFound(_))));
    }

    #[test]
    fn build_layout_plans_every_partition() {
        let config = PlanConfig::sample();
        let layout = config
            .build_layout(&FixedSize(Size::from_bytes(500 << 30)))
            .unwrap();

        let entries = layout.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].end(), Offset::Bytes((1 << 30) + (1 << 20)));
        assert_eq!(entries[1].end(), Offset::Bytes((33 << 30) + (1 << 20)));
        assert_eq!(entries[2].end(), Offset::Percent(100));
    }

    #[test]
    fn build_layout_surfaces_planner_errors() {
        let config = PlanConfig::sample();
        let err = config
            .build_layout(&FixedSize(Size::from_bytes(40 << 30)))
            .unwrap_err();
        assert!(matches!(
            err,
            ZaiError::Planner(PlannerError::OutOfSpace { .. })
        ));
    }

    #[test]
    fn build_layout_propagates_query_failure() {
        let err = PlanConfig::sample().build_layout(&Missing).unwrap_err();
        assert!(matches!(err, ZaiError::DeviceNotFound(d) if d == "/dev/nvme0n1"));
    }
}
