//! Writing a planned layout to disk with parted

use crate::disk::detection::partition_path;
use crate::disk::planner::Layout;
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, ZaiError};
use colored::Colorize;
use tracing::{debug, info, warn};

/// Options passed to parted ahead of the device path
const PARTED_OPTIONS: [&str; 3] = ["--script", "--fix", "--align=optimal"];

/// Full parted argument vector: options, device, then the emitted tokens
pub fn parted_args(device: &str, tokens: Vec<String>) -> Vec<String> {
    PARTED_OPTIONS
        .iter()
        .map(|opt| opt.to_string())
        .chain(std::iter::once(device.to_string()))
        .chain(tokens)
        .collect()
}

/// Apply a finalized layout to `device`.
///
/// parted failures are reported as they come back and never retried.
pub fn apply_layout(cmd: &CommandRunner, device: &str, layout: Layout) -> Result<()> {
    let count = layout.entries().len();
    let scheme = layout.scheme();
    info!("Applying {} partition layout to {}", count, device);

    let args = parted_args(device, layout.into_tokens()?);

    info!(
        "Writing new {} partition table to {}...",
        scheme.token(),
        device
    );
    cmd.run("parted", &args).map_err(|e| match e {
        ZaiError::Interrupted => e,
        other => ZaiError::PartitionError(format!("parted failed on {}: {}", device, other)),
    })?;

    info!(
        "Notifying kernel of partition table changes on {}...",
        device
    );
    if let Err(e) = cmd.run("partprobe", &[device]) {
        warn!("partprobe {} failed: {}", device, e);
    }

    if let Some(table) = cmd.run_output("parted", &[device, "unit", "GiB", "print"])? {
        println!("{}", table);
    }

    for number in 1..=count {
        debug!("Planned partition {}", partition_path(device, number));
    }
    info!(
        "Partitioning of {} complete ({} partitions created)",
        device, count
    );
    Ok(())
}

/// Print layout summary
pub fn print_layout_summary(device: &str, layout: &Layout) {
    let device_size = layout.device_size();
    println!(
        "\n{} {} ({}, {} label):",
        "Partition layout for".bold(),
        device,
        device_size.human(),
        layout.scheme().token()
    );
    println!(
        "{:<18} {:>16} {:>16} {:>12}",
        "PARTITION", "START", "END", "SIZE"
    );
    println!("{}", "-".repeat(65));

    for (i, entry) in layout.entries().iter().enumerate() {
        println!(
            "{:<18} {:>16} {:>16} {:>12}",
            partition_path(device, i + 1),
            entry.start().to_string(),
            entry.end().to_string(),
            entry.size(device_size).human()
        );
    }
    println!();
}
