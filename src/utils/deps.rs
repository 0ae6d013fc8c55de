//! Host system dependency checking

use crate::utils::command::{command_exists, CommandRunner};
use crate::utils::error::{Result, ZaiError};
use colored::Colorize;
use tracing::info;

/// Binaries needed to write a layout, with the Arch package providing each
const REQUIRED_BINARIES: [(&str, &str); 3] = [
    ("parted", "parted"),
    ("partprobe", "parted"),
    ("blockdev", "util-linux"),
];

/// Packages whose binaries fail the `exists` check, deduplicated in order
pub fn missing_packages(exists: impl Fn(&str) -> bool) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = Vec::new();

    for (bin, pkg) in REQUIRED_BINARIES {
        if !exists(bin) && !missing.contains(&pkg) {
            missing.push(pkg);
        }
    }

    missing
}

/// Fail early when the partitioning tools are not installed.
///
/// In dry-run mode missing packages are only reported.
pub fn ensure_dependencies(cmd: &CommandRunner) -> Result<()> {
    let missing = missing_packages(command_exists);

    if missing.is_empty() {
        info!("All required host dependencies are installed");
        return Ok(());
    }

    println!("\n{} Missing host system packages:", "⚠".yellow());
    for pkg in &missing {
        println!("  - {}", pkg);
    }
    println!();

    if cmd.is_dry_run() {
        println!("[dry-run] Would require: pacman -S {}", missing.join(" "));
        return Ok(());
    }

    Err(ZaiError::ConfigError(format!(
        "Required dependencies are missing, install them with: pacman -S {}",
        missing.join(" ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_missing_when_all_binaries_exist() {
        assert!(missing_packages(|_| true).is_empty());
    }

    #[test]
    fn packages_are_deduplicated() {
        assert_eq!(missing_packages(|_| false), vec!["parted", "util-linux"]);
        assert_eq!(missing_packages(|bin| bin != "partprobe"), vec!["parted"]);
    }
}
