//! zai - Partition planner for automated Arch Linux installs
//!
//! Plans a partition layout for a target disk and writes it with parted.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zai::config::PlanConfig;
use zai::disk::detection::{list_block_devices, SystemSizeQuery};
use zai::disk::partitioning::{apply_layout, parted_args, print_layout_summary};
use zai::utils::command::CommandRunner;
use zai::utils::error::ZaiError;
use zai::utils::{deps, prompt, signal};

#[derive(Parser)]
#[command(name = "zai")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dry run mode - show what would be done without making changes
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a partition layout and print it without writing anything
    Plan {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Target disk device (e.g., /dev/sda), overrides the configuration
        #[arg(short, long)]
        device: Option<String>,

        /// Print the parted arguments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan a partition layout and write it to the disk
    Apply {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Target disk device (e.g., /dev/sda), overrides the configuration
        #[arg(short, long)]
        device: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List available disks
    ListDisks {
        /// Show all block devices, not just suitable targets
        #[arg(short, long)]
        all: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        config: String,
    },

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "zai.toml")]
        output: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dry_run = cli.dry_run;
    if dry_run {
        info!("Running in dry-run mode - no changes will be made");
    }

    match cli.command {
        Some(Commands::Plan {
            config,
            device,
            json,
        }) => {
            cmd_plan(config, device, json)?;
        }
        Some(Commands::Apply {
            config,
            device,
            yes,
        }) => {
            cmd_apply(config, device, yes, dry_run)?;
        }
        Some(Commands::ListDisks { all }) => {
            cmd_list_disks(all)?;
        }
        Some(Commands::Validate { config }) => {
            cmd_validate(&config)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            cmd_generate_config(&output)?;
        }
        None => {
            // Default: plan interactively, never write
            cmd_plan(None, None, false)?;
        }
    }

    Ok(())
}

/// Load a plan file or run the wizard; `--device` wins over the file
fn load_config(config_path: Option<String>, device: Option<String>) -> Result<PlanConfig> {
    let mut config = if let Some(path) = config_path {
        info!("Loading configuration from {}", path);
        PlanConfig::from_file(&path)?
    } else {
        info!("Starting interactive configuration wizard");
        PlanConfig::from_wizard(device.clone())?
    };

    if let Some(d) = device {
        config.partitioning.block_device = d;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_plan(config_path: Option<String>, device: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, device)?;
    let device = config.partitioning.block_device.clone();
    let layout = config.build_layout(&SystemSizeQuery)?;

    if json {
        let args = parted_args(&device, layout.into_tokens()?);
        println!("{}", serde_json::to_string_pretty(&args)?);
        return Ok(());
    }

    print_layout_summary(&device, &layout);
    let args = parted_args(&device, layout.into_tokens()?);
    println!("parted {}", args.join(" "));

    Ok(())
}

fn cmd_apply(
    config_path: Option<String>,
    device: Option<String>,
    yes: bool,
    dry_run: bool,
) -> Result<()> {
    if !dry_run && !nix::unistd::geteuid().is_root() {
        return Err(ZaiError::NotRoot.into());
    }

    let config = load_config(config_path, device)?;
    let device = config.partitioning.block_device.clone();
    signal::install_signal_handlers(&device);

    let cmd = CommandRunner::new(dry_run);
    deps::ensure_dependencies(&cmd)?;

    let layout = config.build_layout(&SystemSizeQuery)?;
    print_layout_summary(&device, &layout);

    if !yes
        && !dry_run
        && !prompt::warn_confirm(&format!(
            "This will replace the partition table on {} and destroy all data on it.",
            device
        ))?
    {
        return Err(ZaiError::UserCancelled.into());
    }

    let result = apply_layout(&cmd, &device, layout);
    if signal::is_interrupted() {
        signal::reraise();
    }
    result?;

    prompt::success(&format!("Partition table written to {}", device));
    Ok(())
}

fn cmd_list_disks(all: bool) -> Result<()> {
    let devices = list_block_devices(all)?;

    if devices.is_empty() {
        println!("No suitable disks found.");
        return Ok(());
    }

    println!(
        "{:<15} {:>10} {:<20} {:<8} FLAGS",
        "DEVICE", "SIZE", "MODEL", "TYPE"
    );
    println!("{}", "-".repeat(72));

    for dev in devices {
        println!(
            "{:<15} {:>10} {:<20} {:<8} {}",
            dev.path,
            dev.size.human(),
            dev.model.as_deref().unwrap_or("-"),
            dev.device_type,
            dev.flags()
        );
    }

    Ok(())
}

fn cmd_validate(config_path: &str) -> Result<()> {
    let config = PlanConfig::from_file(config_path)?;
    config.validate()?;
    prompt::success("Configuration is valid");
    Ok(())
}

fn cmd_generate_config(output: &str) -> Result<()> {
    let sample = PlanConfig::sample();
    let content = sample.to_toml()?;
    std::fs::write(output, content)?;
    prompt::success(&format!("Sample configuration written to {}", output));
    Ok(())
}
