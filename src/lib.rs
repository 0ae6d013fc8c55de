//! zai library - partition layout planning for automated Arch Linux installs

pub mod config;
pub mod disk;
pub mod utils;

pub use config::PlanConfig;
pub use disk::planner::{BoundaryEntry, Layout, LayoutPlanner, Offset, PartitionTable};
pub use disk::size::{BinaryUnit, DecimalUnit, Size, Unit};
pub use utils::error::{PlannerError, ZaiError};
