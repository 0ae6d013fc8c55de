//! Disk management modules

pub mod detection;
pub mod emitter;
pub mod partitioning;
pub mod planner;
pub mod size;
