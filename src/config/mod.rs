//! Configuration management

pub mod plan;

pub use plan::*;
