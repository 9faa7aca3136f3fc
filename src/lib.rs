//! bittide synchronization core
//!
//! Models nodes whose clocks drift against wall-clock time and which correct
//! their frequencies from the occupancy of their incoming elastic buffers:
//!
//! - [`time`]: clock error models and local/wall-clock time mapping
//! - [`sync`]: composable PI controllers over occupancy measurements
//! - [`spectral`]: rate-matrix validation and eigen-analysis of convergence
pub mod core;
pub mod spectral;
pub mod sync;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Error, Measurement, Result, Topology};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
