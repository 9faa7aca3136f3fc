//! Core types shared by the time mapper, the controllers and the analyzer
//!
//! This module contains the measurement buffer, the topology read interface,
//! configuration records and the crate-wide error type.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{
    Config,
    ControllerConfig,
    Edge,
    Measurement,
    ReducerKind,
    Topology,
};

/// Link status value of an incoming port that is up
pub const LINK_UP: u8 = 1;

/// Link status value of an incoming port that is down
pub const LINK_DOWN: u8 = 0;
