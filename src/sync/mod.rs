//! Synchronization control module
//!
//! This module turns per-port buffer occupancies into a frequency correction
//! per node: a reducer collapses a [`Measurement`](crate::core::Measurement)
//! to a scalar error, and a PI stage turns that error into a correction.

pub mod checker;
pub mod controller;
pub mod system;

pub use self::checker::{
    check_frequency, should_stop, FrequencyChecker, OccupancyBound, PositiveFrequency, Stopper, TimeLimit,
};
pub use self::controller::{
    build_controllers, composed_controller, edge_output_system, node_output_system, NodeController,
};
pub use self::system::{
    Composed, OneEdgeOutputSystem, OutputSystem, PIStateSystem, PortScoped, Reducer, StateSystem,
};
