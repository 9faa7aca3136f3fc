//! Clock error models and local/wall-clock time mapping
//!
//! Each node ticks at `correction + error(t)` local ticks per wall-clock unit,
//! where `error` is the node's [`ClockErrorModel`] and `correction` is the
//! frequency its controller currently applies.
//!
//! - [`local_to_realtime`] handles every error model (closed form for
//!   constant errors, bracketed bisection for piecewise-linear ones)
//! - [`realtime_to_local`] is only defined for constant errors
//!
//! # Examples
//!
//! ```
//! use bittide_sync::time::{local_to_realtime, realtime_to_local, ClockErrorModel};
//!
//! let model = ClockErrorModel::Constant(0.5);
//! let ds = local_to_realtime(&model, 10.0, 1.5, 0.0, 0.1).unwrap();
//! assert_eq!(ds, 5.0);
//! assert_eq!(realtime_to_local(0.5, 1.5, ds), 10.0);
//! ```

mod error_model;
mod mapper;

pub use self::error_model::{ClockErrorModel, ClockErrors, PiecewiseLinear};
pub use self::mapper::{
    local_to_realtime, local_to_realtime_with, realtime_to_local, TimeMapper,
};
