use tracing::debug;

use crate::core::{Error, Result};
use crate::util::Bisection;
use super::error_model::ClockErrorModel;

/// Wall-clock duration needed for `local` ticks to elapse from `start`.
///
/// Solves `∫_start^{start+ds} (correction + error(t)) dt = local` for `ds`.
/// The effective frequency `correction + error(t)` must stay at or above
/// `wmin` over `[start, start + local / wmin]`, which bounds the search.
pub fn local_to_realtime(
    model: &ClockErrorModel,
    local: f64,
    correction: f64,
    start: f64,
    wmin: f64,
) -> Result<f64> {
    local_to_realtime_with(model, local, correction, start, wmin, &Bisection::default())
}

/// Same as [`local_to_realtime`] with an explicit root finder
pub fn local_to_realtime_with(
    model: &ClockErrorModel,
    local: f64,
    correction: f64,
    start: f64,
    wmin: f64,
    bisection: &Bisection,
) -> Result<f64> {
    if !wmin.is_finite() || wmin <= 0.0 {
        return Err(Error::precondition(format!("wmin must be positive, got {}", wmin)));
    }
    if !local.is_finite() || local < 0.0 {
        return Err(Error::precondition(format!(
            "Local duration must be non-negative, got {}",
            local
        )));
    }
    if local == 0.0 {
        return Ok(0.0);
    }

    match model {
        ClockErrorModel::Constant(value) => {
            let frequency = correction + value;
            if frequency < wmin {
                return Err(Error::precondition(format!(
                    "Effective frequency {} is below wmin {}",
                    frequency, wmin
                )));
            }
            Ok(local / frequency)
        }
        ClockErrorModel::PiecewiseLinear(_) => {
            let upper = start + local / wmin;
            let lowest = correction + model.minimum_on(start, upper);
            if lowest < wmin {
                return Err(Error::precondition(format!(
                    "Effective frequency drops to {} on [{}, {}], below wmin {}",
                    lowest, start, upper, wmin
                )));
            }

            let elapsed = |end: f64| correction * (end - start) + model.definite_integral(start, end) - local;
            let end = bisection.find_root(elapsed, start, upper)?;
            debug!(start, local, realtime = end - start, "mapped local ticks to wall-clock");
            Ok(end - start)
        }
    }
}

/// Local ticks that elapse during `realtime` under a constant deviation `value`.
///
/// Only the constant-error case has a closed-form inverse; piecewise-linear
/// models go through [`TimeMapper::realtime_to_local`], which refuses them.
pub fn realtime_to_local(value: f64, correction: f64, realtime: f64) -> f64 {
    realtime * (correction + value)
}

/// Time conversions for one node with its current frequency correction
#[derive(Debug, Clone)]
pub struct TimeMapper {
    model: ClockErrorModel,
    correction: f64,
    wmin: f64,
    bisection: Bisection,
}

impl TimeMapper {
    pub fn new(model: ClockErrorModel, correction: f64, wmin: f64) -> Result<Self> {
        if !wmin.is_finite() || wmin <= 0.0 {
            return Err(Error::config(format!("wmin must be positive, got {}", wmin)));
        }
        Ok(TimeMapper {
            model,
            correction,
            wmin,
            bisection: Bisection::default(),
        })
    }

    /// Overrides the root finder used for piecewise-linear models
    pub fn with_bisection(mut self, bisection: Bisection) -> Self {
        self.bisection = bisection;
        self
    }

    pub fn model(&self) -> &ClockErrorModel {
        &self.model
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Applies a new frequency correction, e.g. the output of a controller step
    pub fn set_correction(&mut self, correction: f64) {
        self.correction = correction;
    }

    /// Effective tick rate at wall-clock time `t`
    pub fn frequency_at(&self, t: f64) -> f64 {
        self.correction + self.model.evaluate(t)
    }

    pub fn local_to_realtime(&self, local: f64, start: f64) -> Result<f64> {
        local_to_realtime_with(&self.model, local, self.correction, start, self.wmin, &self.bisection)
    }

    pub fn realtime_to_local(&self, realtime: f64) -> Result<f64> {
        match self.model {
            ClockErrorModel::Constant(value) => Ok(realtime_to_local(value, self.correction, realtime)),
            ClockErrorModel::PiecewiseLinear(_) => Err(Error::unsupported(
                "Wall-clock to local conversion is only defined for constant clock errors",
            )),
        }
    }
}
