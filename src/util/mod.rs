//! Utility module
//!
//! Numerical helpers shared by the time mapper, plus tracing setup for
//! drivers and tests.

use tracing::debug;

use crate::core::{Error, Result};

/// Bracketed bisection root finder.
///
/// Only needs `f` to be continuous with a sign change over the bracket, which
/// holds for integrals of piecewise-linear rates that have kinks at breakpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bisection {
    /// Bracket width at which iteration stops, relative to `max(|lo|, |hi|, 1)`
    pub xtol: f64,
    /// Iteration budget before reporting non-convergence
    pub max_iter: usize,
}

impl Default for Bisection {
    fn default() -> Self {
        Bisection {
            xtol: 4.0 * f64::EPSILON,
            max_iter: 200,
        }
    }
}

impl Bisection {
    /// Finds `x` in `[lo, hi]` with `f(x) = 0`
    pub fn find_root<F>(&self, mut f: F, lo: f64, hi: f64) -> Result<f64>
    where
        F: FnMut(f64) -> f64,
    {
        let (mut lo, mut hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let mut f_lo = f(lo);
        let f_hi = f(hi);

        if !f_lo.is_finite() || !f_hi.is_finite() {
            return Err(Error::precondition("Objective is not finite at the bracket ends"));
        }
        if f_lo == 0.0 {
            return Ok(lo);
        }
        if f_hi == 0.0 {
            return Ok(hi);
        }
        if f_lo.signum() == f_hi.signum() {
            return Err(Error::precondition(format!(
                "Root not bracketed by [{}, {}]: f = {} and {}",
                lo, hi, f_lo, f_hi
            )));
        }

        for iter in 0..self.max_iter {
            let mid = lo + (hi - lo) / 2.0;
            let scale = lo.abs().max(hi.abs()).max(1.0);
            if hi - lo <= self.xtol * scale || mid <= lo || mid >= hi {
                debug!(iterations = iter, root = mid, "bisection converged");
                return Ok(mid);
            }

            let f_mid = f(mid);
            if !f_mid.is_finite() {
                return Err(Error::precondition(format!("Objective is not finite at {}", mid)));
            }
            if f_mid == 0.0 {
                return Ok(mid);
            }
            if f_mid.signum() == f_lo.signum() {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        Err(Error::non_convergence(format!(
            "Bisection did not converge within {} iterations, last bracket [{}, {}]",
            self.max_iter, lo, hi
        )))
    }
}

/// Installs a formatting subscriber at the given level.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}
