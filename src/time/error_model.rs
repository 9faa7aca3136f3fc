use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Serialize, Deserialize};

use crate::core::{Error, Result};

/// Instantaneous frequency deviation of a node from nominal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockErrorModel {
    /// Deviation that never changes
    Constant(f64),
    /// Deviation interpolated linearly between breakpoints
    PiecewiseLinear(PiecewiseLinear),
}

impl ClockErrorModel {
    /// Builds a checked piecewise-linear model
    pub fn piecewise_linear(breakpoints: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        PiecewiseLinear::new(breakpoints, values).map(ClockErrorModel::PiecewiseLinear)
    }

    /// Deviation at time `t`
    pub fn evaluate(&self, t: f64) -> f64 {
        match self {
            ClockErrorModel::Constant(value) => *value,
            ClockErrorModel::PiecewiseLinear(pwl) => pwl.evaluate(t),
        }
    }

    /// Exact integral of the deviation over `[a, b]`
    pub fn definite_integral(&self, a: f64, b: f64) -> f64 {
        match self {
            ClockErrorModel::Constant(value) => value * (b - a),
            ClockErrorModel::PiecewiseLinear(pwl) => pwl.definite_integral(a, b),
        }
    }

    /// Smallest deviation attained anywhere in `[a, b]`
    pub fn minimum_on(&self, a: f64, b: f64) -> f64 {
        match self {
            ClockErrorModel::Constant(value) => *value,
            ClockErrorModel::PiecewiseLinear(pwl) => pwl.minimum_on(a, b),
        }
    }
}

impl Default for ClockErrorModel {
    fn default() -> Self {
        ClockErrorModel::Constant(0.0)
    }
}

#[derive(Deserialize)]
struct PiecewiseLinearData {
    breakpoints: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<PiecewiseLinearData> for PiecewiseLinear {
    type Error = Error;

    fn try_from(data: PiecewiseLinearData) -> Result<Self> {
        PiecewiseLinear::new(data.breakpoints, data.values)
    }
}

/// Piecewise-linear deviation.
///
/// Outside `[breakpoints[0], breakpoints[last]]` the boundary value is held,
/// so the model is clamped rather than linearly extended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PiecewiseLinearData")]
pub struct PiecewiseLinear {
    breakpoints: Vec<f64>,
    values: Vec<f64>,
}

impl PiecewiseLinear {
    pub fn new(breakpoints: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if breakpoints.is_empty() {
            return Err(Error::invalid_model("Piecewise-linear model needs at least one breakpoint"));
        }
        if breakpoints.len() != values.len() {
            return Err(Error::invalid_model(format!(
                "{} breakpoints but {} values",
                breakpoints.len(),
                values.len()
            )));
        }
        if breakpoints.iter().chain(values.iter()).any(|x| !x.is_finite()) {
            return Err(Error::invalid_model("Breakpoints and values must be finite"));
        }
        if breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_model("Breakpoints must be strictly increasing"));
        }
        Ok(PiecewiseLinear { breakpoints, values })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Linear interpolation on segment `i`, i.e. between breakpoints `i` and `i + 1`
    fn on_segment(&self, i: usize, t: f64) -> f64 {
        let (t0, t1) = (self.breakpoints[i], self.breakpoints[i + 1]);
        let (v0, v1) = (self.values[i], self.values[i + 1]);
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let last = self.breakpoints.len() - 1;
        if t <= self.breakpoints[0] {
            return self.values[0];
        }
        if t >= self.breakpoints[last] {
            return self.values[last];
        }
        // First breakpoint strictly after t; in 1..=last here
        let upper = self.breakpoints.partition_point(|&b| b <= t);
        self.on_segment(upper - 1, t)
    }

    pub fn definite_integral(&self, a: f64, b: f64) -> f64 {
        if a > b {
            return -self.definite_integral(b, a);
        }

        let last = self.breakpoints.len() - 1;
        let (first_bp, last_bp) = (self.breakpoints[0], self.breakpoints[last]);
        let mut total = 0.0;

        if a < first_bp {
            total += self.values[0] * (b.min(first_bp) - a);
        }
        if b > last_bp {
            total += self.values[last] * (b - a.max(last_bp));
        }
        for i in 0..last {
            let lo = a.max(self.breakpoints[i]);
            let hi = b.min(self.breakpoints[i + 1]);
            if hi > lo {
                total += 0.5 * (self.on_segment(i, lo) + self.on_segment(i, hi)) * (hi - lo);
            }
        }
        total
    }

    /// A piecewise-linear function attains its minimum at an end or a breakpoint
    pub fn minimum_on(&self, a: f64, b: f64) -> f64 {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.breakpoints.iter()
            .zip(self.values.iter())
            .filter(|&(&t, _)| t > a && t < b)
            .map(|(_, &v)| v)
            .fold(self.evaluate(a).min(self.evaluate(b)), f64::min)
    }
}

/// Clock error models for a whole network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockErrors {
    /// Every node shares one model
    Uniform(ClockErrorModel),
    /// One model per node, indexed by node
    PerNode(Vec<ClockErrorModel>),
}

impl Default for ClockErrors {
    fn default() -> Self {
        ClockErrors::Uniform(ClockErrorModel::default())
    }
}

impl ClockErrors {
    /// Resolves the model a node runs with
    pub fn model_for(&self, node: usize) -> Result<&ClockErrorModel> {
        match self {
            ClockErrors::Uniform(model) => Ok(model),
            ClockErrors::PerNode(models) => models.get(node).ok_or_else(|| {
                Error::config(format!(
                    "No clock error model for node {} ({} configured)",
                    node,
                    models.len()
                ))
            }),
        }
    }

    /// Draws a constant deviation per node from a zero-mean normal distribution
    pub fn sample_constant<R: Rng + ?Sized>(
        node_count: usize,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| Error::config(format!("Failed to create normal distribution: {}", e)))?;
        let models = (0..node_count)
            .map(|_| ClockErrorModel::Constant(normal.sample(&mut *rng)))
            .collect();
        Ok(ClockErrors::PerNode(models))
    }
}
