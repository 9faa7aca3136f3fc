//! Spectral analysis of synchronization generators
//!
//! The linearized dynamics of a bittide network are described by a rate
//! matrix (nonnegative off-diagonals, zero row sums). Its eigendecomposition
//! tells whether and how the network converges: with a simple zero
//! eigenvalue, `exp(t*Q)` tends to `𝟙 · πᵀ` where `π` is the consensus vector.
//!
//! # Examples
//!
//! ```
//! use bittide_sync::core::Topology;
//! use bittide_sync::spectral::{eigendecompose_metzler, is_rate_matrix};
//!
//! let ring = Topology::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
//! let q = ring.rate_matrix(1.0);
//! assert!(is_rate_matrix(&q));
//!
//! let spectrum = eigendecompose_metzler(&q).unwrap();
//! assert!((spectrum.consensus.sum() - 1.0).abs() < 1e-9);
//! ```

mod eigen;

use nalgebra::DMatrix;

pub use self::eigen::{
    eigendecompose, eigendecompose_metzler, spec_inv, Spectrum, SpectrumSummary,
};

/// Relative tolerance on row sums used by [`is_rate_matrix`].
///
/// Row sums are compared against `RATE_MATRIX_TOLERANCE * max|Q_ij|`, so the
/// check does not depend on the overall magnitude of the matrix.
pub const RATE_MATRIX_TOLERANCE: f64 = 1e-10;

/// Whether every off-diagonal entry is nonnegative
pub fn is_metzler(a: &DMatrix<f64>) -> bool {
    a.is_square()
        && (0..a.nrows()).all(|i| (0..a.ncols()).all(|j| i == j || a[(i, j)] >= 0.0))
}

/// Whether `q` is a valid continuous-time Markov generator
pub fn is_rate_matrix(q: &DMatrix<f64>) -> bool {
    is_rate_matrix_with_tolerance(q, RATE_MATRIX_TOLERANCE)
}

/// [`is_rate_matrix`] with an explicit relative tolerance
pub fn is_rate_matrix_with_tolerance(q: &DMatrix<f64>, tolerance: f64) -> bool {
    if !is_metzler(q) {
        return false;
    }
    if q.is_empty() {
        return true;
    }

    let largest = q.amax();
    let worst_row_sum = q.row_iter()
        .map(|row| row.sum().abs())
        .fold(0.0, f64::max);
    worst_row_sum <= tolerance * largest
}
