use nalgebra::{DMatrix, DVector, Schur};
use num_complex::Complex64;
use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::{Error, Result};
use super::is_metzler;

/// Iteration budget for the real Schur decomposition
const SCHUR_MAX_ITERATIONS: usize = 10_000;

/// Eigenvalues closer than this (relative to the spectral scale) share an eigenspace
const CLUSTER_TOLERANCE: f64 = 1e-8;

/// Largest singular value of `A - λI`, relative to `‖A‖`, still counted as a null direction
const NULL_SPACE_TOLERANCE: f64 = 1e-7;

/// Eigenvector matrices with a larger condition number are rejected
const MAX_CONDITION_NUMBER: f64 = 1e12;

/// Eigendecomposition `A = T · Λ · T⁻¹` ordered by ascending `|λ|`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Eigenvectors as columns, scaled so that `T[0, 0] = 1`
    pub eigenvectors: DMatrix<Complex64>,
    /// Eigenvalues in the same order as the columns of `eigenvectors`
    pub eigenvalues: DVector<Complex64>,
    /// `T⁻¹`
    pub inverse: DMatrix<Complex64>,
    /// Real part of the first row of `T⁻¹`
    pub consensus: DVector<f64>,
}

/// Serializable digest of a [`Spectrum`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSummary {
    #[serde(serialize_with = "crate::core::serde::serialize_complex_vec")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_complex_vec")]
    pub eigenvalues: Vec<Complex64>,
    pub consensus: Vec<f64>,
    pub spectral_gap: Option<f64>,
}

impl Spectrum {
    /// `Λ` as a diagonal matrix
    pub fn eigenvalue_diag(&self) -> DMatrix<Complex64> {
        DMatrix::from_diagonal(&self.eigenvalues)
    }

    /// Slowest decay rate among the modes after the first one.
    ///
    /// `None` for a 1x1 matrix, which has no such mode.
    pub fn spectral_gap(&self) -> Option<f64> {
        self.eigenvalues.iter()
            .skip(1)
            .map(|l| l.re.abs())
            .reduce(f64::min)
    }

    pub fn summary(&self) -> SpectrumSummary {
        SpectrumSummary {
            eigenvalues: self.eigenvalues.iter().copied().collect(),
            consensus: self.consensus.iter().copied().collect(),
            spectral_gap: self.spectral_gap(),
        }
    }
}

/// Eigendecomposition of a Metzler matrix.
///
/// The first eigenpair is the slowest mode; for a rate matrix with a simple
/// zero eigenvalue `consensus` is the stationary distribution `π` with
/// `π · A = 0` and `Σπ = 1`.
pub fn eigendecompose_metzler(a: &DMatrix<f64>) -> Result<Spectrum> {
    if !a.is_square() {
        return Err(Error::precondition(format!(
            "Expected a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if !is_metzler(a) {
        return Err(Error::precondition("Matrix is not Metzler: an off-diagonal entry is negative"));
    }
    eigendecompose(a)
}

/// Eigendecomposition of a diagonalizable square matrix, ordered by `|λ|`
pub fn eigendecompose(a: &DMatrix<f64>) -> Result<Spectrum> {
    let n = a.nrows();
    if n == 0 || !a.is_square() {
        return Err(Error::precondition("Expected a non-empty square matrix"));
    }

    let schur = Schur::try_new(a.clone(), f64::EPSILON, SCHUR_MAX_ITERATIONS)
        .ok_or_else(|| Error::non_convergence("Schur decomposition did not converge"))?;
    let mut eigenvalues: Vec<Complex64> = schur.complex_eigenvalues().iter().copied().collect();
    eigenvalues.sort_by(|x, y| {
        x.norm().total_cmp(&y.norm())
            .then(x.re.total_cmp(&y.re))
            .then(x.im.total_cmp(&y.im))
    });
    trace!(?eigenvalues, "sorted eigenvalues");

    let scale = a.norm().max(f64::MIN_POSITIVE);
    let radius = eigenvalues.last().map_or(0.0, |l| l.norm()).max(1.0);
    let a_complex = a.map(|x| Complex64::new(x, 0.0));
    let mut vectors = DMatrix::<Complex64>::zeros(n, n);

    for cluster in clusters(&eigenvalues, CLUSTER_TOLERANCE * radius) {
        let center = cluster.iter().map(|&i| eigenvalues[i]).sum::<Complex64>()
            / cluster.len() as f64;
        let shifted = &a_complex - DMatrix::<Complex64>::identity(n, n) * center;

        let svd = shifted.svd(false, true);
        let v_t = svd.v_t
            .ok_or_else(|| Error::ill_conditioned("SVD did not produce right singular vectors"))?;
        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));

        for (&column, &row) in cluster.iter().zip(order.iter()) {
            let sigma = svd.singular_values[row];
            if sigma > NULL_SPACE_TOLERANCE * scale {
                return Err(Error::ill_conditioned(format!(
                    "Matrix is not diagonalizable: eigenvalue {} of multiplicity {} lacks an eigenvector (σ = {:e})",
                    center,
                    cluster.len(),
                    sigma
                )));
            }
            vectors.set_column(column, &v_t.row(row).adjoint());
        }
    }

    let pivot = vectors[(0, 0)];
    if pivot.norm() <= f64::EPSILON {
        return Err(Error::ill_conditioned(
            "First eigenvector vanishes at index 0 and cannot be normalized",
        ));
    }
    let vectors = vectors.map(|x| x / pivot);

    let singular = vectors.singular_values();
    let (smallest, largest) = singular.iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    if smallest == 0.0 || largest / smallest > MAX_CONDITION_NUMBER {
        return Err(Error::ill_conditioned(format!(
            "Eigenvector basis is near-singular (condition number {:e})",
            largest / smallest
        )));
    }
    let inverse = vectors.clone()
        .try_inverse()
        .ok_or_else(|| Error::ill_conditioned("Eigenvector basis is not invertible"))?;

    let consensus = inverse.row(0).map(|c| c.re).transpose();

    Ok(Spectrum {
        eigenvectors: vectors,
        eigenvalues: DVector::from_vec(eigenvalues),
        inverse,
        consensus,
    })
}

/// Groups indices of `sorted` whose eigenvalues lie within `tolerance` of a seed
fn clusters(sorted: &[Complex64], tolerance: f64) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; sorted.len()];
    let mut groups = Vec::new();
    for seed in 0..sorted.len() {
        if assigned[seed] {
            continue;
        }
        let group: Vec<usize> = (seed..sorted.len())
            .filter(|&j| !assigned[j] && (sorted[j] - sorted[seed]).norm() <= tolerance)
            .collect();
        for &j in &group {
            assigned[j] = true;
        }
        groups.push(group);
    }
    groups
}

/// Group inverse of a generator with a simple null mode.
///
/// Inverts every eigenvalue except the first (null) one, which is forced to
/// zero, and reassembles `Re(T · Λ⁺ · T⁻¹)`.
pub fn spec_inv(l: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let spectrum = eigendecompose(l)?;
    let radius = spectrum.eigenvalues.iter().map(|x| x.norm()).fold(0.0, f64::max).max(1.0);

    let mut inverted = spectrum.eigenvalues.clone();
    for (i, value) in inverted.iter_mut().enumerate() {
        if i == 0 {
            *value = Complex64::new(0.0, 0.0);
        } else if value.norm() <= CLUSTER_TOLERANCE * radius {
            return Err(Error::ill_conditioned(
                "Generator has more than one null mode",
            ));
        } else {
            *value = value.inv();
        }
    }

    let reconstructed = &spectrum.eigenvectors * DMatrix::from_diagonal(&inverted) * &spectrum.inverse;
    Ok(reconstructed.map(|c| c.re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Topology;

    fn asymmetric() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[
            -3.0, 1.0, 2.0,
            0.5, -0.5, 0.0,
            1.0, 1.0, -2.0,
        ])
    }

    fn assert_close(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        let diff = (a - b).amax();
        assert!(diff < tol, "matrices differ by {}:\n{}\n{}", diff, a, b);
    }

    #[test]
    fn test_rejects_non_metzler() {
        let a = DMatrix::from_row_slice(2, 2, &[-1.0, -1.0, 1.0, -1.0]);
        assert!(matches!(eigendecompose_metzler(&a), Err(Error::Precondition(_))));
        assert!(matches!(
            eigendecompose_metzler(&DMatrix::zeros(2, 3)),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_consensus_is_left_null_vector() {
        let q = asymmetric();
        let spectrum = eigendecompose_metzler(&q).unwrap();

        assert!(spectrum.eigenvalues[0].norm() < 1e-10);
        let norms: Vec<f64> = spectrum.eigenvalues.iter().map(|l| l.norm()).collect();
        assert!(norms.windows(2).all(|w| w[0] <= w[1]));

        let pi = &spectrum.consensus;
        assert!((pi.sum() - 1.0).abs() < 1e-9);
        assert!(pi.iter().all(|&p| p > 0.0));
        let residual = pi.transpose() * &q;
        assert!(residual.amax() < 1e-9, "π·Q = {}", residual);

        // Stationary distribution solved by hand: π ∝ (1, 4, 1)
        assert!((pi[1] - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_canonical_scaling_and_reconstruction() {
        let q = asymmetric();
        let spectrum = eigendecompose_metzler(&q).unwrap();
        assert_eq!(spectrum.eigenvectors[(0, 0)], Complex64::new(1.0, 0.0));

        let rebuilt = (&spectrum.eigenvectors * spectrum.eigenvalue_diag() * &spectrum.inverse)
            .map(|c| c.re);
        assert_close(&rebuilt, &q, 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let q = Topology::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)])
            .unwrap()
            .rate_matrix(1.0);
        let first = eigendecompose_metzler(&q).unwrap();
        let second = eigendecompose_metzler(&q).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_repeated_eigenvalues() {
        // Complete graph: eigenvalues 0 and -4 three times
        let q = Topology::complete(4).rate_matrix(1.0);
        let spectrum = eigendecompose_metzler(&q).unwrap();
        for l in spectrum.eigenvalues.iter().skip(1) {
            assert!((l - Complex64::new(-4.0, 0.0)).norm() < 1e-9);
        }
        for &p in spectrum.consensus.iter() {
            assert!((p - 0.25).abs() < 1e-9);
        }
        assert!((spectrum.spectral_gap().unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_complex_eigenvalues() {
        // Directed 3-cycle: eigenvalues 0 and -1.5 ± i·√3/2
        let q = Topology::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap().rate_matrix(1.0);
        let spectrum = eigendecompose_metzler(&q).unwrap();
        assert!((spectrum.eigenvalues[1].re + 1.5).abs() < 1e-9);
        assert!((spectrum.eigenvalues[1].im.abs() - 3f64.sqrt() / 2.0).abs() < 1e-9);
        for &p in spectrum.consensus.iter() {
            assert!((p - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_defective_matrix_is_reported() {
        let jordan = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]);
        assert!(matches!(eigendecompose_metzler(&jordan), Err(Error::IllConditioned(_))));
    }

    #[test]
    fn test_spec_inv_two_nodes() {
        let l = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 1.0, -1.0]);
        let expected = DMatrix::from_row_slice(2, 2, &[-0.25, 0.25, 0.25, -0.25]);
        assert_close(&spec_inv(&l).unwrap(), &expected, 1e-12);
    }

    #[test]
    fn test_spec_inv_matches_group_inverse() {
        let q = asymmetric();
        let pi = eigendecompose_metzler(&q).unwrap().consensus;
        let limit = DVector::from_element(3, 1.0) * pi.transpose();

        // Q# = 𝟙π - (𝟙π - Q)⁻¹
        let fundamental = (&limit - &q).try_inverse().unwrap();
        let expected = &limit - fundamental;

        let inv = spec_inv(&q).unwrap();
        assert_close(&inv, &expected, 1e-9);

        // Q#·Q projects onto the non-null modes
        let projector = DMatrix::identity(3, 3) - &limit;
        assert_close(&(&inv * &q), &projector, 1e-9);
        assert!((&inv * &q - DMatrix::identity(3, 3)).amax() > 0.1);
    }

    #[test]
    fn test_spec_inv_disconnected() {
        let q = Topology::from_edges(4, &[(0, 1), (1, 0), (2, 3), (3, 2)]).unwrap().rate_matrix(1.0);
        assert!(matches!(spec_inv(&q), Err(Error::IllConditioned(_))));
    }

    #[test]
    fn test_summary_json() {
        let l = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 1.0, -1.0]);
        let summary = eigendecompose_metzler(&l).unwrap().summary();
        assert_eq!(summary.consensus.len(), 2);
        assert!((summary.spectral_gap.unwrap() - 2.0).abs() < 1e-12);

        let json = serde_json::to_string(&summary).unwrap();
        let back: SpectrumSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
