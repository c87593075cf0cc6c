use super::occupancy::OccupancyMap;
use crate::engine::config::{ConfigError, validate_fraction};
use crate::engine::error::EngineError;
use nalgebra::{DMatrix, SymmetricEigen};
use tracing::{debug, info, instrument};

/// Weighted contact graph: occupancy where it exceeds the threshold, zero elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    values: DMatrix<f64>,
    edges: usize,
}

impl AdjacencyMatrix {
    pub fn from_occupancy(occ: &OccupancyMap, n: usize, threshold: f64) -> Result<Self, ConfigError> {
        validate_fraction("communicability.threshold", threshold)?;

        let mut values = DMatrix::zeros(n, n);
        let mut edges = 0;
        for (pair, occupancy) in occ.iter() {
            if pair.j() >= n {
                return Err(ConfigError::InvalidPair {
                    i: pair.i(),
                    j: pair.j(),
                    n,
                });
            }
            if occupancy > threshold {
                values[(pair.i(), pair.j())] = occupancy;
                values[(pair.j(), pair.i())] = occupancy;
                edges += 1;
            }
        }
        Ok(Self { values, edges })
    }

    pub fn size(&self) -> usize {
        self.values.nrows()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}

/// `exp(A)` of a condition's adjacency matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunicabilityMatrix {
    values: DMatrix<f64>,
}

impl CommunicabilityMatrix {
    pub fn size(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}

#[instrument(skip_all, name = "communicability_task")]
pub fn compute(
    occ: &OccupancyMap,
    n: usize,
    threshold: f64,
) -> Result<CommunicabilityMatrix, EngineError> {
    let adjacency = AdjacencyMatrix::from_occupancy(occ, n, threshold)?;
    info!(
        residues = n,
        edges = adjacency.edge_count(),
        threshold,
        "Computing network communicability."
    );
    let values = symmetric_expm(adjacency.as_matrix())?;
    Ok(CommunicabilityMatrix { values })
}

/// Matrix exponential of a real symmetric matrix via its eigendecomposition.
///
/// Only the upper triangle of `V diag(exp λ) Vᵀ` is evaluated and then mirrored, so the
/// result is exactly symmetric. The zero matrix maps to the exact identity.
pub fn symmetric_expm(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, EngineError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(EngineError::Internal(format!(
            "Matrix exponential needs a square matrix, got {}x{}",
            n,
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::Numerical {
            operation: "matrix exponential",
            reason: "input contains non-finite values".into(),
        });
    }
    if matrix.iter().all(|&v| v == 0.0) {
        debug!("Adjacency matrix is empty; communicability is the identity.");
        return Ok(DMatrix::identity(n, n));
    }

    let eigen = SymmetricEigen::new(matrix.clone());
    if eigen.eigenvalues.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::Numerical {
            operation: "matrix exponential",
            reason: "eigendecomposition produced non-finite eigenvalues".into(),
        });
    }

    let exp_values: Vec<f64> = eigen.eigenvalues.iter().map(|v| v.exp()).collect();
    let vectors = &eigen.eigenvectors;

    let mut result = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let value: f64 = (0..n)
                .map(|k| vectors[(i, k)] * exp_values[k] * vectors[(j, k)])
                .sum();
            result[(i, j)] = value;
            result[(j, i)] = value;
        }
    }

    if result.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::Numerical {
            operation: "matrix exponential",
            reason: "result contains non-finite values".into(),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tasks::occupancy::ResiduePair;

    fn occ(entries: &[(usize, usize, f64)]) -> OccupancyMap {
        entries
            .iter()
            .map(|&(i, j, v)| (ResiduePair::new(i, j).unwrap(), v))
            .collect()
    }

    #[test]
    fn no_edges_above_threshold_gives_exact_identity() {
        let result = compute(&occ(&[(0, 1, 0.5), (1, 2, 0.3)]), 3, 0.5).unwrap();
        assert_eq!(result.as_matrix(), &DMatrix::identity(3, 3));
    }

    #[test]
    fn single_edge_matches_closed_form() {
        let w = 0.8;
        let result = compute(&occ(&[(0, 1, w)]), 3, 0.5).unwrap();
        assert!((result.get(0, 0) - w.cosh()).abs() < 1e-10);
        assert!((result.get(0, 1) - w.sinh()).abs() < 1e-10);
        assert!((result.get(1, 1) - w.cosh()).abs() < 1e-10);
        assert!((result.get(2, 2) - 1.0).abs() < 1e-10);
        assert!(result.get(0, 2).abs() < 1e-10);
    }

    #[test]
    fn result_is_exactly_symmetric() {
        let result = compute(
            &occ(&[(0, 1, 0.9), (1, 2, 0.7), (2, 3, 0.6), (0, 3, 0.95)]),
            4,
            0.5,
        )
        .unwrap();
        let m = result.as_matrix();
        assert_eq!(m, &m.transpose());
    }

    #[test]
    fn adjacency_keeps_only_pairs_above_threshold() {
        let adjacency =
            AdjacencyMatrix::from_occupancy(&occ(&[(0, 1, 0.9), (1, 2, 0.5)]), 3, 0.5).unwrap();
        assert_eq!(adjacency.edge_count(), 1);
        assert_eq!(adjacency.as_matrix()[(1, 0)], 0.9);
        assert_eq!(adjacency.as_matrix()[(1, 2)], 0.0);
    }

    #[test]
    fn empty_network_yields_empty_matrix() {
        let result = compute(&OccupancyMap::new(), 0, 0.5).unwrap();
        assert_eq!(result.size(), 0);
    }

    #[test]
    fn non_finite_input_is_a_numerical_error() {
        let mut matrix = DMatrix::zeros(2, 2);
        matrix[(0, 1)] = f64::NAN;
        matrix[(1, 0)] = f64::NAN;
        assert!(matches!(
            symmetric_expm(&matrix),
            Err(EngineError::Numerical { .. })
        ));
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        assert!(matches!(
            compute(&OccupancyMap::new(), 2, 1.5),
            Err(EngineError::Config { .. })
        ));
    }
}
