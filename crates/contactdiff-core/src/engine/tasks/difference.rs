use super::occupancy::{OccupancyMap, ResiduePair};
use crate::engine::config::{ConfigError, SignificancePolicy};
use crate::engine::correspondence::ResidueCorrespondence;
use crate::engine::error::EngineError;
use itertools::Itertools;
use nalgebra::DMatrix;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Dense symmetric matrix of `occ_unbound - occ_bound` with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMatrix {
    values: DMatrix<f64>,
}

impl DifferenceMatrix {
    pub fn from_occupancies(
        occ_bound: &OccupancyMap,
        occ_unbound: &OccupancyMap,
        n: usize,
    ) -> Result<Self, ConfigError> {
        for (pair, _) in occ_bound.iter().chain(occ_unbound.iter()) {
            if pair.j() >= n {
                return Err(ConfigError::InvalidPair {
                    i: pair.i(),
                    j: pair.j(),
                    n,
                });
            }
        }

        let mut values = DMatrix::zeros(n, n);
        for pair in union_pairs(occ_bound, occ_unbound) {
            let delta = occ_unbound.get_pair(pair) - occ_bound.get_pair(pair);
            values[(pair.i(), pair.j())] = delta;
            values[(pair.j(), pair.i())] = delta;
        }
        Ok(Self { values })
    }

    pub fn size(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Per-residue sum of absolute differences.
    pub fn residue_scores(&self) -> Vec<f64> {
        self.values
            .row_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum())
            .collect()
    }

    /// Rows and columns restricted to `indices`, in the given order.
    pub fn submatrix(&self, indices: &[usize]) -> DMatrix<f64> {
        DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
            self.values[(indices[r], indices[c])]
        })
    }
}

/// A residue pair selected by a significance policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificantPair {
    pub index_i: usize,
    pub index_j: usize,
    /// Absolute occupancy difference; the ranking key.
    pub delta: f64,
    /// `occ_unbound - occ_bound`.
    pub signed_delta: f64,
    pub occupancy_bound: f64,
    pub occupancy_unbound: f64,
    pub label_i: String,
    pub label_j: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialNetwork {
    pub difference: DifferenceMatrix,
    pub significant: Vec<SignificantPair>,
}

/// Builds the difference matrix of two conditions and ranks its pairs under `policy`.
#[instrument(skip_all, name = "difference_task")]
pub fn build(
    occ_bound: &OccupancyMap,
    occ_unbound: &OccupancyMap,
    correspondence: &ResidueCorrespondence,
    policy: &SignificancePolicy,
) -> Result<DifferentialNetwork, EngineError> {
    policy.validate()?;
    let difference =
        DifferenceMatrix::from_occupancies(occ_bound, occ_unbound, correspondence.len())?;
    let significant = significant_pairs(&difference, occ_bound, occ_unbound, correspondence, policy)?;
    Ok(DifferentialNetwork {
        difference,
        significant,
    })
}

/// Evaluates one policy against an existing difference matrix.
///
/// Results are sorted by descending `|Δ|`, ties by ascending `(i, j)`.
pub fn significant_pairs(
    difference: &DifferenceMatrix,
    occ_bound: &OccupancyMap,
    occ_unbound: &OccupancyMap,
    correspondence: &ResidueCorrespondence,
    policy: &SignificancePolicy,
) -> Result<Vec<SignificantPair>, EngineError> {
    policy.validate()?;
    let n = difference.size();
    if n != correspondence.len() {
        return Err(EngineError::Internal(format!(
            "Difference matrix covers {} residues but the correspondence has {}",
            n,
            correspondence.len()
        )));
    }

    let selected: Vec<ResiduePair> = match *policy {
        SignificancePolicy::LongRange {
            threshold,
            min_separation,
        } => (0..n)
            .tuple_combinations()
            .filter_map(|(i, j)| ResiduePair::new(i, j))
            .filter(|pair| {
                pair.separation() >= min_separation
                    && difference.get(pair.i(), pair.j()).abs() > threshold
            })
            .collect(),
        SignificancePolicy::HotResidueLocal {
            threshold,
            max_distance,
            percentile,
        } => {
            let hot = hot_residues(difference, percentile);
            debug!(hot_residues = hot.len(), percentile, "Selected hot residues.");
            hot.iter()
                .copied()
                .tuple_combinations()
                .filter_map(|(i, j)| ResiduePair::new(i, j))
                .filter(|pair| {
                    pair.separation() <= max_distance
                        && difference.get(pair.i(), pair.j()).abs() > threshold
                })
                .collect()
        }
        SignificancePolicy::UnionOccupancy {
            threshold,
            sequence_gap_exclusion,
        } => union_pairs(occ_bound, occ_unbound)
            .into_iter()
            .filter(|&pair| {
                occ_bound.get_pair(pair) > threshold || occ_unbound.get_pair(pair) > threshold
            })
            .filter(|pair| match sequence_gap_exclusion {
                Some(gap) => sequence_gap(correspondence, *pair).is_none_or(|d| d > gap),
                None => true,
            })
            .collect(),
    };

    let mut pairs: Vec<SignificantPair> = selected
        .into_iter()
        .map(|pair| {
            let signed_delta = difference.get(pair.i(), pair.j());
            SignificantPair {
                index_i: pair.i(),
                index_j: pair.j(),
                delta: signed_delta.abs(),
                signed_delta,
                occupancy_bound: occ_bound.get_pair(pair),
                occupancy_unbound: occ_unbound.get_pair(pair),
                label_i: correspondence.label(pair.i()).unwrap_or_default().to_string(),
                label_j: correspondence.label(pair.j()).unwrap_or_default().to_string(),
            }
        })
        .collect();

    pairs.sort_by(|a, b| {
        b.delta
            .total_cmp(&a.delta)
            .then_with(|| (a.index_i, a.index_j).cmp(&(b.index_i, b.index_j)))
    });

    info!(
        policy = policy.name(),
        pairs = pairs.len(),
        "Significant pairs extracted."
    );
    Ok(pairs)
}

/// Residues whose summed `|Δ|` is strictly above the given percentile of all scores.
pub fn hot_residues(difference: &DifferenceMatrix, percentile: f64) -> Vec<usize> {
    let scores = difference.residue_scores();
    let Some(cut) = percentile_linear(&scores, percentile) else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score > cut)
        .map(|(idx, _)| idx)
        .collect()
}

/// Percentile with linear interpolation between the closest ranks; `None` for no values.
pub fn percentile_linear(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn union_pairs(a: &OccupancyMap, b: &OccupancyMap) -> BTreeSet<ResiduePair> {
    a.iter().chain(b.iter()).map(|(pair, _)| pair).collect()
}

fn sequence_gap(correspondence: &ResidueCorrespondence, pair: ResiduePair) -> Option<isize> {
    let key_i = correspondence.key(pair.i())?;
    let key_j = correspondence.key(pair.j())?;
    Some((key_i.sequence_number - key_j.sequence_number).abs())
}
