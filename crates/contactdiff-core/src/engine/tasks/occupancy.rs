use crate::core::models::topology::Topology;
use crate::core::models::trajectory::CoordinateProvider;
use crate::engine::config::{ConfigError, validate_cutoff};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Unordered pair of correspondence indices, stored with `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResiduePair {
    i: usize,
    j: usize,
}

impl ResiduePair {
    /// Orders the two indices; returns `None` for a residue paired with itself.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { i: a, j: b }),
            std::cmp::Ordering::Greater => Some(Self { i: b, j: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn i(&self) -> usize {
        self.i
    }

    pub fn j(&self) -> usize {
        self.j
    }

    /// Distance between the two residues in correspondence index space.
    pub fn separation(&self) -> usize {
        self.j - self.i
    }
}

/// Every unordered pair over `n` residues, in lexicographic order.
pub fn all_pairs(n: usize) -> Vec<ResiduePair> {
    (0..n)
        .tuple_combinations()
        .map(|(i, j)| ResiduePair { i, j })
        .collect()
}

/// Sparse contact occupancy per residue pair. Absent pairs have occupancy zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyMap {
    values: BTreeMap<ResiduePair, f64>,
}

impl OccupancyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupancy of the pair `(a, b)` in either order.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        ResiduePair::new(a, b)
            .and_then(|pair| self.values.get(&pair).copied())
            .unwrap_or(0.0)
    }

    pub fn get_pair(&self, pair: ResiduePair) -> f64 {
        self.values.get(&pair).copied().unwrap_or(0.0)
    }

    /// Records a non-zero occupancy. Zero values are not stored.
    pub fn insert(&mut self, pair: ResiduePair, occupancy: f64) {
        if occupancy > 0.0 {
            self.values.insert(pair, occupancy.min(1.0));
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in ascending pair order.
    pub fn iter(&self) -> impl Iterator<Item = (ResiduePair, f64)> + '_ {
        self.values.iter().map(|(&pair, &occ)| (pair, occ))
    }
}

impl FromIterator<(ResiduePair, f64)> for OccupancyMap {
    fn from_iter<T: IntoIterator<Item = (ResiduePair, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (pair, occupancy) in iter {
            map.insert(pair, occupancy);
        }
        map
    }
}

/// Fraction of frames in which each residue pair has any heavy-atom pair closer than `cutoff`.
///
/// `residues` lists topology residue indices, one per correspondence index; `pairs` index into
/// it and default to every unordered pair. Pairs involving a residue without heavy atoms are
/// skipped. The result does not depend on the number of worker threads.
#[instrument(skip_all, name = "occupancy_task")]
pub fn compute<P>(
    trajectory: &P,
    topology: &Topology,
    residues: &[usize],
    pairs: Option<&[ResiduePair]>,
    cutoff: f64,
    reporter: &ProgressReporter,
) -> Result<OccupancyMap, EngineError>
where
    P: CoordinateProvider + Sync,
{
    validate_cutoff("contact.cutoff", cutoff)?;

    let n = residues.len();
    let default_pairs;
    let pairs = match pairs {
        Some(pairs) => {
            validate_pairs(pairs, n)?;
            pairs
        }
        None => {
            default_pairs = all_pairs(n);
            &default_pairs
        }
    };

    let heavy_atoms = collect_heavy_atoms(topology, residues, trajectory.atom_count())?;

    let frame_count = trajectory.frame_count();
    if frame_count == 0 || pairs.is_empty() {
        warn!(
            frames = frame_count,
            pairs = pairs.len(),
            "Nothing to measure; returning an empty occupancy map."
        );
        return Ok(OccupancyMap::new());
    }

    info!(
        residues = n,
        pairs = pairs.len(),
        frames = frame_count,
        cutoff,
        "Computing contact occupancy."
    );

    let total = pairs.len() as u64;
    let step = (total / 100).max(1);
    let completed = AtomicU64::new(0);
    reporter.report(Progress::TaskStart { total });

    #[cfg(not(feature = "parallel"))]
    let iterator = pairs.iter();

    #[cfg(feature = "parallel")]
    let iterator = pairs.par_iter();

    let results: Vec<Option<(ResiduePair, f64)>> = iterator
        .map(|&pair| {
            let occupancy = pair_occupancy(
                trajectory,
                &heavy_atoms[pair.i],
                &heavy_atoms[pair.j],
                cutoff,
            );
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % step == 0 {
                reporter.report(Progress::TaskIncrement { amount: step });
                debug!("Occupancy progress: {}%", done * 100 / total);
            }
            occupancy.map(|occ| (pair, occ))
        })
        .collect();

    let reported = (total / step) * step;
    if total > reported {
        reporter.report(Progress::TaskIncrement {
            amount: total - reported,
        });
    }
    reporter.report(Progress::TaskFinish);

    let map: OccupancyMap = results.into_iter().flatten().collect();
    info!(nonzero_pairs = map.len(), "Contact occupancy computed.");
    Ok(map)
}

pub(crate) fn validate_pairs(pairs: &[ResiduePair], n: usize) -> Result<(), ConfigError> {
    match pairs.iter().find(|pair| pair.i >= pair.j || pair.j >= n) {
        Some(pair) => Err(ConfigError::InvalidPair {
            i: pair.i,
            j: pair.j,
            n,
        }),
        None => Ok(()),
    }
}

fn collect_heavy_atoms(
    topology: &Topology,
    residues: &[usize],
    atom_count: usize,
) -> Result<Vec<Vec<usize>>, EngineError> {
    let mut degenerate = 0usize;
    let mut heavy_atoms = Vec::with_capacity(residues.len());
    for &res_idx in residues {
        let residue = topology.residue(res_idx).ok_or_else(|| {
            EngineError::Initialization(format!("Residue index {} is not in the topology", res_idx))
        })?;
        let atoms = topology.heavy_atom_indices(residue);
        if let Some(&bad) = atoms.iter().find(|&&idx| idx >= atom_count) {
            return Err(EngineError::Initialization(format!(
                "Atom {} of residue {} has no coordinates (trajectory has {} atoms)",
                bad,
                residue.label(),
                atom_count
            )));
        }
        if atoms.is_empty() {
            degenerate += 1;
        }
        heavy_atoms.push(atoms);
    }
    if degenerate > 0 {
        warn!(
            residues = degenerate,
            "Residues without heavy atoms will be skipped in every pair."
        );
    }
    Ok(heavy_atoms)
}

fn pair_occupancy<P: CoordinateProvider>(
    trajectory: &P,
    atoms_a: &[usize],
    atoms_b: &[usize],
    cutoff: f64,
) -> Option<f64> {
    if atoms_a.is_empty() || atoms_b.is_empty() {
        return None;
    }
    let atom_pairs: Vec<(usize, usize)> = atoms_a
        .iter()
        .copied()
        .cartesian_product(atoms_b.iter().copied())
        .collect();
    let distances = trajectory.distances(&atom_pairs);

    let contact_frames = distances
        .row_iter()
        .filter(|row| row.iter().any(|&d| d < cutoff))
        .count();
    if contact_frames == 0 {
        return None;
    }
    Some(contact_frames as f64 / trajectory.frame_count() as f64)
}
