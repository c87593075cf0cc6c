use crate::core::models::topology::Topology;
use crate::core::models::trajectory::CoordinateProvider;
use crate::engine::config::{ConfigError, TransitionConfig, validate_cutoff};
use crate::engine::correspondence::ResidueCorrespondence;
use crate::engine::error::EngineError;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionKind {
    /// In contact in the unbound reference frame only.
    Formed,
    /// In contact in the bound reference frame only.
    Broken,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formed => "formed",
            Self::Broken => "broken",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomContactChange {
    pub kind: TransitionKind,
    /// Correspondence indices of the two residues.
    pub residue_i: usize,
    pub residue_j: usize,
    pub label_i: String,
    pub label_j: String,
    pub atom_i: String,
    pub atom_j: String,
    pub distance_bound: f64,
    pub distance_unbound: f64,
}

/// A heavy atom present under the same name in both conditions.
#[derive(Debug)]
struct TrackedAtom {
    residue: usize,
    name: String,
    position_bound: Point3<f64>,
    position_unbound: Point3<f64>,
}

/// Heavy-atom contacts that appear or disappear between the two reference frames.
///
/// Residues are taken from the correspondence (A = bound, B = unbound) when their sequence
/// number falls in one of the configured ranges; atoms are paired across conditions by name.
/// Results list formed contacts before broken ones, each in ascending atom order.
#[instrument(skip_all, name = "transitions_task")]
pub fn detect<P, Q>(
    bound: (&Topology, &P),
    unbound: (&Topology, &Q),
    correspondence: &ResidueCorrespondence,
    config: &TransitionConfig,
    cutoff: f64,
) -> Result<Vec<AtomContactChange>, EngineError>
where
    P: CoordinateProvider,
    Q: CoordinateProvider,
{
    validate_cutoff("contact.cutoff", cutoff)?;
    config.validate()?;
    check_frame(config.reference_frame, "bound", bound.1.frame_count())?;
    check_frame(config.reference_frame, "unbound", unbound.1.frame_count())?;

    let tracked = collect_tracked_atoms(bound, unbound, correspondence, config)?;
    info!(
        atoms = tracked.len(),
        frame = config.reference_frame,
        "Comparing atom contacts in selected ranges."
    );
    if tracked.len() < 2 {
        return Ok(Vec::new());
    }

    let contacts_bound = contact_pairs(tracked.iter().map(|a| a.position_bound), cutoff);
    let contacts_unbound = contact_pairs(tracked.iter().map(|a| a.position_unbound), cutoff);
    debug!(
        bound = contacts_bound.len(),
        unbound = contacts_unbound.len(),
        "Atom contacts found."
    );

    let describe = |kind: TransitionKind, &(p, q): &(usize, usize)| {
        let (a, b) = (&tracked[p], &tracked[q]);
        AtomContactChange {
            kind,
            residue_i: a.residue,
            residue_j: b.residue,
            label_i: correspondence.label(a.residue).unwrap_or_default().to_string(),
            label_j: correspondence.label(b.residue).unwrap_or_default().to_string(),
            atom_i: a.name.clone(),
            atom_j: b.name.clone(),
            distance_bound: nalgebra::distance(&a.position_bound, &b.position_bound),
            distance_unbound: nalgebra::distance(&a.position_unbound, &b.position_unbound),
        }
    };

    let mut changes: Vec<AtomContactChange> = contacts_unbound
        .difference(&contacts_bound)
        .map(|pair| describe(TransitionKind::Formed, pair))
        .collect();
    changes.extend(
        contacts_bound
            .difference(&contacts_unbound)
            .map(|pair| describe(TransitionKind::Broken, pair)),
    );

    info!(
        formed = changes
            .iter()
            .filter(|c| c.kind == TransitionKind::Formed)
            .count(),
        broken = changes
            .iter()
            .filter(|c| c.kind == TransitionKind::Broken)
            .count(),
        "Atom contact transitions detected."
    );
    Ok(changes)
}

fn check_frame(frame: usize, condition: &'static str, frame_count: usize) -> Result<(), ConfigError> {
    if frame < frame_count {
        Ok(())
    } else {
        Err(ConfigError::FrameOutOfRange {
            frame,
            condition,
            frame_count,
        })
    }
}

fn collect_tracked_atoms<P, Q>(
    (topology_a, coords_a): (&Topology, &P),
    (topology_b, coords_b): (&Topology, &Q),
    correspondence: &ResidueCorrespondence,
    config: &TransitionConfig,
) -> Result<Vec<TrackedAtom>, EngineError>
where
    P: CoordinateProvider,
    Q: CoordinateProvider,
{
    let frame = config.reference_frame;
    let mut tracked = Vec::new();

    for (k, key) in correspondence.keys().iter().enumerate() {
        if !config.contains(key.sequence_number) {
            continue;
        }
        let residue_a = &topology_a.residues()[correspondence.residues_a()[k]];
        let residue_b = &topology_b.residues()[correspondence.residues_b()[k]];

        for atom_idx_a in topology_a.heavy_atom_indices(residue_a) {
            let name = &topology_a.atoms()[atom_idx_a].name;
            let Some(atom_idx_b) = residue_b.get_atom_index_by_name(name) else {
                continue;
            };
            if topology_b.atoms()[atom_idx_b].is_hydrogen() {
                continue;
            }
            let missing = |condition: &str, atom: usize| {
                EngineError::Initialization(format!(
                    "No {} coordinates for atom {} in frame {}",
                    condition, atom, frame
                ))
            };
            let position_bound = *coords_a
                .position(frame, atom_idx_a)
                .ok_or_else(|| missing("bound", atom_idx_a))?;
            let position_unbound = *coords_b
                .position(frame, atom_idx_b)
                .ok_or_else(|| missing("unbound", atom_idx_b))?;
            tracked.push(TrackedAtom {
                residue: k,
                name: name.clone(),
                position_bound,
                position_unbound,
            });
        }
    }
    Ok(tracked)
}

/// Index pairs `(p, q)`, `p < q`, of positions closer than `cutoff`.
fn contact_pairs(positions: impl Iterator<Item = Point3<f64>>, cutoff: f64) -> BTreeSet<(usize, usize)> {
    let points: Vec<[f64; 3]> = positions.map(|p| [p.x, p.y, p.z]).collect();
    let kdtree: KdTree<f64, 3> = (&points).into();
    let cutoff_sq = cutoff * cutoff;

    let mut pairs = BTreeSet::new();
    for (p, query) in points.iter().enumerate() {
        for neighbour in kdtree.within_unsorted::<SquaredEuclidean>(query, cutoff_sq) {
            let q = neighbour.item as usize;
            if q > p && neighbour.distance < cutoff_sq {
                pairs.insert((p, q));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::TopologyBuilder;
    use crate::core::models::trajectory::Trajectory;
    use crate::engine::correspondence::match_residues;

    // Residues 29 (CA, CB, H), 30 (CA), 31 (CA) and 40 (CA) in one chain.
    fn topology() -> Topology {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        builder.start_residue(29, "LEU").unwrap();
        builder.add_atom(1, "CA", "C").unwrap();
        builder.add_atom(2, "CB", "C").unwrap();
        builder.add_atom(3, "H", "H").unwrap();
        builder.start_residue(30, "GLY").unwrap();
        builder.add_atom(4, "CA", "C").unwrap();
        builder.start_residue(31, "SER").unwrap();
        builder.add_atom(5, "CA", "C").unwrap();
        builder.start_residue(40, "ALA").unwrap();
        builder.add_atom(6, "CA", "C").unwrap();
        builder.build()
    }

    fn frame(positions: &[f64; 6]) -> Trajectory {
        let frame = positions.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect();
        Trajectory::from_frames(6, vec![frame]).unwrap()
    }

    fn config() -> TransitionConfig {
        TransitionConfig {
            ranges: vec![(29, 31)],
            reference_frame: 0,
        }
    }

    #[test]
    fn reports_formed_and_broken_contacts() {
        let top = topology();
        let correspondence = match_residues(&top, &top);
        // Bound: CB(29) touches CA(30). Unbound: CA(30) touches CA(31) instead.
        let bound = frame(&[0.0, 1.0, 0.0, 1.2, 3.0, 1.2]);
        let unbound = frame(&[0.0, 1.0, 0.0, 2.0, 2.2, 1.0]);

        let changes = detect(
            (&top, &bound),
            (&top, &unbound),
            &correspondence,
            &config(),
            0.4,
        )
        .unwrap();

        assert_eq!(changes.len(), 2);
        let formed = &changes[0];
        assert_eq!(formed.kind, TransitionKind::Formed);
        assert_eq!((formed.residue_i, formed.residue_j), (1, 2));
        assert_eq!((formed.atom_i.as_str(), formed.atom_j.as_str()), ("CA", "CA"));
        assert!((formed.distance_unbound - 0.2).abs() < 1e-9);

        let broken = &changes[1];
        assert_eq!(broken.kind, TransitionKind::Broken);
        assert_eq!(broken.label_i, "LEU29_chain0");
        assert_eq!(broken.atom_i, "CB");
        assert_eq!(broken.label_j, "GLY30_chain0");
        assert!((broken.distance_bound - 0.2).abs() < 1e-9);
    }

    #[test]
    fn residues_outside_ranges_are_ignored() {
        let top = topology();
        let correspondence = match_residues(&top, &top);
        // Residue 40 sits on CA(31) only in the unbound frame.
        let bound = frame(&[0.0, 1.0, 0.0, 3.0, 5.0, 9.0]);
        let unbound = frame(&[0.0, 1.0, 0.0, 3.0, 5.0, 5.1]);
        let changes = detect(
            (&top, &bound),
            (&top, &unbound),
            &correspondence,
            &config(),
            0.4,
        )
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn reference_frame_beyond_trajectory_is_rejected() {
        let top = topology();
        let correspondence = match_residues(&top, &top);
        let traj = frame(&[0.0; 6]);
        let result = detect(
            (&top, &traj),
            (&top, &traj),
            &correspondence,
            &TransitionConfig {
                ranges: vec![(29, 31)],
                reference_frame: 1,
            },
            0.4,
        );
        assert!(matches!(
            result,
            Err(EngineError::Config {
                source: ConfigError::FrameOutOfRange {
                    frame: 1,
                    condition: "bound",
                    frame_count: 1
                }
            })
        ));
    }

    #[test]
    fn contact_pairs_uses_strict_cutoff() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(0.75, 0.0, 0.0),
        ];
        let pairs = contact_pairs(points.into_iter(), 0.5);
        assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![(1, 2)]);
    }
}
