use crate::core::models::topology::Topology;
use crate::core::models::trajectory::{CoordinateProvider, Trajectory};
use crate::engine::config::{AnalysisConfig, SelectionConfig, SignificancePolicy};
use crate::engine::correspondence::{ResidueCorrespondence, match_residues};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::clustering::{self, ClusterAssignment};
use crate::engine::tasks::communicability::{self, CommunicabilityMatrix};
use crate::engine::tasks::difference::{self, DifferenceMatrix, SignificantPair};
use crate::engine::tasks::occupancy::{self, OccupancyMap};
use crate::engine::tasks::transitions::{self, AtomContactChange};
use tracing::{info, instrument};

/// One simulated condition: a topology and the coordinates that go with it.
#[derive(Debug, Clone, Copy)]
pub struct Ensemble<'a> {
    pub topology: &'a Topology,
    pub trajectory: &'a Trajectory,
}

impl<'a> Ensemble<'a> {
    pub fn new(topology: &'a Topology, trajectory: &'a Trajectory) -> Self {
        Self {
            topology,
            trajectory,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyResult {
    pub policy: SignificancePolicy,
    pub pairs: Vec<SignificantPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunicabilityResult {
    pub bound: CommunicabilityMatrix,
    pub unbound: CommunicabilityMatrix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub correspondence: ResidueCorrespondence,
    pub frames_bound: usize,
    pub frames_unbound: usize,
    pub occupancy_bound: OccupancyMap,
    pub occupancy_unbound: OccupancyMap,
    pub difference: DifferenceMatrix,
    pub significant: Vec<PolicyResult>,
    pub communicability: Option<CommunicabilityResult>,
    pub clustering: Option<ClusterAssignment>,
    pub transitions: Option<Vec<AtomContactChange>>,
}

/// A condition after its selection has been applied.
struct SelectedEnsemble {
    topology: Topology,
    trajectory: Trajectory,
}

#[instrument(skip_all, name = "comparison_workflow")]
pub fn run(
    bound: Ensemble,
    unbound: Ensemble,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<ComparisonResult, EngineError> {
    config.validate()?;

    // === Phase 1: Selection ===
    reporter.report(Progress::PhaseStart { name: "Selection" });
    let bound = select(bound, &config.bound_selection, "bound")?;
    let unbound = select(unbound, &config.unbound_selection, "unbound")?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Residue matching ===
    reporter.report(Progress::PhaseStart {
        name: "Residue Matching",
    });
    let correspondence = match_residues(&bound.topology, &unbound.topology);
    let n = correspondence.len();
    reporter.report(Progress::StatusUpdate {
        text: format!("{} matched residues", n),
    });
    if n == 0 {
        let report = correspondence.report();
        reporter.report(Progress::Message(format!(
            "No residues matched ({} bound, {} unbound unmatched); all outputs are empty",
            report.unmatched_a, report.unmatched_b
        )));
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Contact occupancy per condition ===
    let cutoff = config.contact.cutoff;
    reporter.report(Progress::PhaseStart {
        name: "Occupancy (bound)",
    });
    let occupancy_bound = occupancy::compute(
        &bound.trajectory,
        &bound.topology,
        correspondence.residues_a(),
        None,
        cutoff,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Occupancy (unbound)",
    });
    let occupancy_unbound = occupancy::compute(
        &unbound.trajectory,
        &unbound.topology,
        correspondence.residues_b(),
        None,
        cutoff,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Differential network ===
    reporter.report(Progress::PhaseStart {
        name: "Differential Network",
    });
    let difference = DifferenceMatrix::from_occupancies(&occupancy_bound, &occupancy_unbound, n)?;
    let significant = config
        .policies
        .iter()
        .map(|policy| {
            difference::significant_pairs(
                &difference,
                &occupancy_bound,
                &occupancy_unbound,
                &correspondence,
                policy,
            )
            .map(|pairs| PolicyResult {
                policy: *policy,
                pairs,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 5: Communicability (optional) ===
    let communicability = match &config.communicability {
        Some(comm) => {
            reporter.report(Progress::PhaseStart {
                name: "Communicability",
            });
            let result = CommunicabilityResult {
                bound: communicability::compute(&occupancy_bound, n, comm.threshold)?,
                unbound: communicability::compute(&occupancy_unbound, n, comm.threshold)?,
            };
            reporter.report(Progress::PhaseFinish);
            Some(result)
        }
        None => None,
    };

    // === Phase 6: Clustering (optional) ===
    let clustering = match &config.clustering {
        Some(clustering_config) => {
            reporter.report(Progress::PhaseStart { name: "Clustering" });
            let assignment = clustering::cluster(&difference, clustering_config)?;
            reporter.report(Progress::PhaseFinish);
            Some(assignment)
        }
        None => None,
    };

    // === Phase 7: Atom contact transitions (optional) ===
    let transitions = match &config.transitions {
        Some(transition_config) => {
            reporter.report(Progress::PhaseStart {
                name: "Contact Transitions",
            });
            let changes = transitions::detect(
                (&bound.topology, &bound.trajectory),
                (&unbound.topology, &unbound.trajectory),
                &correspondence,
                transition_config,
                cutoff,
            )?;
            reporter.report(Progress::PhaseFinish);
            Some(changes)
        }
        None => None,
    };

    info!(
        matched = n,
        policies = significant.len(),
        "Comparison complete."
    );
    Ok(ComparisonResult {
        correspondence,
        frames_bound: bound.trajectory.frame_count(),
        frames_unbound: unbound.trajectory.frame_count(),
        occupancy_bound,
        occupancy_unbound,
        difference,
        significant,
        communicability,
        clustering,
        transitions,
    })
}

fn select(
    ensemble: Ensemble,
    selection: &SelectionConfig,
    condition: &'static str,
) -> Result<SelectedEnsemble, EngineError> {
    let atoms_in_topology = ensemble.topology.atom_count();
    let atoms_in_trajectory = ensemble.trajectory.atom_count();
    if atoms_in_topology != atoms_in_trajectory {
        return Err(EngineError::Initialization(format!(
            "The {} topology has {} atoms but its trajectory has {}",
            condition, atoms_in_topology, atoms_in_trajectory
        )));
    }

    let slice = ensemble
        .topology
        .select(selection.chains.as_deref(), selection.protein_only);
    let trajectory = ensemble.trajectory.slice_atoms(&slice.atom_map);
    info!(
        condition,
        chains = slice.topology.chain_count(),
        residues = slice.topology.residue_count(),
        atoms = slice.topology.atom_count(),
        frames = trajectory.frame_count(),
        "Selection applied."
    );
    Ok(SelectedEnsemble {
        topology: slice.topology,
        trajectory,
    })
}
