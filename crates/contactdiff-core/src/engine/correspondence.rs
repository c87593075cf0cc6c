use crate::core::models::ids::ResidueKey;
use crate::core::models::topology::Topology;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Counts produced while matching two topologies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub matched: usize,
    pub unmatched_a: usize,
    pub unmatched_b: usize,
}

/// Dense index space over the residues present in both of two topologies.
///
/// Index `k` in `[0, len())` addresses the `k`-th smallest shared [`ResidueKey`] and maps
/// to one residue of each topology. Labels are taken from topology A.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidueCorrespondence {
    keys: Vec<ResidueKey>,
    residues_a: Vec<usize>,
    residues_b: Vec<usize>,
    labels: Vec<String>,
    report: MatchReport,
}

impl ResidueCorrespondence {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[ResidueKey] {
        &self.keys
    }

    pub fn key(&self, index: usize) -> Option<ResidueKey> {
        self.keys.get(index).copied()
    }

    /// Residue indices in topology A, one per correspondence index.
    pub fn residues_a(&self) -> &[usize] {
        &self.residues_a
    }

    /// Residue indices in topology B, one per correspondence index.
    pub fn residues_b(&self) -> &[usize] {
        &self.residues_b
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn report(&self) -> MatchReport {
        self.report
    }

    pub fn index_of(&self, key: ResidueKey) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }
}

/// Matches residues of two topologies by `(chain_index, sequence_number)`.
///
/// Residue names are not compared, so a mutated residue still matches its counterpart.
/// An empty intersection is a valid result.
pub fn match_residues(topology_a: &Topology, topology_b: &Topology) -> ResidueCorrespondence {
    // Keys can repeat within a chain (insertion codes, wrapped numbering); the first
    // residue carrying a key represents it, as in `Topology::find_residue`.
    let mut map_a: BTreeMap<ResidueKey, usize> = BTreeMap::new();
    for res in topology_a.residues() {
        map_a.entry(res.key()).or_insert(res.index);
    }
    let mut map_b: HashMap<ResidueKey, usize> = HashMap::new();
    for res in topology_b.residues() {
        map_b.entry(res.key()).or_insert(res.index);
    }

    let mut correspondence = ResidueCorrespondence::default();
    for (&key, &res_a) in &map_a {
        if let Some(&res_b) = map_b.get(&key) {
            correspondence.keys.push(key);
            correspondence.residues_a.push(res_a);
            correspondence.residues_b.push(res_b);
            correspondence
                .labels
                .push(topology_a.residues()[res_a].label());
        }
    }

    let matched = correspondence.keys.len();
    correspondence.report = MatchReport {
        matched,
        unmatched_a: map_a.len() - matched,
        unmatched_b: map_b.len() - matched,
    };

    if matched == 0 {
        warn!(
            residues_a = map_a.len(),
            residues_b = map_b.len(),
            "No residues shared between the two topologies; all downstream results will be empty."
        );
    } else {
        info!(
            matched,
            unmatched_a = correspondence.report.unmatched_a,
            unmatched_b = correspondence.report.unmatched_b,
            "Matched residues across topologies."
        );
    }
    correspondence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::TopologyBuilder;

    fn topology(chains: &[&[(isize, &str)]]) -> Topology {
        let mut builder = TopologyBuilder::new();
        let mut serial = 1;
        for residues in chains {
            builder.start_chain('A');
            for &(seq, name) in *residues {
                builder.start_residue(seq, name).unwrap();
                builder.add_atom(serial, "CA", "C").unwrap();
                serial += 1;
            }
        }
        builder.build()
    }

    #[test]
    fn repeated_key_is_represented_by_its_first_residue() {
        let a = topology(&[&[(1, "ALA"), (2, "GLY"), (1, "SOL")]]);
        let b = topology(&[&[(1, "ALA")]]);

        let correspondence = match_residues(&a, &b);

        assert_eq!(correspondence.residues_a(), &[0]);
        assert_eq!(correspondence.label(0), Some("ALA1_chain0"));
        assert_eq!(correspondence.report().unmatched_a, 1);
    }

    #[test]
    fn matches_shared_keys_in_ascending_order() {
        let a = topology(&[&[(5, "ALA"), (1, "GLY"), (3, "SER")], &[(1, "LYS")]]);
        let b = topology(&[&[(3, "SER"), (5, "ALA"), (9, "TRP")], &[(1, "LYS")]]);

        let correspondence = match_residues(&a, &b);

        assert_eq!(
            correspondence.keys(),
            &[
                ResidueKey::new(0, 3),
                ResidueKey::new(0, 5),
                ResidueKey::new(1, 1)
            ]
        );
        assert_eq!(correspondence.residues_a(), &[2, 0, 3]);
        assert_eq!(correspondence.residues_b(), &[0, 1, 3]);
        assert_eq!(correspondence.label(0), Some("SER3_chain0"));
        assert_eq!(correspondence.label(2), Some("LYS1_chain1"));
    }

    #[test]
    fn mapped_residues_share_chain_and_sequence_number() {
        let a = topology(&[&[(1, "ALA"), (2, "GLY"), (4, "SER")]]);
        let b = topology(&[&[(2, "GLY"), (4, "THR"), (6, "ALA")]]);
        let correspondence = match_residues(&a, &b);

        for k in 0..correspondence.len() {
            let res_a = &a.residues()[correspondence.residues_a()[k]];
            let res_b = &b.residues()[correspondence.residues_b()[k]];
            assert_eq!(res_a.key(), res_b.key());
        }
    }

    #[test]
    fn report_counts_matched_and_unmatched_residues() {
        let a = topology(&[&[(1, "ALA"), (2, "GLY"), (3, "SER")]]);
        let b = topology(&[&[(2, "GLY"), (3, "SER"), (4, "THR"), (5, "VAL")]]);
        let report = match_residues(&a, &b).report();
        assert_eq!(
            report,
            MatchReport {
                matched: 2,
                unmatched_a: 1,
                unmatched_b: 2
            }
        );
    }

    #[test]
    fn disjoint_topologies_yield_empty_correspondence() {
        let a = topology(&[&[(1, "ALA"), (2, "GLY")]]);
        let b = topology(&[&[(10, "ALA"), (11, "GLY")]]);
        let correspondence = match_residues(&a, &b);
        assert!(correspondence.is_empty());
        assert_eq!(correspondence.report().matched, 0);
    }

    #[test]
    fn index_of_finds_keys_by_binary_search() {
        let a = topology(&[&[(1, "ALA"), (7, "GLY")]]);
        let correspondence = match_residues(&a, &a);
        assert_eq!(correspondence.index_of(ResidueKey::new(0, 7)), Some(1));
        assert_eq!(correspondence.index_of(ResidueKey::new(0, 2)), None);
    }
}
