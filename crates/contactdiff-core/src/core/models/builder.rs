use super::atom::Atom;
use super::chain::Chain;
use super::residue::Residue;
use super::topology::Topology;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyBuildError {
    #[error("Must start a chain before starting a residue")]
    NoActiveChain,
    #[error("Cannot add atom '{atom_name}' without a current residue")]
    NoActiveResidue { atom_name: String },
}

#[derive(Debug, Default)]
pub struct TopologyBuilder {
    topology: Topology,

    // --- Builder-specific state for incremental construction ---
    current_chain_idx: Option<usize>,
    current_residue_idx: Option<usize>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new chain. Chains are indexed in the order they are started.
    pub fn start_chain(&mut self, id: char) -> &mut Self {
        let index = self.topology.chains.len();
        self.topology.chains.push(Chain::new(index, id));
        self.current_chain_idx = Some(index);
        self.current_residue_idx = None;
        self
    }

    /// Opens a residue in the current chain.
    ///
    /// Only the current residue is continued, and only when both its sequence number and
    /// name match; anything else starts a new residue. Sequence numbers may therefore repeat
    /// within a chain (insertion codes, wrapped numbering).
    pub fn start_residue(
        &mut self,
        sequence_number: isize,
        name: &str,
    ) -> Result<&mut Self, TopologyBuildError> {
        let chain_idx = self
            .current_chain_idx
            .ok_or(TopologyBuildError::NoActiveChain)?;

        if let Some(current) = self.current_residue_idx {
            let residue = &self.topology.residues[current];
            if residue.sequence_number == sequence_number && residue.name == name {
                return Ok(self);
            }
        }

        let index = self.topology.residues.len();
        self.topology
            .residues
            .push(Residue::new(index, sequence_number, name, chain_idx));
        self.topology.chains[chain_idx].residues.push(index);
        self.current_residue_idx = Some(index);
        Ok(self)
    }

    /// Closes the current residue so the next `start_residue` always opens a new one.
    pub fn end_residue(&mut self) -> &mut Self {
        self.current_residue_idx = None;
        self
    }

    /// Appends an atom to the current residue and returns its flat atom index.
    pub fn add_atom(
        &mut self,
        serial: usize,
        name: &str,
        element: &str,
    ) -> Result<usize, TopologyBuildError> {
        let res_idx = self
            .current_residue_idx
            .ok_or_else(|| TopologyBuildError::NoActiveResidue {
                atom_name: name.to_string(),
            })?;

        let atom_idx = self.topology.atoms.len();
        self.topology
            .atoms
            .push(Atom::new(atom_idx, serial, name, element, res_idx));
        self.topology.residues[res_idx].add_atom(name, atom_idx);
        Ok(atom_idx)
    }

    pub fn build(self) -> Topology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_chains_residues_and_atoms_in_order() {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        builder.start_residue(1, "ALA").unwrap();
        assert_eq!(builder.add_atom(1, "N", "N").unwrap(), 0);
        assert_eq!(builder.add_atom(2, "CA", "C").unwrap(), 1);
        builder.start_residue(2, "GLY").unwrap();
        assert_eq!(builder.add_atom(3, "N", "N").unwrap(), 2);
        builder.start_chain('B');
        builder.start_residue(1, "SER").unwrap();
        assert_eq!(builder.add_atom(4, "OG", "O").unwrap(), 3);

        let topology = builder.build();
        assert_eq!(topology.chain_count(), 2);
        assert_eq!(topology.residue_count(), 3);
        assert_eq!(topology.atom_count(), 4);
        assert_eq!(topology.chains()[0].residues(), &[0, 1]);
        assert_eq!(topology.chains()[1].residues(), &[2]);
        assert_eq!(topology.residues()[2].chain_index, 1);
        assert_eq!(topology.residues()[0].atoms(), &[0, 1]);
        assert_eq!(topology.atoms()[3].residue_index, 2);
    }

    #[test]
    fn contiguous_records_continue_the_current_residue() {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        builder.start_residue(5, "LEU").unwrap();
        builder.add_atom(1, "CA", "C").unwrap();
        builder.start_residue(5, "LEU").unwrap();
        builder.add_atom(2, "CB", "C").unwrap();

        let topology = builder.build();
        assert_eq!(topology.residue_count(), 1);
        assert_eq!(topology.residues()[0].atoms(), &[0, 1]);
    }

    #[test]
    fn non_contiguous_or_renamed_residues_are_kept_apart() {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        builder.start_residue(5, "LEU").unwrap();
        builder.add_atom(1, "CA", "C").unwrap();
        builder.start_residue(6, "VAL").unwrap();
        builder.add_atom(2, "CA", "C").unwrap();
        builder.start_residue(5, "LEU").unwrap();
        builder.add_atom(3, "CB", "C").unwrap();
        builder.start_residue(5, "HOH").unwrap();
        builder.add_atom(4, "OW", "O").unwrap();

        let topology = builder.build();
        assert_eq!(topology.residue_count(), 4);
        assert_eq!(topology.residues()[0].atoms(), &[0]);
        assert_eq!(topology.residues()[2].atoms(), &[2]);
        assert_eq!(topology.residues()[3].name, "HOH");
        assert_eq!(topology.chains()[0].residues(), &[0, 1, 2, 3]);
    }

    #[test]
    fn end_residue_forces_a_new_residue_with_the_same_identity() {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        builder.start_residue(52, "GLY").unwrap();
        builder.add_atom(1, "CA", "C").unwrap();
        builder.end_residue();
        builder.start_residue(52, "GLY").unwrap();
        builder.add_atom(2, "CA", "C").unwrap();

        let topology = builder.build();
        assert_eq!(topology.residue_count(), 2);
        assert_eq!(topology.residues()[1].atoms(), &[1]);
    }

    #[test]
    fn residue_without_chain_is_rejected() {
        let mut builder = TopologyBuilder::new();
        assert_eq!(
            builder.start_residue(1, "ALA").err(),
            Some(TopologyBuildError::NoActiveChain)
        );
    }

    #[test]
    fn atom_without_residue_is_rejected() {
        let mut builder = TopologyBuilder::new();
        builder.start_chain('A');
        assert!(matches!(
            builder.add_atom(1, "CA", "C"),
            Err(TopologyBuildError::NoActiveResidue { .. })
        ));
    }
}
