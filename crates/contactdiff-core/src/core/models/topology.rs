use super::atom::Atom;
use super::builder::TopologyBuilder;
use super::chain::Chain;
use super::ids::ResidueKey;
use super::residue::Residue;

/// Structural description of one simulated system: chains, residues, and atoms.
///
/// A topology is immutable once built. Atom indices are dense and match the atom
/// ordering of the coordinate provider that accompanies it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) residues: Vec<Residue>,
    pub(crate) chains: Vec<Chain>,
}

/// A sub-topology together with the original index of every atom it kept.
#[derive(Debug, Clone)]
pub struct TopologySlice {
    pub topology: Topology,
    /// `atom_map[new_index] == old_index`.
    pub atom_map: Vec<usize>,
}

impl Topology {
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn residue(&self, index: usize) -> Option<&Residue> {
        self.residues.get(index)
    }

    pub fn chain(&self, index: usize) -> Option<&Chain> {
        self.chains.get(index)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn find_residue(&self, key: ResidueKey) -> Option<&Residue> {
        self.chains
            .get(key.chain_index)?
            .residues()
            .iter()
            .map(|&idx| &self.residues[idx])
            .find(|res| res.sequence_number == key.sequence_number)
    }

    /// Returns the indices of all non-hydrogen atoms of a residue, in residue order.
    pub fn heavy_atom_indices(&self, residue: &Residue) -> Vec<usize> {
        residue
            .atoms()
            .iter()
            .copied()
            .filter(|&idx| self.atoms.get(idx).is_some_and(|atom| !atom.is_hydrogen()))
            .collect()
    }

    /// Extracts a sub-topology.
    ///
    /// Keeps the listed chains (all chains when `chains` is `None`) and, when
    /// `protein_only` is set, only residues with amino-acid names. Chains left without
    /// residues are dropped. Kept chains are re-indexed from zero in their original order
    /// and atoms are renumbered densely, mirroring how an atom slice of a trajectory
    /// renumbers its topology.
    pub fn select(&self, chains: Option<&[usize]>, protein_only: bool) -> TopologySlice {
        let mut builder = TopologyBuilder::new();
        let mut atom_map = Vec::new();

        for chain in &self.chains {
            if chains.is_some_and(|wanted| !wanted.contains(&chain.index)) {
                continue;
            }
            let kept: Vec<&Residue> = chain
                .residues()
                .iter()
                .map(|&idx| &self.residues[idx])
                .filter(|res| !protein_only || res.is_protein())
                .collect();
            if kept.is_empty() {
                continue;
            }

            builder.start_chain(chain.id);
            for residue in kept {
                // A chain is always active here, so these calls cannot fail.
                if builder
                    .end_residue()
                    .start_residue(residue.sequence_number, &residue.name)
                    .is_err()
                {
                    continue;
                }
                for &atom_idx in residue.atoms() {
                    let atom = &self.atoms[atom_idx];
                    if builder.add_atom(atom.serial, &atom.name, &atom.element).is_ok() {
                        atom_map.push(atom_idx);
                    }
                }
            }
        }

        TopologySlice {
            topology: builder.build(),
            atom_map,
        }
    }
}
