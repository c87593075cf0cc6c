use super::ids::ResidueKey;
use crate::core::utils::identifiers::is_protein_residue;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub index: usize,                     // Position in the owning topology's residue array
    pub sequence_number: isize,           // Residue sequence number from source file
    pub name: String,                     // Name of the residue (e.g., "ALA", "GLY")
    pub chain_index: usize,               // Index of the parent chain
    pub(crate) atoms: Vec<usize>,         // Indices of atoms belonging to this residue
    atom_name_map: HashMap<String, usize>, // Map from atom name to its atom index
}

impl Residue {
    pub(crate) fn new(index: usize, sequence_number: isize, name: &str, chain_index: usize) -> Self {
        Self {
            index,
            sequence_number,
            name: name.to_string(),
            chain_index,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_index: usize) {
        self.atoms.push(atom_index);
        self.atom_name_map.insert(atom_name.to_string(), atom_index);
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn get_atom_index_by_name(&self, name: &str) -> Option<usize> {
        self.atom_name_map.get(name).copied()
    }

    pub fn key(&self) -> ResidueKey {
        ResidueKey::new(self.chain_index, self.sequence_number)
    }

    /// Human-readable label used in reports, e.g. `ARG15_chain0`.
    pub fn label(&self) -> String {
        format!("{}{}_chain{}", self.name, self.sequence_number, self.chain_index)
    }

    pub fn is_protein(&self) -> bool {
        is_protein_residue(&self.name)
    }
}
